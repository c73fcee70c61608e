use {
    crate::domain::delivery::{PushError, PushSender},
    crate::domain::id::NotificationGroupId,
    crate::domain::notification::{InAppNotification, NotificationMessage, NotificationRequest},
    crate::domain::repo::{NotificationStore, UserDirectory},
    crate::domain::user::User,
    chrono::Utc,
    futures::{StreamExt, stream},
    std::{ops::AddAssign, sync::Arc},
};

pub const DEFAULT_ADMIN_FANOUT: usize = 8;

/// Single-user notification target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Email(String),
    UserId(String),
}

/// What happened to one logical notification, summed over its targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Pushed directly.
    pub delivered: usize,
    /// Written as a NotificationRequest for the worker.
    pub queued: usize,
    /// In-app log entries written.
    pub logged: usize,
    /// Targets dropped (unknown user) or artifacts that failed to persist.
    pub dropped: usize,
}

impl AddAssign for DispatchSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.queued += rhs.queued;
        self.logged += rhs.logged;
        self.dropped += rhs.dropped;
    }
}

/// Best-effort fan-out: direct push first, durable request otherwise, and an
/// in-app copy always. Never returns an error to the caller.
pub struct NotificationDispatcher {
    users: Arc<dyn UserDirectory>,
    push: Arc<dyn PushSender>,
    store: Arc<dyn NotificationStore>,
    admin_fanout: usize,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        push: Arc<dyn PushSender>,
        store: Arc<dyn NotificationStore>,
        admin_fanout: usize,
    ) -> Self {
        Self {
            users,
            push,
            store,
            admin_fanout: admin_fanout.max(1),
        }
    }

    #[tracing::instrument(name = "notify_user", skip_all, fields(kind = %message.kind))]
    pub async fn notify_user(
        &self,
        recipient: &Recipient,
        message: &NotificationMessage,
        group: Option<NotificationGroupId>,
    ) -> DispatchSummary {
        let group = group.unwrap_or_else(NotificationGroupId::generate);
        let message = message.clone().with_group(group);

        let lookup = match recipient {
            Recipient::Email(email) => self.users.find_by_email(email).await,
            Recipient::UserId(id) => self.users.find_by_id(id).await,
        };
        let user = match lookup {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(?recipient, notification_group_id = %group, "user not found, notification dropped");
                return DispatchSummary {
                    dropped: 1,
                    ..Default::default()
                };
            }
            Err(e) => {
                tracing::error!(?recipient, error = %e, "user lookup failed, notification dropped");
                return DispatchSummary {
                    dropped: 1,
                    ..Default::default()
                };
            }
        };

        self.deliver(&user, &message, group).await
    }

    #[tracing::instrument(name = "notify_admins", skip_all, fields(kind = %message.kind))]
    pub async fn notify_admins(
        &self,
        message: &NotificationMessage,
        group: Option<NotificationGroupId>,
    ) -> DispatchSummary {
        let group = group.unwrap_or_else(NotificationGroupId::generate);
        let message = message.clone().with_group(group);

        let admins = match self.users.list_admins().await {
            Ok(admins) => admins,
            Err(e) => {
                tracing::error!(error = %e, notification_group_id = %group, "admin lookup failed");
                return DispatchSummary::default();
            }
        };
        if admins.is_empty() {
            tracing::warn!(notification_group_id = %group, "no admin users to notify");
        }

        let message = &message;
        let results: Vec<DispatchSummary> = stream::iter(admins)
            .map(|admin| async move { self.deliver(&admin, message, group).await })
            .buffer_unordered(self.admin_fanout)
            .collect()
            .await;

        let mut total = DispatchSummary::default();
        for r in results {
            total += r;
        }
        tracing::info!(
            notification_group_id = %group,
            delivered = total.delivered,
            queued = total.queued,
            "admin broadcast finished"
        );
        total
    }

    async fn deliver(
        &self,
        user: &User,
        message: &NotificationMessage,
        group: NotificationGroupId,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        let pushed = match user.push_token() {
            Some(token) => match self.push.send(token, message).await {
                Ok(message_id) => {
                    tracing::debug!(email = %user.email, %message_id, "push delivered");
                    true
                }
                Err(PushError::InvalidToken) => {
                    tracing::warn!(email = %user.email, "push token rejected, clearing it");
                    if let Err(e) = self.users.clear_push_token(&user.email, token).await {
                        tracing::error!(email = %user.email, error = %e, "failed to clear push token");
                    }
                    false
                }
                Err(e) => {
                    tracing::warn!(email = %user.email, error = %e, "direct push failed");
                    false
                }
            },
            None => false,
        };

        if pushed {
            summary.delivered += 1;
        } else {
            let request = NotificationRequest::new(&user.email, message, group, Utc::now());
            match self.store.enqueue(request).await {
                Ok(id) => {
                    tracing::info!(email = %user.email, request_id = %id, "notification request queued");
                    summary.queued += 1;
                }
                Err(e) => {
                    tracing::error!(email = %user.email, error = %e, "failed to queue notification request");
                    summary.dropped += 1;
                }
            }
        }

        let entry = InAppNotification::new(&user.email, message, group, Utc::now());
        match self.store.log_in_app(entry).await {
            Ok(_) => summary.logged += 1,
            Err(e) => {
                tracing::error!(email = %user.email, error = %e, "failed to write in-app notification");
            }
        }

        summary
    }
}
