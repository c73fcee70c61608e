use {
    crate::domain::error::PipelineError,
    crate::domain::id::{NotificationGroupId, PaymentId},
    crate::domain::payment::{NotificationFlag, PaymentRecord, PaymentStatus, PaymentUpdate},
    crate::domain::provider::FetchedPayment,
    crate::domain::repo::{EmailQueue, MergeOutcome, PaymentStore, UserDirectory},
    crate::domain::templates,
    crate::domain::transition::{TransitionInput, UserNotice, evaluate},
    crate::domain::user::{Identity, resolve_identity},
    crate::services::dispatcher::{NotificationDispatcher, Recipient},
    chrono::{Duration, Utc},
    std::sync::Arc,
};

/// What one delivery did to a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub payment_id: PaymentId,
    pub previous: Option<PaymentStatus>,
    pub current: PaymentStatus,
    /// Customer notice sent by this delivery.
    pub user_notice: Option<UserNotice>,
    /// Admins were told nobody could be matched to this payment.
    pub admin_no_user: bool,
    /// Due notice another delivery had already claimed.
    pub notice_already_claimed: bool,
    /// The user directory failed; due notices were left for a later delivery.
    pub notices_deferred: bool,
    pub admin_status_change: bool,
}

pub struct PaymentPipeline {
    store: Arc<dyn PaymentStore>,
    users: Arc<dyn UserDirectory>,
    dispatcher: Arc<NotificationDispatcher>,
    emails: Arc<dyn EmailQueue>,
    pending_after: Duration,
}

impl PaymentPipeline {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        users: Arc<dyn UserDirectory>,
        dispatcher: Arc<NotificationDispatcher>,
        emails: Arc<dyn EmailQueue>,
        pending_after: Duration,
    ) -> Self {
        Self {
            store,
            users,
            dispatcher,
            emails,
            pending_after,
        }
    }

    /// Merge fresh gateway state into the record, then send whatever the
    /// transition owes. Notification failures are logged, never returned.
    #[tracing::instrument(name = "process_payment", skip_all, fields(payment_id = %fetched.payment_id))]
    pub async fn process(&self, fetched: FetchedPayment) -> Result<ProcessReport, PipelineError> {
        let FetchedPayment {
            payment_id,
            mut update,
        } = fetched;

        let lookup = self.attach_identity(&payment_id, &mut update).await;

        let MergeOutcome { previous, current } = self.store.merge(&payment_id, &update).await?;
        let previous_status = previous.map(|p| p.status);

        let plan = evaluate(&TransitionInput {
            previous: previous_status.as_ref(),
            current: &current.status,
            sent: current.notifications_sent,
            date_created: current.date_created,
            now: Utc::now(),
            identity_resolved: current.user_email.is_some() || current.user_id.is_some(),
            pending_after: self.pending_after,
        });

        tracing::info!(
            from = previous_status.as_ref().map(|s| s.as_str()).unwrap_or("new"),
            to = %current.status,
            notice = ?plan.notice,
            admin_no_user = plan.admin_no_user,
            admin_status_change = plan.admin_status_change,
            "payment merged"
        );

        let mut report = ProcessReport {
            payment_id: payment_id.clone(),
            previous: previous_status.clone(),
            current: current.status.clone(),
            user_notice: None,
            admin_no_user: false,
            notice_already_claimed: false,
            notices_deferred: false,
            admin_status_change: plan.admin_status_change,
        };

        if let Err(e) = lookup {
            // Flags stay unclaimed so a redelivery can still send these.
            if plan.notice.is_some() || plan.admin_no_user {
                tracing::warn!(error = %e, notice = ?plan.notice, "user lookup failed, notices deferred");
                report.notices_deferred = true;
            }
        } else {
            if let Some(notice) = plan.notice {
                match self.claim(&payment_id, notice.flag()).await {
                    Some(true) => {
                        self.send_user_notice(notice, &current).await;
                        report.user_notice = Some(notice);
                    }
                    Some(false) => report.notice_already_claimed = true,
                    None => {}
                }
            }
            if plan.admin_no_user
                && self.claim(&payment_id, NotificationFlag::NoUser).await == Some(true)
            {
                self.send_unidentified_notice(&current).await;
                report.admin_no_user = true;
            }
        }

        if plan.admin_status_change {
            let group = NotificationGroupId::generate();
            let message = templates::admin_status_change(&current, previous_status.as_ref(), group);
            self.dispatcher.notify_admins(&message, Some(group)).await;
        }

        Ok(report)
    }

    /// `Some(won)` for a flag claim, `None` when the store failed (logged).
    async fn claim(&self, payment_id: &PaymentId, flag: NotificationFlag) -> Option<bool> {
        match self.store.claim_notification(payment_id, flag).await {
            Ok(true) => Some(true),
            Ok(false) => {
                tracing::info!(flag = flag.as_str(), "notice already sent by another delivery");
                Some(false)
            }
            Err(e) => {
                tracing::error!(flag = flag.as_str(), error = %e, "failed to claim notification flag");
                None
            }
        }
    }

    /// Fill `user_id`/`user_email` from the reference or payer email. The
    /// store keeps whatever identity it already has. An `Err` means the user
    /// directory could not be asked; the identity found so far is still set.
    async fn attach_identity(
        &self,
        payment_id: &PaymentId,
        update: &mut PaymentUpdate,
    ) -> Result<(), PipelineError> {
        let identity = resolve_identity(
            update.external_reference.as_deref(),
            update.payer_email.as_deref(),
        );

        match identity {
            Some(Identity::Email(email)) => {
                let found = self.users.find_by_email(&email).await;
                update.user_email = Some(email);
                if let Some(user) = found? {
                    update.user_id = Some(user.id);
                }
            }
            Some(Identity::UserId(id)) => {
                let found = self.users.find_by_id(&id).await;
                update.user_id = Some(id);
                match found? {
                    Some(user) => update.user_email = Some(user.email),
                    None => {
                        tracing::warn!(%payment_id, user_id = ?update.user_id, "referenced user does not exist");
                    }
                }
            }
            None => {
                tracing::debug!(%payment_id, "no identity in payment data");
            }
        }
        Ok(())
    }

    async fn send_user_notice(&self, notice: UserNotice, record: &PaymentRecord) {
        let recipient = match (&record.user_email, &record.user_id) {
            (Some(email), _) => Recipient::Email(email.clone()),
            (None, Some(id)) => Recipient::UserId(id.clone()),
            (None, None) => return,
        };
        let group = NotificationGroupId::generate();

        let message = templates::user_message(notice, record, group);
        let summary = self
            .dispatcher
            .notify_user(&recipient, &message, Some(group))
            .await;
        tracing::info!(
            notice = ?notice,
            notification_group_id = %group,
            delivered = summary.delivered,
            queued = summary.queued,
            "user notified"
        );

        let Some(email) = record.user_email.as_deref() else {
            tracing::warn!(notice = ?notice, "no email address on record, notification email skipped");
            return;
        };
        let email_request = templates::user_email(notice, record, email);
        if let Err(e) = self.emails.enqueue(email_request).await {
            tracing::error!(notice = ?notice, error = %e, "failed to queue notification email");
        }
    }

    async fn send_unidentified_notice(&self, record: &PaymentRecord) {
        tracing::warn!(
            external_reference = record.external_reference.as_deref().unwrap_or(""),
            "no user identified for payment, alerting admins"
        );
        let group = NotificationGroupId::generate();
        let message = templates::admin_no_user(record, group);
        self.dispatcher.notify_admins(&message, Some(group)).await;
    }
}
