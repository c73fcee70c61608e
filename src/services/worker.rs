use {
    crate::domain::delivery::{EmailTransport, PushError, PushSender},
    crate::domain::error::PipelineError,
    crate::domain::repo::{EmailQueue, NotificationStore, UserDirectory},
    std::{sync::Arc, time::Duration},
    tokio::sync::watch,
};

const BATCH_SIZE: i64 = 10;
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Counts for one drained batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub sent: usize,
    pub failed: usize,
    /// Rows another worker had already finished.
    pub skipped: usize,
    /// Rows left in 'processing' after a store error; the reaper returns them.
    pub deferred: usize,
}

/// Poll for queued emails and send them.
pub async fn run_email_worker(
    queue: Arc<dyn EmailQueue>,
    transport: Arc<dyn EmailTransport>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("email worker started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("email worker shutting down");
                return;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        if let Err(e) = drain_emails(&*queue, &*transport).await {
            tracing::error!(error = %e, "email worker poll error");
        }
    }
}

/// Send one claimed batch. A failing row is logged and the rest of the
/// batch still goes out.
pub async fn drain_emails(
    queue: &dyn EmailQueue,
    transport: &dyn EmailTransport,
) -> Result<BatchReport, PipelineError> {
    let batch = queue.claim_pending(BATCH_SIZE).await?;
    let mut report = BatchReport::default();

    for email in batch {
        let finished = match transport.send(&email).await {
            Ok(message_id) => {
                tracing::info!(request_id = %email.id, to = %email.to, %message_id, "email sent");
                queue.mark_sent(email.id, &message_id).await.map(|done| (done, true))
            }
            Err(e) => {
                tracing::error!(request_id = %email.id, to = %email.to, error = %e, "email send failed");
                queue.mark_error(email.id, &e.to_string()).await.map(|done| (done, false))
            }
        };

        match finished {
            Ok((true, true)) => report.sent += 1,
            Ok((true, false)) => report.failed += 1,
            Ok((false, _)) => {
                tracing::warn!(request_id = %email.id, "email already finalized by another run");
                report.skipped += 1;
            }
            Err(e) => {
                tracing::error!(request_id = %email.id, error = %e, "failed to record email outcome");
                report.deferred += 1;
            }
        }
    }

    Ok(report)
}

/// Poll for queued push notifications and deliver them.
pub async fn run_notification_worker(
    store: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    push: Arc<dyn PushSender>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("notification worker started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("notification worker shutting down");
                return;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        if let Err(e) = drain_notifications(&*store, &*users, &*push).await {
            tracing::error!(error = %e, "notification worker poll error");
        }
    }
}

/// Deliver one claimed batch of queued pushes. A failing row is logged and
/// the rest of the batch is still delivered.
pub async fn drain_notifications(
    store: &dyn NotificationStore,
    users: &dyn UserDirectory,
    push: &dyn PushSender,
) -> Result<BatchReport, PipelineError> {
    let batch = store.claim_pending(BATCH_SIZE).await?;
    let mut report = BatchReport::default();

    for request in batch {
        let user = match users.find_by_email(&request.user_email).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(request_id = %request.id, error = %e, "user lookup failed, request left for the reaper");
                report.deferred += 1;
                continue;
            }
        };

        let outcome = match user {
            None => Err("user no longer exists".to_string()),
            Some(user) => match user.push_token() {
                None => Err("user has no push token".to_string()),
                Some(token) => match push.send(token, &request.message()).await {
                    Ok(message_id) => Ok(message_id),
                    Err(PushError::InvalidToken) => {
                        if let Err(e) = users.clear_push_token(&user.email, token).await {
                            tracing::error!(email = %user.email, error = %e, "failed to clear dead push token");
                        }
                        Err(PushError::InvalidToken.to_string())
                    }
                    Err(e) => Err(e.to_string()),
                },
            },
        };

        let finished = match &outcome {
            Ok(message_id) => {
                tracing::info!(request_id = %request.id, email = %request.user_email, %message_id, "queued push delivered");
                store.mark_sent(request.id).await
            }
            Err(reason) => {
                tracing::warn!(request_id = %request.id, email = %request.user_email, %reason, "queued push not delivered");
                store.mark_error(request.id, reason).await
            }
        };

        match finished {
            Ok(true) if outcome.is_ok() => report.sent += 1,
            Ok(true) => report.failed += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                tracing::error!(request_id = %request.id, error = %e, "failed to record push outcome");
                report.deferred += 1;
            }
        }
    }

    Ok(report)
}

/// Periodically reset requests stuck in 'processing' back to 'pending'.
pub async fn run_reaper(
    notifications: Arc<dyn NotificationStore>,
    emails: Arc<dyn EmailQueue>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("stale request reaper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("stale request reaper shutting down");
                return;
            }
            _ = tokio::time::sleep(REAP_INTERVAL) => {}
        }

        match notifications.reap_stale().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "reaped stale notification requests"),
            Err(e) => tracing::error!(error = %e, "notification reaper error"),
        }
        match emails.reap_stale().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "reaped stale email requests"),
            Err(e) => tracing::error!(error = %e, "email reaper error"),
        }
    }
}
