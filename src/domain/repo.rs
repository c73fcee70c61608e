use {
    super::code::VerificationCode,
    super::error::PipelineError,
    super::id::PaymentId,
    super::notification::{EmailRequest, InAppNotification, NewEmailRequest, NotificationRequest},
    super::payment::{NotificationFlag, PaymentRecord, PaymentUpdate},
    super::user::User,
    futures::future::BoxFuture,
    uuid::Uuid,
};

/// Result of one atomic merge: the record as this merge found it and as it
/// left it.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub previous: Option<PaymentRecord>,
    pub current: PaymentRecord,
}

pub trait PaymentStore: Send + Sync {
    fn get<'a>(
        &'a self,
        id: &'a PaymentId,
    ) -> BoxFuture<'a, Result<Option<PaymentRecord>, PipelineError>>;

    /// Atomic per-payment merge-upsert (see `PaymentRecord::merged`).
    fn merge<'a>(
        &'a self,
        id: &'a PaymentId,
        update: &'a PaymentUpdate,
    ) -> BoxFuture<'a, Result<MergeOutcome, PipelineError>>;

    /// Flip `flag` to true if it is still false. Returns `true` only for the
    /// caller that flipped it.
    fn claim_notification<'a>(
        &'a self,
        id: &'a PaymentId,
        flag: NotificationFlag,
    ) -> BoxFuture<'a, Result<bool, PipelineError>>;
}

pub trait UserDirectory: Send + Sync {
    fn find_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>, PipelineError>>;

    fn find_by_id<'a>(&'a self, id: &'a str)
    -> BoxFuture<'a, Result<Option<User>, PipelineError>>;

    fn list_admins(&self) -> BoxFuture<'_, Result<Vec<User>, PipelineError>>;

    /// Drop `token` from the user, unless it has been replaced meanwhile.
    fn clear_push_token<'a>(
        &'a self,
        email: &'a str,
        token: &'a str,
    ) -> BoxFuture<'a, Result<(), PipelineError>>;
}

pub trait NotificationStore: Send + Sync {
    fn enqueue(&self, request: NotificationRequest) -> BoxFuture<'_, Result<Uuid, PipelineError>>;

    fn log_in_app(&self, entry: InAppNotification) -> BoxFuture<'_, Result<Uuid, PipelineError>>;

    /// Move up to `limit` pending requests to `processing` and return them.
    fn claim_pending(
        &self,
        limit: i64,
    ) -> BoxFuture<'_, Result<Vec<NotificationRequest>, PipelineError>>;

    /// `processing` → `sent`. Returns `false` when the row was not in
    /// `processing` (already finished by another run).
    fn mark_sent(&self, id: Uuid) -> BoxFuture<'_, Result<bool, PipelineError>>;

    fn mark_error<'a>(
        &'a self,
        id: Uuid,
        error: &'a str,
    ) -> BoxFuture<'a, Result<bool, PipelineError>>;

    /// Return requests stuck in `processing` to `pending`.
    fn reap_stale(&self) -> BoxFuture<'_, Result<u64, PipelineError>>;
}

pub trait EmailQueue: Send + Sync {
    fn enqueue(&self, request: NewEmailRequest) -> BoxFuture<'_, Result<Uuid, PipelineError>>;

    fn claim_pending(&self, limit: i64) -> BoxFuture<'_, Result<Vec<EmailRequest>, PipelineError>>;

    fn mark_sent<'a>(
        &'a self,
        id: Uuid,
        provider_message_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PipelineError>>;

    fn mark_error<'a>(
        &'a self,
        id: Uuid,
        error: &'a str,
    ) -> BoxFuture<'a, Result<bool, PipelineError>>;

    fn reap_stale(&self) -> BoxFuture<'_, Result<u64, PipelineError>>;
}

pub trait CodeStore: Send + Sync {
    /// Store `code`, replacing any earlier code for the same email.
    fn put<'a>(&'a self, code: &'a VerificationCode) -> BoxFuture<'a, Result<(), PipelineError>>;

    fn get<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<VerificationCode>, PipelineError>>;

    fn delete<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<(), PipelineError>>;
}
