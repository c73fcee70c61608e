use {
    super::error::PipelineError,
    super::notification::{EmailRequest, NotificationMessage},
    futures::future::BoxFuture,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum PushError {
    /// Token is unknown to the provider; the caller should forget it.
    #[error("invalid or unregistered push token")]
    InvalidToken,

    #[error("push transport: {0}")]
    Transport(String),

    #[error("push delivery is disabled")]
    Disabled,
}

pub trait PushSender: Send + Sync {
    /// Returns the provider's message id.
    fn send<'a>(
        &'a self,
        token: &'a str,
        message: &'a NotificationMessage,
    ) -> BoxFuture<'a, Result<String, PushError>>;
}

pub trait EmailTransport: Send + Sync {
    /// Returns the provider's message id.
    fn send<'a>(&'a self, email: &'a EmailRequest) -> BoxFuture<'a, Result<String, PipelineError>>;
}
