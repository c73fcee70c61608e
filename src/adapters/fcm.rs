//! Firebase Cloud Messaging (HTTP v1) push sender.

use {
    crate::domain::{
        delivery::{PushError, PushSender},
        notification::NotificationMessage,
    },
    futures::future::BoxFuture,
    reqwest::{Client, StatusCode},
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

const FCM_API_BASE: &str = "https://fcm.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

/// Error codes FCM uses for tokens that will never work again.
fn is_dead_token(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND
        || body.contains("UNREGISTERED")
        || (status == StatusCode::BAD_REQUEST && body.contains("INVALID_ARGUMENT"))
}

pub struct FcmSender {
    http: Client,
    endpoint: String,
    access_token: String,
}

impl FcmSender {
    pub fn new(project_id: &str, access_token: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_base(FCM_API_BASE, project_id, access_token)
    }

    pub fn with_base(
        base_url: &str,
        project_id: &str,
        access_token: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            endpoint: format!(
                "{}/v1/projects/{project_id}/messages:send",
                base_url.trim_end_matches('/')
            ),
            access_token: access_token.into(),
        })
    }

    async fn post(&self, token: &str, message: &NotificationMessage) -> Result<String, PushError> {
        let request = SendRequest {
            message: FcmMessage {
                token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
                data: message.string_data(),
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_dead_token(status, &body) {
                return Err(PushError::InvalidToken);
            }
            return Err(PushError::Transport(format!("FCM returned {status}: {body}")));
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| PushError::Transport(format!("unreadable FCM response: {e}")))?;
        Ok(sent.name)
    }
}

impl PushSender for FcmSender {
    fn send<'a>(
        &'a self,
        token: &'a str,
        message: &'a NotificationMessage,
    ) -> BoxFuture<'a, Result<String, PushError>> {
        Box::pin(self.post(token, message))
    }
}

/// Used when no FCM credentials are configured: every push fails softly and
/// the dispatcher queues a request instead.
pub struct DisabledPush;

impl PushSender for DisabledPush {
    fn send<'a>(
        &'a self,
        _token: &'a str,
        _message: &'a NotificationMessage,
    ) -> BoxFuture<'a, Result<String, PushError>> {
        Box::pin(async { Err(PushError::Disabled) })
    }
}
