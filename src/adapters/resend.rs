use {
    crate::domain::{
        delivery::EmailTransport,
        error::PipelineError,
        notification::{EmailAttachment, EmailRequest},
    },
    futures::future::BoxFuture,
    reqwest::Client,
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    attachments: &'a [EmailAttachment],
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

/// Sends queued emails through the Resend API.
pub struct ResendTransport {
    http: Client,
    api_key: String,
    from: String,
}

impl ResendTransport {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, PipelineError> {
        Ok(Self {
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key: api_key.into(),
            from: from.into(),
        })
    }

    async fn post(&self, email: &EmailRequest) -> Result<String, PipelineError> {
        let request = ResendEmailRequest {
            from: &self.from,
            to: vec![email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
            attachments: &email.attachments,
        };

        let response = self
            .http
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Provider(format!(
                "Resend returned {status}: {body}"
            )));
        }

        let sent: ResendEmailResponse = response.json().await?;
        Ok(sent.id)
    }
}

impl EmailTransport for ResendTransport {
    fn send<'a>(&'a self, email: &'a EmailRequest) -> BoxFuture<'a, Result<String, PipelineError>> {
        Box::pin(self.post(email))
    }
}
