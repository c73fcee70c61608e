use {
    super::error::PipelineError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

/// Payment id the gateway sends with a connectivity test from its dashboard.
pub const TEST_PAYMENT_ID: &str = "123456";

/// Gateway payment identifier. Mercado Pago ids are numeric, but they travel
/// as strings in webhooks, URLs and storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(PipelineError::Validation("PaymentId must not be empty".into()));
        }
        // The id is interpolated into gateway URLs.
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PipelineError::Validation(format!(
                "PaymentId contains invalid characters: {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_test_sentinel(&self) -> bool {
        self.0 == TEST_PAYMENT_ID
    }
}

/// Tags every artifact (push, queued request, in-app entry) produced by one
/// logical notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationGroupId(Uuid);

impl NotificationGroupId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for NotificationGroupId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
