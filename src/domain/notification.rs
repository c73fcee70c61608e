use {
    super::error::PipelineError,
    super::id::NotificationGroupId,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// What a notification is about. Travels in `data.type` so the app can route
/// taps and the admin inbox can filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaymentApproved,
    PaymentRejected,
    PaymentPending,
    AdminPaymentStatus,
    AdminPaymentNoUser,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentApproved => "payment_approved",
            Self::PaymentRejected => "payment_rejected",
            Self::PaymentPending => "payment_pending",
            Self::AdminPaymentStatus => "admin_payment_status",
            Self::AdminPaymentNoUser => "admin_payment_no_user",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Title/body/data triple handed to the push provider and copied into the
/// queue and the in-app log. `data` is always a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationMessage {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl NotificationMessage {
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            data: serde_json::json!({ "type": kind.as_str() }),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn with_group(self, group: NotificationGroupId) -> Self {
        self.with_data("notificationGroupId", group.to_string())
    }

    /// FCM only accepts string values in `data`.
    pub fn string_data(&self) -> serde_json::Map<String, serde_json::Value> {
        self.data
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(k, v)| {
                        let s = match v {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), serde_json::Value::String(s))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Lifecycle of a queued request: `pending` → `processing` → `sent` | `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Sent,
    Error,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Error)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, PipelineError> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "sent" => Ok(Self::Sent),
            "error" => Ok(Self::Error),
            other => Err(PipelineError::Validation(format!(
                "unknown request status: {other}"
            ))),
        }
    }
}

/// Push that could not be delivered directly; drained by the notification worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRequest {
    pub id: Uuid,
    pub user_email: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub status: RequestStatus,
    pub notification_group_id: NotificationGroupId,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl NotificationRequest {
    pub fn new(
        user_email: &str,
        message: &NotificationMessage,
        group: NotificationGroupId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_email: user_email.to_string(),
            title: message.title.clone(),
            body: message.body.clone(),
            data: message.data.clone(),
            status: RequestStatus::Pending,
            notification_group_id: group,
            created_at: now,
            processed_at: None,
            error: None,
        }
    }

    pub fn kind(&self) -> Option<&str> {
        self.data.get("type").and_then(|v| v.as_str())
    }

    pub fn message(&self) -> NotificationMessage {
        let kind = match self.kind() {
            Some("payment_approved") => NotificationKind::PaymentApproved,
            Some("payment_rejected") => NotificationKind::PaymentRejected,
            Some("payment_pending") => NotificationKind::PaymentPending,
            Some("admin_payment_no_user") => NotificationKind::AdminPaymentNoUser,
            _ => NotificationKind::AdminPaymentStatus,
        };
        NotificationMessage {
            kind,
            title: self.title.clone(),
            body: self.body.clone(),
            data: self.data.clone(),
        }
    }
}

/// Copy of every notification shown in the app's inbox, written whatever
/// happened to the push.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InAppNotification {
    pub id: Uuid,
    pub user_email: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub notification_group_id: NotificationGroupId,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl InAppNotification {
    pub fn new(
        user_email: &str,
        message: &NotificationMessage,
        group: NotificationGroupId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_email: user_email.to_string(),
            title: message.title.clone(),
            body: message.body.clone(),
            data: message.data.clone(),
            notification_group_id: group,
            read: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAttachment {
    pub filename: String,
    /// Base64 payload, passed through to the email provider untouched.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmailRequest {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

/// Queued email; drained by the email worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailRequest {
    pub id: Uuid,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

impl EmailRequest {
    pub fn new(request: NewEmailRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            to: request.to,
            subject: request.subject,
            html: request.html,
            attachments: request.attachments,
            status: RequestStatus::Pending,
            created_at: now,
            sent_at: None,
            provider_message_id: None,
            error: None,
        }
    }
}
