use {
    super::id::PaymentId,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Gateway payment status. Unrecognised vendor values are kept verbatim in
/// `Unknown` so nothing is lost on a round trip through the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Authorized,
    InProcess,
    InMediation,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Unknown(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Authorized => "authorized",
            Self::InProcess => "in_process",
            Self::InMediation => "in_mediation",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::ChargedBack => "charged_back",
            Self::Unknown(raw) => raw,
        }
    }

    /// Portuguese label used in customer and admin notifications.
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pendente",
            Self::Approved => "Aprovado",
            Self::Authorized => "Autorizado",
            Self::InProcess => "Em processamento",
            Self::InMediation => "Em mediação",
            Self::Rejected => "Recusado",
            Self::Cancelled => "Cancelado",
            Self::Refunded => "Reembolsado",
            Self::ChargedBack => "Estornado",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "authorized" => Self::Authorized,
            "in_process" => Self::InProcess,
            "in_mediation" => Self::InMediation,
            "rejected" => Self::Rejected,
            // the gateway spells it with one "l"
            "cancelled" | "canceled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "charged_back" => Self::ChargedBack,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Notices sent at most once per payment: the three customer notices and
/// the admin alert for a payment nobody could be matched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationFlag {
    Pending,
    Approved,
    Rejected,
    NoUser,
}

impl NotificationFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::NoUser => "no_user",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsSent {
    pub pending: bool,
    pub approved: bool,
    pub rejected: bool,
    pub no_user: bool,
}

impl NotificationsSent {
    pub fn get(&self, flag: NotificationFlag) -> bool {
        match flag {
            NotificationFlag::Pending => self.pending,
            NotificationFlag::Approved => self.approved,
            NotificationFlag::Rejected => self.rejected,
            NotificationFlag::NoUser => self.no_user,
        }
    }

    pub fn set(&mut self, flag: NotificationFlag) {
        match flag {
            NotificationFlag::Pending => self.pending = true,
            NotificationFlag::Approved => self.approved = true,
            NotificationFlag::Rejected => self.rejected = true,
            NotificationFlag::NoUser => self.no_user = true,
        }
    }
}

/// Partial view of a payment, as fetched from the gateway or captured at
/// checkout. `None` means "not known by this source", never "clear it".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentUpdate {
    pub status: Option<PaymentStatus>,
    pub status_detail: Option<String>,
    pub amount: Option<MoneyAmount>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_approved: Option<DateTime<Utc>>,
    pub external_reference: Option<String>,
    pub payment_method: Option<String>,
    pub payer_email: Option<String>,
    pub description: Option<String>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

/// Stored payment, keyed by gateway payment id. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRecord {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub amount: Option<MoneyAmount>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_approved: Option<DateTime<Utc>>,
    pub external_reference: Option<String>,
    pub payment_method: Option<String>,
    pub payer_email: Option<String>,
    pub description: Option<String>,
    pub notifications_sent: NotificationsSent,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// First sighting of a payment. Flags start all-false. A payload without
    /// a status is stored as `Unknown("")` until one arrives.
    pub fn new(payment_id: PaymentId, update: &PaymentUpdate, now: DateTime<Utc>) -> Self {
        Self {
            payment_id,
            status: update
                .status
                .clone()
                .unwrap_or_else(|| PaymentStatus::Unknown(String::new())),
            status_detail: update.status_detail.clone(),
            amount: update.amount,
            date_created: update.date_created,
            date_approved: update.date_approved,
            external_reference: update.external_reference.clone(),
            payment_method: update.payment_method.clone(),
            payer_email: update.payer_email.clone(),
            description: update.description.clone(),
            notifications_sent: NotificationsSent::default(),
            user_id: update.user_id.clone(),
            user_email: update.user_email.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Field-level merge. Gateway fields take the incoming value when one is
    /// present; identity fields are only filled while empty; notification
    /// flags are owned by the dispatcher and never touched here.
    /// `updated_at` moves only when something actually changed.
    pub fn merged(&self, update: &PaymentUpdate, now: DateTime<Utc>) -> Self {
        let candidate = Self {
            payment_id: self.payment_id.clone(),
            status: update.status.clone().unwrap_or_else(|| self.status.clone()),
            status_detail: update
                .status_detail
                .clone()
                .or_else(|| self.status_detail.clone()),
            amount: update.amount.or(self.amount),
            date_created: update.date_created.or(self.date_created),
            date_approved: update.date_approved.or(self.date_approved),
            external_reference: update
                .external_reference
                .clone()
                .or_else(|| self.external_reference.clone()),
            payment_method: update
                .payment_method
                .clone()
                .or_else(|| self.payment_method.clone()),
            payer_email: update
                .payer_email
                .clone()
                .or_else(|| self.payer_email.clone()),
            description: update
                .description
                .clone()
                .or_else(|| self.description.clone()),
            notifications_sent: self.notifications_sent,
            user_id: self.user_id.clone().or_else(|| update.user_id.clone()),
            user_email: self
                .user_email
                .clone()
                .or_else(|| update.user_email.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        };

        if candidate == *self {
            candidate
        } else {
            Self {
                updated_at: now,
                ..candidate
            }
        }
    }
}
