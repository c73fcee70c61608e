use {
    super::notification::NotificationKind,
    super::payment::{NotificationFlag, NotificationsSent, PaymentStatus},
    chrono::{DateTime, Duration, Utc},
};

/// How long a payment may sit in `pending` before the customer is nudged.
pub const DEFAULT_PENDING_NOTIFY_AFTER_MINUTES: i64 = 20;

/// Customer-facing notice kinds, one per `notificationsSent` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserNotice {
    Approved,
    Rejected,
    Pending,
}

impl UserNotice {
    pub fn flag(&self) -> NotificationFlag {
        match self {
            Self::Approved => NotificationFlag::Approved,
            Self::Rejected => NotificationFlag::Rejected,
            Self::Pending => NotificationFlag::Pending,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Approved => NotificationKind::PaymentApproved,
            Self::Rejected => NotificationKind::PaymentRejected,
            Self::Pending => NotificationKind::PaymentPending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionInput<'a> {
    /// `None` when this delivery created the record.
    pub previous: Option<&'a PaymentStatus>,
    pub current: &'a PaymentStatus,
    pub sent: NotificationsSent,
    pub date_created: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
    pub identity_resolved: bool,
    pub pending_after: Duration,
}

impl TransitionInput<'_> {
    pub fn status_changed(&self) -> bool {
        self.previous != Some(self.current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionPlan {
    /// Customer notice due on this delivery. Only set when the payment
    /// belongs to someone.
    pub notice: Option<UserNotice>,
    /// Nobody to tell: admins get a single "no user identified" alert per
    /// payment, whatever the status.
    pub admin_no_user: bool,
    pub admin_status_change: bool,
}

/// Decide which notifications one webhook delivery owes, given the record
/// state right after this delivery's own merge.
pub fn evaluate(input: &TransitionInput<'_>) -> TransitionPlan {
    let changed = input.status_changed();

    if !input.identity_resolved {
        return TransitionPlan {
            notice: None,
            admin_no_user: !input.sent.no_user,
            admin_status_change: changed,
        };
    }

    let due = match input.current {
        PaymentStatus::Approved => (!input.sent.approved).then_some(UserNotice::Approved),
        PaymentStatus::Rejected | PaymentStatus::Cancelled => {
            let settled_from_in_flight = matches!(
                input.previous,
                Some(PaymentStatus::InProcess | PaymentStatus::Pending)
            );
            (!input.sent.rejected && changed && !settled_from_in_flight)
                .then_some(UserNotice::Rejected)
        }
        PaymentStatus::Pending => {
            let waited_long_enough = input
                .date_created
                .is_some_and(|created| input.now - created >= input.pending_after);
            (!input.sent.pending && waited_long_enough).then_some(UserNotice::Pending)
        }
        PaymentStatus::Authorized
        | PaymentStatus::InProcess
        | PaymentStatus::InMediation
        | PaymentStatus::Refunded
        | PaymentStatus::ChargedBack
        | PaymentStatus::Unknown(_) => None,
    };

    TransitionPlan {
        notice: due,
        admin_no_user: false,
        admin_status_change: changed,
    }
}
