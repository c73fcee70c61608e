use {
    chrono::{DateTime, Duration, Utc},
    rand::Rng,
    serde::Serialize,
};

pub const CODE_TTL_SECS: i64 = 300;

/// One-time email verification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationCode {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn issue(email: &str, now: DateTime<Utc>) -> Self {
        let code = rand::thread_rng().gen_range(100_000..1_000_000u32);
        Self {
            email: email.to_string(),
            code: code.to_string(),
            expires_at: now + Duration::seconds(CODE_TTL_SECS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
