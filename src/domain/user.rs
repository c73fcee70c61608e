use serde::{Deserialize, Serialize};

/// Prefix the mobile app puts on `external_reference` when it starts a
/// checkout on behalf of a signed-in user.
const USER_REFERENCE_PREFIX: &str = "user_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Client,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Client => "client",
        }
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::Client,
        }
    }
}

/// App user, keyed by email. Owned by the auth/profile side of the system;
/// the payment core only reads it and drops dead push tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub fcm_token: Option<String>,
    pub is_admin: bool,
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.is_admin || self.role == UserRole::Admin
    }

    pub fn push_token(&self) -> Option<&str> {
        self.fcm_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Who a payment belongs to, as far as the payment data can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Email(String),
    UserId(String),
}

pub fn is_email(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !candidate.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Best-effort identity from the external reference, then the payer email.
///
/// `user_bob@example.com` and `bob@example.com` resolve to the email;
/// `user_<uid>` resolves to a user id; anything else (gateway-generated
/// references) falls through to the payer email.
pub fn resolve_identity(
    external_reference: Option<&str>,
    payer_email: Option<&str>,
) -> Option<Identity> {
    if let Some(reference) = external_reference.map(str::trim).filter(|r| !r.is_empty()) {
        let (prefixed, rest) = match reference.strip_prefix(USER_REFERENCE_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, reference),
        };
        if is_email(rest) {
            return Some(Identity::Email(normalize_email(rest)));
        }
        if prefixed && !rest.is_empty() {
            return Some(Identity::UserId(rest.to_string()));
        }
    }

    payer_email
        .map(str::trim)
        .filter(|e| is_email(e))
        .map(|e| Identity::Email(normalize_email(e)))
}
