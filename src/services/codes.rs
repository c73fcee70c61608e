use {
    crate::domain::code::{CODE_TTL_SECS, VerificationCode},
    crate::domain::error::PipelineError,
    crate::domain::repo::{CodeStore, EmailQueue},
    crate::domain::templates,
    crate::domain::user::{is_email, normalize_email},
    chrono::{DateTime, Utc},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    Mismatch,
    Expired,
    Missing,
}

/// Issue a fresh code for `email`, replacing any earlier one, and queue the
/// email that carries it.
pub async fn issue_code(
    codes: &dyn CodeStore,
    emails: &dyn EmailQueue,
    email: &str,
    now: DateTime<Utc>,
) -> Result<VerificationCode, PipelineError> {
    let email = normalize_email(email);
    if !is_email(&email) {
        return Err(PipelineError::Validation(format!("invalid email: {email}")));
    }

    let code = VerificationCode::issue(&email, now);
    codes.put(&code).await?;
    emails
        .enqueue(templates::verification_code_email(
            &email,
            &code.code,
            CODE_TTL_SECS / 60,
        ))
        .await?;

    tracing::info!(%email, expires_at = %code.expires_at, "verification code issued");
    Ok(code)
}

/// Check a code. The stored code is consumed on success and dropped once
/// expired; a mismatch leaves it in place.
pub async fn verify_code(
    codes: &dyn CodeStore,
    email: &str,
    candidate: &str,
    now: DateTime<Utc>,
) -> Result<CodeCheck, PipelineError> {
    let email = normalize_email(email);
    let Some(stored) = codes.get(&email).await? else {
        return Ok(CodeCheck::Missing);
    };

    if stored.is_expired(now) {
        codes.delete(&email).await?;
        return Ok(CodeCheck::Expired);
    }
    if stored.code != candidate.trim() {
        return Ok(CodeCheck::Mismatch);
    }

    codes.delete(&email).await?;
    Ok(CodeCheck::Valid)
}
