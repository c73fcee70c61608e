use {
    crate::domain::{
        error::PipelineError,
        notification::{EmailAttachment, EmailRequest, NewEmailRequest, RequestStatus},
        repo::EmailQueue,
    },
    chrono::{DateTime, Utc},
    futures::future::BoxFuture,
    sqlx::{PgPool, types::Json},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct EmailRow {
    id: Uuid,
    to_email: String,
    subject: String,
    html: String,
    attachments: Json<Vec<EmailAttachment>>,
    status: String,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    provider_message_id: Option<String>,
    error: Option<String>,
}

impl TryFrom<EmailRow> for EmailRequest {
    type Error = PipelineError;

    fn try_from(row: EmailRow) -> Result<Self, PipelineError> {
        Ok(Self {
            id: row.id,
            to: row.to_email,
            subject: row.subject,
            html: row.html,
            attachments: row.attachments.0,
            status: RequestStatus::try_from(row.status.as_str())?,
            created_at: row.created_at,
            sent_at: row.sent_at,
            provider_message_id: row.provider_message_id,
            error: row.error,
        })
    }
}

#[derive(Clone)]
pub struct PgEmailQueue {
    pool: PgPool,
}

impl PgEmailQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, request: NewEmailRequest) -> Result<Uuid, PipelineError> {
        let email = EmailRequest::new(request, Utc::now());
        sqlx::query(
            r#"
            INSERT INTO email_requests (id, to_email, subject, html, attachments, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(email.id)
        .bind(&email.to)
        .bind(&email.subject)
        .bind(&email.html)
        .bind(Json(&email.attachments))
        .bind(email.status.as_str())
        .bind(email.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(request_id = %email.id, to = %email.to, "email queued");
        Ok(email.id)
    }

    async fn claim(&self, limit: i64) -> Result<Vec<EmailRequest>, PipelineError> {
        let rows = sqlx::query_as::<_, EmailRow>(
            r#"
            UPDATE email_requests
            SET status = 'processing', updated_at = now()
            WHERE id IN (
                SELECT id FROM email_requests
                WHERE status = 'pending'
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, to_email, subject, html, attachments, status, created_at,
                      sent_at, provider_message_id, error
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EmailRequest::try_from).collect()
    }

    async fn sent(&self, id: Uuid, provider_message_id: &str) -> Result<bool, PipelineError> {
        let result = sqlx::query(
            r#"
            UPDATE email_requests
            SET status = 'sent', provider_message_id = $2, sent_at = now(), updated_at = now()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(provider_message_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn failed(&self, id: Uuid, error: &str) -> Result<bool, PipelineError> {
        let result = sqlx::query(
            r#"
            UPDATE email_requests
            SET status = 'error', error = $2, updated_at = now()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reap(&self) -> Result<u64, PipelineError> {
        let result = sqlx::query(
            r#"
            UPDATE email_requests
            SET status = 'pending', updated_at = now()
            WHERE status = 'processing' AND updated_at < now() - interval '2 minutes'
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl EmailQueue for PgEmailQueue {
    fn enqueue(&self, request: NewEmailRequest) -> BoxFuture<'_, Result<Uuid, PipelineError>> {
        Box::pin(self.insert(request))
    }

    fn claim_pending(&self, limit: i64) -> BoxFuture<'_, Result<Vec<EmailRequest>, PipelineError>> {
        Box::pin(self.claim(limit))
    }

    fn mark_sent<'a>(
        &'a self,
        id: Uuid,
        provider_message_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PipelineError>> {
        Box::pin(self.sent(id, provider_message_id))
    }

    fn mark_error<'a>(
        &'a self,
        id: Uuid,
        error: &'a str,
    ) -> BoxFuture<'a, Result<bool, PipelineError>> {
        Box::pin(self.failed(id, error))
    }

    fn reap_stale(&self) -> BoxFuture<'_, Result<u64, PipelineError>> {
        Box::pin(self.reap())
    }
}
