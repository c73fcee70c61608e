use {
    crate::domain::{
        error::PipelineError,
        id::NotificationGroupId,
        notification::{InAppNotification, NotificationRequest, RequestStatus},
        repo::NotificationStore,
    },
    chrono::{DateTime, Utc},
    futures::future::BoxFuture,
    sqlx::PgPool,
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    user_email: String,
    title: String,
    body: String,
    data: serde_json::Value,
    status: String,
    notification_group_id: Uuid,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl TryFrom<RequestRow> for NotificationRequest {
    type Error = PipelineError;

    fn try_from(row: RequestRow) -> Result<Self, PipelineError> {
        Ok(Self {
            id: row.id,
            user_email: row.user_email,
            title: row.title,
            body: row.body,
            data: row.data,
            status: RequestStatus::try_from(row.status.as_str())?,
            notification_group_id: NotificationGroupId::from(row.notification_group_id),
            created_at: row.created_at,
            processed_at: row.processed_at,
            error: row.error,
        })
    }
}

#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_request(&self, request: NotificationRequest) -> Result<Uuid, PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO notification_requests
                (id, user_email, title, body, data, status, notification_group_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.id)
        .bind(&request.user_email)
        .bind(&request.title)
        .bind(&request.body)
        .bind(&request.data)
        .bind(request.status.as_str())
        .bind(request.notification_group_id.as_uuid())
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;
        Ok(request.id)
    }

    async fn insert_in_app(&self, entry: InAppNotification) -> Result<Uuid, PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO in_app_notifications
                (id, user_email, title, body, data, notification_group_id, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_email)
        .bind(&entry.title)
        .bind(&entry.body)
        .bind(&entry.data)
        .bind(entry.notification_group_id.as_uuid())
        .bind(entry.read)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(entry.id)
    }

    /// Uses SKIP LOCKED so concurrent workers never claim the same row.
    async fn claim(&self, limit: i64) -> Result<Vec<NotificationRequest>, PipelineError> {
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE notification_requests
            SET status = 'processing', updated_at = now()
            WHERE id IN (
                SELECT id FROM notification_requests
                WHERE status = 'pending'
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, user_email, title, body, data, status, notification_group_id,
                      created_at, processed_at, error
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationRequest::try_from).collect()
    }

    async fn finish(&self, id: Uuid, error: Option<&str>) -> Result<bool, PipelineError> {
        let status = match error {
            None => RequestStatus::Sent,
            Some(_) => RequestStatus::Error,
        };
        let result = sqlx::query(
            r#"
            UPDATE notification_requests
            SET status = $2, error = $3, processed_at = now(), updated_at = now()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reap(&self) -> Result<u64, PipelineError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_requests
            SET status = 'pending', updated_at = now()
            WHERE status = 'processing' AND updated_at < now() - interval '2 minutes'
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl NotificationStore for PgNotificationStore {
    fn enqueue(&self, request: NotificationRequest) -> BoxFuture<'_, Result<Uuid, PipelineError>> {
        Box::pin(self.insert_request(request))
    }

    fn log_in_app(&self, entry: InAppNotification) -> BoxFuture<'_, Result<Uuid, PipelineError>> {
        Box::pin(self.insert_in_app(entry))
    }

    fn claim_pending(
        &self,
        limit: i64,
    ) -> BoxFuture<'_, Result<Vec<NotificationRequest>, PipelineError>> {
        Box::pin(self.claim(limit))
    }

    fn mark_sent(&self, id: Uuid) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(self.finish(id, None))
    }

    fn mark_error<'a>(
        &'a self,
        id: Uuid,
        error: &'a str,
    ) -> BoxFuture<'a, Result<bool, PipelineError>> {
        Box::pin(self.finish(id, Some(error)))
    }

    fn reap_stale(&self) -> BoxFuture<'_, Result<u64, PipelineError>> {
        Box::pin(self.reap())
    }
}
