use {
    crate::domain::{
        error::PipelineError,
        id::PaymentId,
        money::MoneyAmount,
        payment::{NotificationFlag, NotificationsSent, PaymentRecord, PaymentStatus, PaymentUpdate},
        repo::{MergeOutcome, PaymentStore},
    },
    chrono::{DateTime, SubsecRound, Utc},
    futures::future::BoxFuture,
    rust_decimal::Decimal,
    sqlx::PgPool,
};

const SELECT_PAYMENT: &str = r#"
    SELECT payment_id, status, status_detail, amount, date_created, date_approved,
           external_reference, payment_method, payer_email, description,
           notified_pending, notified_approved, notified_rejected, notified_no_user,
           user_id, user_email, created_at, updated_at
    FROM payments
    WHERE payment_id = $1
"#;

#[derive(sqlx::FromRow)]
struct PaymentRow {
    payment_id: String,
    status: String,
    status_detail: Option<String>,
    amount: Option<Decimal>,
    date_created: Option<DateTime<Utc>>,
    date_approved: Option<DateTime<Utc>>,
    external_reference: Option<String>,
    payment_method: Option<String>,
    payer_email: Option<String>,
    description: Option<String>,
    notified_pending: bool,
    notified_approved: bool,
    notified_rejected: bool,
    notified_no_user: bool,
    user_id: Option<String>,
    user_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = PipelineError;

    fn try_from(row: PaymentRow) -> Result<Self, PipelineError> {
        Ok(Self {
            payment_id: PaymentId::new(row.payment_id)?,
            status: PaymentStatus::from(row.status),
            status_detail: row.status_detail,
            amount: row.amount.map(MoneyAmount::new).transpose()?,
            date_created: row.date_created,
            date_approved: row.date_approved,
            external_reference: row.external_reference,
            payment_method: row.payment_method,
            payer_email: row.payer_email,
            description: row.description,
            notifications_sent: NotificationsSent {
                pending: row.notified_pending,
                approved: row.notified_approved,
                rejected: row.notified_rejected,
                no_user: row.notified_no_user,
            },
            user_id: row.user_id,
            user_email: row.user_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn flag_column(flag: NotificationFlag) -> &'static str {
    match flag {
        NotificationFlag::Pending => "notified_pending",
        NotificationFlag::Approved => "notified_approved",
        NotificationFlag::Rejected => "notified_rejected",
        NotificationFlag::NoUser => "notified_no_user",
    }
}

#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, PipelineError> {
        sqlx::query_as::<_, PaymentRow>(SELECT_PAYMENT)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(PaymentRecord::try_from)
            .transpose()
    }

    /// Advisory lock on the payment id, read, merge in memory, write back.
    /// Notification flags are never written here.
    async fn merge_update(
        &self,
        id: &PaymentId,
        update: &PaymentUpdate,
    ) -> Result<MergeOutcome, PipelineError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        // Serializes merges per payment, including the very first insert.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        let previous = sqlx::query_as::<_, PaymentRow>(SELECT_PAYMENT)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .map(PaymentRecord::try_from)
            .transpose()?;

        // Postgres keeps microseconds.
        let now = Utc::now().trunc_subsecs(6);
        let current = match &previous {
            Some(existing) => existing.merged(update, now),
            None => PaymentRecord::new(id.clone(), update, now),
        };

        if previous.as_ref() == Some(&current) {
            tx.commit().await?;
            return Ok(MergeOutcome { previous, current });
        }

        sqlx::query(
            r#"
            INSERT INTO payments
                (payment_id, status, status_detail, amount, date_created, date_approved,
                 external_reference, payment_method, payer_email, description,
                 user_id, user_email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (payment_id) DO UPDATE SET
                status = EXCLUDED.status,
                status_detail = EXCLUDED.status_detail,
                amount = EXCLUDED.amount,
                date_created = EXCLUDED.date_created,
                date_approved = EXCLUDED.date_approved,
                external_reference = EXCLUDED.external_reference,
                payment_method = EXCLUDED.payment_method,
                payer_email = EXCLUDED.payer_email,
                description = EXCLUDED.description,
                user_id = EXCLUDED.user_id,
                user_email = EXCLUDED.user_email,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(current.payment_id.as_str())
        .bind(current.status.as_str())
        .bind(current.status_detail.as_deref())
        .bind(current.amount.map(|a| a.value()))
        .bind(current.date_created)
        .bind(current.date_approved)
        .bind(current.external_reference.as_deref())
        .bind(current.payment_method.as_deref())
        .bind(current.payer_email.as_deref())
        .bind(current.description.as_deref())
        .bind(current.user_id.as_deref())
        .bind(current.user_email.as_deref())
        .bind(current.created_at)
        .bind(current.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(MergeOutcome { previous, current })
    }

    async fn claim(&self, id: &PaymentId, flag: NotificationFlag) -> Result<bool, PipelineError> {
        let column = flag_column(flag);
        let result = sqlx::query(&format!(
            "UPDATE payments SET {column} = true WHERE payment_id = $1 AND NOT {column}"
        ))
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl PaymentStore for PgPaymentStore {
    fn get<'a>(
        &'a self,
        id: &'a PaymentId,
    ) -> BoxFuture<'a, Result<Option<PaymentRecord>, PipelineError>> {
        Box::pin(self.fetch(id))
    }

    fn merge<'a>(
        &'a self,
        id: &'a PaymentId,
        update: &'a PaymentUpdate,
    ) -> BoxFuture<'a, Result<MergeOutcome, PipelineError>> {
        Box::pin(self.merge_update(id, update))
    }

    fn claim_notification<'a>(
        &'a self,
        id: &'a PaymentId,
        flag: NotificationFlag,
    ) -> BoxFuture<'a, Result<bool, PipelineError>> {
        Box::pin(self.claim(id, flag))
    }
}
