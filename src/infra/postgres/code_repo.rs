use {
    crate::domain::{code::VerificationCode, error::PipelineError, repo::CodeStore},
    chrono::{DateTime, Utc},
    futures::future::BoxFuture,
    sqlx::PgPool,
};

#[derive(Clone)]
pub struct PgCodeStore {
    pool: PgPool,
}

impl PgCodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert(&self, code: &VerificationCode) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO verification_codes (email, code, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET code = EXCLUDED.code, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&code.email)
        .bind(&code.code)
        .bind(code.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, email: &str) -> Result<Option<VerificationCode>, PipelineError> {
        let row = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            "SELECT email, code, expires_at FROM verification_codes WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(email, code, expires_at)| VerificationCode {
            email,
            code,
            expires_at,
        }))
    }

    async fn remove(&self, email: &str) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM verification_codes WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl CodeStore for PgCodeStore {
    fn put<'a>(&'a self, code: &'a VerificationCode) -> BoxFuture<'a, Result<(), PipelineError>> {
        Box::pin(self.upsert(code))
    }

    fn get<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<VerificationCode>, PipelineError>> {
        Box::pin(self.find(email))
    }

    fn delete<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<(), PipelineError>> {
        Box::pin(self.remove(email))
    }
}
