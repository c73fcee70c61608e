use {
    crate::domain::{
        error::PipelineError,
        repo::UserDirectory,
        user::{User, UserRole},
    },
    futures::future::BoxFuture,
    sqlx::PgPool,
};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    fcm_token: Option<String>,
    is_admin: bool,
    role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            fcm_token: row.fcm_token,
            is_admin: row.is_admin,
            role: UserRole::from(row.role.as_str()),
        }
    }
}

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn one(&self, sql: &str, key: &str) -> Result<Option<User>, PipelineError> {
        let row = sqlx::query_as::<_, UserRow>(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn admins(&self) -> Result<Vec<User>, PipelineError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, fcm_token, is_admin, role FROM users WHERE is_admin OR role = 'admin'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn clear_token(&self, email: &str, token: &str) -> Result<(), PipelineError> {
        sqlx::query("UPDATE users SET fcm_token = NULL WHERE lower(email) = $1 AND fcm_token = $2")
            .bind(email.to_lowercase())
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl UserDirectory for PgUserDirectory {
    fn find_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>, PipelineError>> {
        Box::pin(async move {
            let email = email.trim().to_lowercase();
            self.one(
                "SELECT id, email, fcm_token, is_admin, role FROM users WHERE lower(email) = $1",
                &email,
            )
            .await
        })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<User>, PipelineError>> {
        Box::pin(self.one(
            "SELECT id, email, fcm_token, is_admin, role FROM users WHERE id = $1",
            id,
        ))
    }

    fn list_admins(&self) -> BoxFuture<'_, Result<Vec<User>, PipelineError>> {
        Box::pin(self.admins())
    }

    fn clear_push_token<'a>(
        &'a self,
        email: &'a str,
        token: &'a str,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        Box::pin(self.clear_token(email, token))
    }
}
