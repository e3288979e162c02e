use bookshelf_authz::Role;
use sqlx::{Executor, Sqlite, SqlitePool};

use super::models::UserRecord;

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as("SELECT id, email, roles, password FROM user WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Insert through any executor, so callers can batch inside a transaction.
    /// `password_hash` must already be a PHC string.
    pub async fn insert<'e, E>(
        executor: E,
        email: &str,
        roles: &[Role],
        password_hash: &str,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let roles = serde_json::to_string(roles).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let result = sqlx::query("INSERT INTO user (email, roles, password) VALUES (?, ?, ?)")
            .bind(email)
            .bind(roles)
            .bind(password_hash)
            .execute(executor)
            .await?;
        Ok(result.last_insert_rowid())
    }
}
