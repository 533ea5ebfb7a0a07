use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::UserStore;
use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[instrument(name = "db.user.create", skip(self, password_hash))]
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, first_name, last_name, is_staff, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await
    }

    #[instrument(name = "db.user.find_by_id", skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, first_name, last_name, is_staff, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.user.find_by_username", skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, first_name, last_name, is_staff, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.user.exists_by_username", skip(self))]
    async fn exists_by_username(&self, username: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1) as exists")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<bool, _>("exists"))
    }
}
