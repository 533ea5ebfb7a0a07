use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::FavoriteStore;
use crate::models::Favorite;

#[derive(Clone)]
pub struct FavoriteRepository {
    pool: PgPool,
}

impl FavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteStore for FavoriteRepository {
    // The no-op update makes RETURNING yield the existing row on conflict, so
    // concurrent identical requests both succeed against a single record.
    #[instrument(name = "db.favorite.create", skip(self))]
    async fn create(&self, user_id: i32, advertisement_id: i32) -> Result<Favorite, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, advertisement_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, advertisement_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, advertisement_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(advertisement_id)
        .fetch_one(&self.pool)
        .await
    }

    #[instrument(name = "db.favorite.delete", skip(self))]
    async fn delete(&self, user_id: i32, advertisement_id: i32) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND advertisement_id = $2")
                .bind(user_id)
                .bind(advertisement_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db.favorite.exists", skip(self))]
    async fn exists(&self, user_id: i32, advertisement_id: i32) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM favorites WHERE user_id = $1 AND advertisement_id = $2
            ) as exists
            "#,
        )
        .bind(user_id)
        .bind(advertisement_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<bool, _>("exists"))
    }

    #[instrument(name = "db.favorite.favorited_among", skip(self, advertisement_ids))]
    async fn favorited_among(
        &self,
        user_id: i32,
        advertisement_ids: &[i32],
    ) -> Result<Vec<i32>, sqlx::Error> {
        if advertisement_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT advertisement_id
            FROM favorites
            WHERE user_id = $1 AND advertisement_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(advertisement_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get::<i32, _>("advertisement_id")).collect())
    }
}
