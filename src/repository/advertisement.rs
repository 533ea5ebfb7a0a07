use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use super::AdvertisementStore;
use crate::{
    filters::AdvertisementQuery,
    models::{
        Advertisement, AdvertisementChanges, AdvertisementStatus, AdvertisementWithCreator,
        NewAdvertisement,
    },
    permissions,
};

const SELECT_WITH_CREATOR: &str = r#"
    SELECT
        a.id, a.title, a.description, a.status, a.creator_id,
        a.created_at, a.updated_at,
        u.username AS creator_username,
        u.first_name AS creator_first_name,
        u.last_name AS creator_last_name
    FROM advertisements a
    JOIN users u ON a.creator_id = u.id
"#;

#[derive(Clone)]
pub struct AdvertisementRepository {
    pool: PgPool,
}

impl AdvertisementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `WHERE` clause shared by listing and counting.
fn push_where(query: &AdvertisementQuery, builder: &mut QueryBuilder<'_, Postgres>) {
    builder.push(" WHERE TRUE");
    permissions::push_visibility(query.viewer, builder);
    query.filter.push_predicates(query.viewer, builder);
}

#[async_trait]
impl AdvertisementStore for AdvertisementRepository {
    #[instrument(name = "db.advertisement.create", skip(self, advertisement))]
    async fn create(
        &self,
        creator_id: i32,
        advertisement: &NewAdvertisement,
    ) -> Result<Advertisement, sqlx::Error> {
        sqlx::query_as::<_, Advertisement>(
            r#"
            INSERT INTO advertisements (title, description, status, creator_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, status, creator_id, created_at, updated_at
            "#,
        )
        .bind(&advertisement.title)
        .bind(&advertisement.description)
        .bind(advertisement.status)
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await
    }

    #[instrument(name = "db.advertisement.find_by_id", skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<AdvertisementWithCreator>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_WITH_CREATOR);
        builder.push(" WHERE a.id = ").push_bind(id);

        builder
            .build_query_as::<AdvertisementWithCreator>()
            .fetch_optional(&self.pool)
            .await
    }

    #[instrument(name = "db.advertisement.list", skip(self))]
    async fn list(
        &self,
        query: &AdvertisementQuery,
    ) -> Result<Vec<AdvertisementWithCreator>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_WITH_CREATOR);
        push_where(query, &mut builder);
        builder
            .push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset);

        builder
            .build_query_as::<AdvertisementWithCreator>()
            .fetch_all(&self.pool)
            .await
    }

    #[instrument(name = "db.advertisement.count", skip(self))]
    async fn count(&self, query: &AdvertisementQuery) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS count FROM advertisements a");
        push_where(query, &mut builder);

        let row = builder.build().fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("count"))
    }

    #[instrument(name = "db.advertisement.count_open_by_creator", skip(self))]
    async fn count_open_by_creator(&self, creator_id: i32) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM advertisements WHERE creator_id = $1 AND status = $2",
        )
        .bind(creator_id)
        .bind(AdvertisementStatus::Open)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("count"))
    }

    #[instrument(name = "db.advertisement.update", skip(self, changes))]
    async fn update(
        &self,
        id: i32,
        changes: &AdvertisementChanges,
    ) -> Result<Advertisement, sqlx::Error> {
        sqlx::query_as::<_, Advertisement>(
            r#"
            UPDATE advertisements
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, status, creator_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.status)
        .fetch_one(&self.pool)
        .await
    }

    #[instrument(name = "db.advertisement.delete", skip(self))]
    async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM advertisements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
