//! Storage contracts and their PostgreSQL implementations.

mod advertisement;
mod favorite;
#[cfg(test)]
pub mod memory;
mod user;

use async_trait::async_trait;

use crate::{
    filters::AdvertisementQuery,
    models::{
        Advertisement, AdvertisementChanges, AdvertisementWithCreator, Favorite, NewAdvertisement,
        User,
    },
};

pub use advertisement::AdvertisementRepository;
pub use favorite::FavoriteRepository;
pub use user::UserRepository;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, sqlx::Error>;
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, sqlx::Error>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    async fn exists_by_username(&self, username: &str) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait AdvertisementStore: Send + Sync {
    async fn create(
        &self,
        creator_id: i32,
        advertisement: &NewAdvertisement,
    ) -> Result<Advertisement, sqlx::Error>;
    async fn find_by_id(&self, id: i32) -> Result<Option<AdvertisementWithCreator>, sqlx::Error>;
    /// Visible rows matching the filter, newest first.
    async fn list(
        &self,
        query: &AdvertisementQuery,
    ) -> Result<Vec<AdvertisementWithCreator>, sqlx::Error>;
    /// Same predicates as [`list`](Self::list), ignoring the page.
    async fn count(&self, query: &AdvertisementQuery) -> Result<i64, sqlx::Error>;
    async fn count_open_by_creator(&self, creator_id: i32) -> Result<i64, sqlx::Error>;
    async fn update(
        &self,
        id: i32,
        changes: &AdvertisementChanges,
    ) -> Result<Advertisement, sqlx::Error>;
    async fn delete(&self, id: i32) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Returns the existing row when the pair is already stored.
    async fn create(&self, user_id: i32, advertisement_id: i32) -> Result<Favorite, sqlx::Error>;
    async fn delete(&self, user_id: i32, advertisement_id: i32) -> Result<bool, sqlx::Error>;
    async fn exists(&self, user_id: i32, advertisement_id: i32) -> Result<bool, sqlx::Error>;
    /// The subset of `advertisement_ids` that `user_id` has favorited.
    async fn favorited_among(
        &self,
        user_id: i32,
        advertisement_ids: &[i32],
    ) -> Result<Vec<i32>, sqlx::Error>;
}
