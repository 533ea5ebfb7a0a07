//! In-memory stores backing the service and router tests.

use std::{borrow::Cow, error::Error as StdError, sync::Mutex};

use async_trait::async_trait;
use sqlx::error::{DatabaseError, ErrorKind};
use time::OffsetDateTime;

use super::{AdvertisementStore, FavoriteStore, UserStore};
use crate::{
    filters::AdvertisementQuery,
    models::{
        Advertisement, AdvertisementChanges, AdvertisementStatus, AdvertisementWithCreator,
        Favorite, NewAdvertisement, User,
    },
    permissions,
};

/// The constraint errors Postgres raises for the schema's UNIQUE and
/// FOREIGN KEY rules.
#[derive(Debug, thiserror::Error)]
#[error("violates constraint \"{constraint}\"")]
pub struct ConstraintViolation {
    code: &'static str,
    constraint: &'static str,
}

impl ConstraintViolation {
    pub fn unique(constraint: &'static str) -> Self {
        Self {
            code: "23505",
            constraint,
        }
    }

    pub fn foreign_key(constraint: &'static str) -> Self {
        Self {
            code: "23503",
            constraint,
        }
    }

    pub fn into_sqlx(self) -> sqlx::Error {
        sqlx::Error::Database(Box::new(self))
    }
}

impl DatabaseError for ConstraintViolation {
    fn message(&self) -> &str {
        self.constraint
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.constraint)
    }

    fn kind(&self) -> ErrorKind {
        match self.code {
            "23505" => ErrorKind::UniqueViolation,
            "23503" => ErrorKind::ForeignKeyViolation,
            _ => ErrorKind::Other,
        }
    }
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    advertisements: Vec<Advertisement>,
    favorites: Vec<Favorite>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn with_creator(&self, advertisement: &Advertisement) -> Option<AdvertisementWithCreator> {
        let creator = self.users.iter().find(|u| u.id == advertisement.creator_id)?;
        Some(AdvertisementWithCreator {
            id: advertisement.id,
            title: advertisement.title.clone(),
            description: advertisement.description.clone(),
            status: advertisement.status,
            creator_id: advertisement.creator_id,
            created_at: advertisement.created_at,
            updated_at: advertisement.updated_at,
            creator_username: creator.username.clone(),
            creator_first_name: creator.first_name.clone(),
            creator_last_name: creator.last_name.clone(),
        })
    }

    fn is_favorite(&self, user_id: i32, advertisement_id: i32) -> bool {
        self.favorites
            .iter()
            .any(|f| f.user_id == user_id && f.advertisement_id == advertisement_id)
    }

    fn matching(&self, query: &AdvertisementQuery) -> Vec<AdvertisementWithCreator> {
        let mut rows: Vec<_> = self
            .advertisements
            .iter()
            .filter_map(|ad| self.with_creator(ad))
            .filter(|ad| permissions::can_view(ad, query.viewer))
            .filter(|ad| {
                let favorited = query
                    .viewer
                    .is_some_and(|viewer| self.is_favorite(viewer.user_id, ad.id));
                query.filter.matches(ad, favorited, query.viewer)
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }

    pub fn add_user(&self, username: &str, is_staff: bool) -> User {
        let mut state = self.state();
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            password_hash: String::new(),
            first_name: format!("{username}-first"),
            last_name: format!("{username}-last"),
            is_staff,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        user
    }

    pub fn set_created_at(&self, advertisement_id: i32, created_at: OffsetDateTime) {
        let mut state = self.state();
        if let Some(ad) = state
            .advertisements
            .iter_mut()
            .find(|ad| ad.id == advertisement_id)
        {
            ad.created_at = created_at;
        }
    }

    pub fn favorite_count(&self, user_id: i32, advertisement_id: i32) -> usize {
        self.state()
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id && f.advertisement_id == advertisement_id)
            .count()
    }

    pub fn stored_advertisement(&self, id: i32) -> Option<Advertisement> {
        self.state()
            .advertisements
            .iter()
            .find(|ad| ad.id == id)
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, sqlx::Error> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.username == username) {
            return Err(ConstraintViolation::unique("users_username_key").into_sqlx());
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_staff: false,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, sqlx::Error> {
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, sqlx::Error> {
        Ok(self.state().users.iter().any(|u| u.username == username))
    }
}

#[async_trait]
impl AdvertisementStore for MemoryStore {
    async fn create(
        &self,
        creator_id: i32,
        advertisement: &NewAdvertisement,
    ) -> Result<Advertisement, sqlx::Error> {
        let mut state = self.state();
        let now = OffsetDateTime::now_utc();
        let record = Advertisement {
            id: state.next_id(),
            title: advertisement.title.clone(),
            description: advertisement.description.clone(),
            status: advertisement.status,
            creator_id,
            created_at: now,
            updated_at: now,
        };
        state.advertisements.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<AdvertisementWithCreator>, sqlx::Error> {
        let state = self.state();
        Ok(state
            .advertisements
            .iter()
            .find(|ad| ad.id == id)
            .and_then(|ad| state.with_creator(ad)))
    }

    async fn list(
        &self,
        query: &AdvertisementQuery,
    ) -> Result<Vec<AdvertisementWithCreator>, sqlx::Error> {
        Ok(self
            .state()
            .matching(query)
            .into_iter()
            .skip(query.page.offset as usize)
            .take(query.page.limit as usize)
            .collect())
    }

    async fn count(&self, query: &AdvertisementQuery) -> Result<i64, sqlx::Error> {
        Ok(self.state().matching(query).len() as i64)
    }

    async fn count_open_by_creator(&self, creator_id: i32) -> Result<i64, sqlx::Error> {
        Ok(self
            .state()
            .advertisements
            .iter()
            .filter(|ad| ad.creator_id == creator_id && ad.status == AdvertisementStatus::Open)
            .count() as i64)
    }

    async fn update(
        &self,
        id: i32,
        changes: &AdvertisementChanges,
    ) -> Result<Advertisement, sqlx::Error> {
        let mut state = self.state();
        let ad = state
            .advertisements
            .iter_mut()
            .find(|ad| ad.id == id)
            .ok_or(sqlx::Error::RowNotFound)?;

        if let Some(title) = &changes.title {
            ad.title = title.clone();
        }
        if let Some(description) = &changes.description {
            ad.description = description.clone();
        }
        if let Some(status) = changes.status {
            ad.status = status;
        }
        ad.updated_at = OffsetDateTime::now_utc();

        Ok(ad.clone())
    }

    async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let mut state = self.state();
        let before = state.advertisements.len();
        state.advertisements.retain(|ad| ad.id != id);
        state.favorites.retain(|f| f.advertisement_id != id);
        Ok(state.advertisements.len() < before)
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn create(&self, user_id: i32, advertisement_id: i32) -> Result<Favorite, sqlx::Error> {
        let mut state = self.state();
        if let Some(existing) = state
            .favorites
            .iter()
            .find(|f| f.user_id == user_id && f.advertisement_id == advertisement_id)
        {
            return Ok(existing.clone());
        }
        if !state.advertisements.iter().any(|ad| ad.id == advertisement_id) {
            return Err(
                ConstraintViolation::foreign_key("favorites_advertisement_id_fkey").into_sqlx(),
            );
        }

        let favorite = Favorite {
            id: state.next_id(),
            user_id,
            advertisement_id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.favorites.push(favorite.clone());
        Ok(favorite)
    }

    async fn delete(&self, user_id: i32, advertisement_id: i32) -> Result<bool, sqlx::Error> {
        let mut state = self.state();
        let before = state.favorites.len();
        state
            .favorites
            .retain(|f| !(f.user_id == user_id && f.advertisement_id == advertisement_id));
        Ok(state.favorites.len() < before)
    }

    async fn exists(&self, user_id: i32, advertisement_id: i32) -> Result<bool, sqlx::Error> {
        Ok(self.state().is_favorite(user_id, advertisement_id))
    }

    async fn favorited_among(
        &self,
        user_id: i32,
        advertisement_ids: &[i32],
    ) -> Result<Vec<i32>, sqlx::Error> {
        let state = self.state();
        Ok(advertisement_ids
            .iter()
            .copied()
            .filter(|id| state.is_favorite(user_id, *id))
            .collect())
    }
}
