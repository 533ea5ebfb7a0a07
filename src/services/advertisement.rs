use std::sync::Arc;

use tracing::instrument;

use crate::{
    error::{AppError, AppResult, is_missing_row},
    filters::{AdvertisementFilter, AdvertisementQuery, Page},
    models::{
        AdvertisementDto, AdvertisementStatus, AdvertisementWithCreator, AdvertisementsResponse,
        CreateAdvertisementInput, FavoriteAck, Identity, MAX_OPEN_ADVERTISEMENTS,
        UpdateAdvertisementInput,
    },
    permissions::{self, Action},
    repository::{AdvertisementStore, FavoriteStore},
    telemetry::{
        ADVERTISEMENTS_CREATED, ADVERTISEMENTS_DELETED, ADVERTISEMENTS_UPDATED, FAVORITES_ADDED,
        FAVORITES_REMOVED,
    },
};

#[derive(Clone)]
pub struct AdvertisementService {
    advertisements: Arc<dyn AdvertisementStore>,
    favorites: Arc<dyn FavoriteStore>,
}

impl AdvertisementService {
    pub fn new(
        advertisements: Arc<dyn AdvertisementStore>,
        favorites: Arc<dyn FavoriteStore>,
    ) -> Self {
        Self {
            advertisements,
            favorites,
        }
    }

    #[instrument(name = "advertisement.list", skip(self))]
    pub async fn list(
        &self,
        filter: AdvertisementFilter,
        page: Page,
        viewer: Option<Identity>,
    ) -> AppResult<AdvertisementsResponse> {
        permissions::authorize(Action::List, viewer, None).into_result()?;

        self.page(AdvertisementQuery {
            filter,
            viewer,
            page,
        })
        .await
    }

    #[instrument(name = "advertisement.favorites", skip(self))]
    pub async fn favorites(
        &self,
        page: Page,
        viewer: Option<Identity>,
    ) -> AppResult<AdvertisementsResponse> {
        permissions::authorize(Action::MyFavorites, viewer, None).into_result()?;

        self.page(AdvertisementQuery {
            filter: AdvertisementFilter::favorites_only(),
            viewer,
            page,
        })
        .await
    }

    #[instrument(name = "advertisement.get", skip(self))]
    pub async fn get(&self, id: i32, viewer: Option<Identity>) -> AppResult<AdvertisementDto> {
        permissions::authorize(Action::Retrieve, viewer, None).into_result()?;

        let advertisement = self.find_visible(id, viewer).await?;
        self.to_dto(advertisement, viewer).await
    }

    #[instrument(name = "advertisement.create", skip(self, input), fields(creator_id = identity.user_id))]
    pub async fn create(
        &self,
        identity: Identity,
        input: CreateAdvertisementInput,
    ) -> AppResult<AdvertisementDto> {
        permissions::authorize(Action::Create, Some(identity), None).into_result()?;

        let new = input.validate()?;

        // Check-then-insert is not atomic; a concurrent create may overshoot.
        if new.status == AdvertisementStatus::Open
            && self
                .advertisements
                .count_open_by_creator(identity.user_id)
                .await?
                >= MAX_OPEN_ADVERTISEMENTS
        {
            return Err(AppError::Validation(format!(
                "cannot have more than {MAX_OPEN_ADVERTISEMENTS} open advertisements"
            )));
        }

        let advertisement = self.advertisements.create(identity.user_id, &new).await?;

        let created = self
            .advertisements
            .find_by_id(advertisement.id)
            .await?
            .ok_or(AppError::Internal(
                "Failed to fetch created advertisement".to_string(),
            ))?;

        ADVERTISEMENTS_CREATED.add(1, &[]);

        tracing::info!(advertisement_id = advertisement.id, status = ?advertisement.status, "Advertisement created");

        Ok(AdvertisementDto::from_record(created, false))
    }

    #[instrument(name = "advertisement.update", skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        identity: Identity,
        input: UpdateAdvertisementInput,
        partial: bool,
    ) -> AppResult<AdvertisementDto> {
        let action = if partial {
            Action::PartialUpdate
        } else {
            Action::Update
        };

        let advertisement = self.find_visible(id, Some(identity)).await?;
        permissions::authorize(action, Some(identity), Some(&advertisement)).into_result()?;

        let changes = input.into_changes(partial)?;
        self.advertisements
            .update(advertisement.id, &changes)
            .await
            .map_err(gone_as_not_found)?;

        let updated = self
            .advertisements
            .find_by_id(advertisement.id)
            .await?
            .ok_or_else(advertisement_not_found)?;

        ADVERTISEMENTS_UPDATED.add(1, &[]);

        tracing::info!(advertisement_id = advertisement.id, "Advertisement updated");

        self.to_dto(updated, Some(identity)).await
    }

    #[instrument(name = "advertisement.delete", skip(self))]
    pub async fn delete(&self, id: i32, identity: Identity) -> AppResult<()> {
        let advertisement = self.find_visible(id, Some(identity)).await?;
        permissions::authorize(Action::Destroy, Some(identity), Some(&advertisement))
            .into_result()?;

        self.advertisements.delete(advertisement.id).await?;

        ADVERTISEMENTS_DELETED.add(1, &[]);

        tracing::info!(advertisement_id = advertisement.id, "Advertisement deleted");

        Ok(())
    }

    #[instrument(name = "advertisement.favorite", skip(self))]
    pub async fn favorite(&self, id: i32, identity: Identity) -> AppResult<FavoriteAck> {
        permissions::authorize(Action::Favorite, Some(identity), None).into_result()?;

        let advertisement = self.find_visible(id, Some(identity)).await?;

        if advertisement.creator_id == identity.user_id {
            return Err(AppError::DomainRule(
                "cannot add your own advertisement to favorites".to_string(),
            ));
        }

        let already_favorited = self
            .favorites
            .exists(identity.user_id, advertisement.id)
            .await?;
        let favorite = self
            .favorites
            .create(identity.user_id, advertisement.id)
            .await
            .map_err(gone_as_not_found)?;

        if !already_favorited {
            FAVORITES_ADDED.add(1, &[]);
            tracing::info!(advertisement_id = advertisement.id, user_id = identity.user_id, "Advertisement favorited");
        }

        Ok(FavoriteAck::added(favorite))
    }

    #[instrument(name = "advertisement.unfavorite", skip(self))]
    pub async fn unfavorite(&self, id: i32, identity: Identity) -> AppResult<FavoriteAck> {
        permissions::authorize(Action::Unfavorite, Some(identity), None).into_result()?;

        let advertisement = self.find_visible(id, Some(identity)).await?;

        let was_favorited = self
            .favorites
            .delete(identity.user_id, advertisement.id)
            .await?;

        if was_favorited {
            FAVORITES_REMOVED.add(1, &[]);
            tracing::info!(advertisement_id = advertisement.id, user_id = identity.user_id, "Advertisement unfavorited");
        }

        Ok(FavoriteAck::removed())
    }

    /// Hidden drafts are indistinguishable from missing rows.
    async fn find_visible(
        &self,
        id: i32,
        viewer: Option<Identity>,
    ) -> AppResult<AdvertisementWithCreator> {
        self.advertisements
            .find_by_id(id)
            .await?
            .filter(|advertisement| permissions::can_view(advertisement, viewer))
            .ok_or_else(advertisement_not_found)
    }

    async fn to_dto(
        &self,
        advertisement: AdvertisementWithCreator,
        viewer: Option<Identity>,
    ) -> AppResult<AdvertisementDto> {
        let is_favorite = match viewer {
            Some(identity) => {
                self.favorites
                    .exists(identity.user_id, advertisement.id)
                    .await?
            }
            None => false,
        };

        Ok(AdvertisementDto::from_record(advertisement, is_favorite))
    }

    async fn page(&self, query: AdvertisementQuery) -> AppResult<AdvertisementsResponse> {
        let advertisements = self.advertisements.list(&query).await?;
        let total = self.advertisements.count(&query).await?;

        let ids: Vec<i32> = advertisements.iter().map(|a| a.id).collect();

        let favorited_ids = match query.viewer {
            Some(identity) => self.favorites.favorited_among(identity.user_id, &ids).await?,
            None => vec![],
        };

        let advertisements = advertisements
            .into_iter()
            .map(|a| {
                let is_favorite = favorited_ids.contains(&a.id);
                AdvertisementDto::from_record(a, is_favorite)
            })
            .collect();

        Ok(AdvertisementsResponse {
            advertisements,
            total,
        })
    }
}

fn advertisement_not_found() -> AppError {
    AppError::NotFound("Advertisement not found".to_string())
}

/// The advertisement was deleted between the visibility check and the write.
fn gone_as_not_found(err: sqlx::Error) -> AppError {
    if is_missing_row(&err) {
        advertisement_not_found()
    } else {
        AppError::Database(err)
    }
}
