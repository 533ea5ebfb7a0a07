use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use super::CreatorDto;
use crate::error::{AppError, AppResult};

/// How many OPEN advertisements a single user may hold when creating another.
pub const MAX_OPEN_ADVERTISEMENTS: i64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "advertisement_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AdvertisementStatus {
    #[default]
    Open,
    Closed,
    Draft,
}

impl std::str::FromStr for AdvertisementStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "DRAFT" => Ok(Self::Draft),
            other => Err(AppError::Validation(format!(
                "status: \"{other}\" is not a valid choice"
            ))),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Advertisement {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub status: AdvertisementStatus,
    pub creator_id: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct AdvertisementWithCreator {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub status: AdvertisementStatus,
    pub creator_id: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub creator_username: String,
    pub creator_first_name: String,
    pub creator_last_name: String,
}

#[derive(Debug, Serialize)]
pub struct AdvertisementsResponse {
    pub advertisements: Vec<AdvertisementDto>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvertisementDto {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub creator: CreatorDto,
    pub status: AdvertisementStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_favorite: bool,
}

impl AdvertisementDto {
    /// `is_favorite` must already reflect the requesting identity; anonymous
    /// callers always pass `false`.
    pub fn from_record(advertisement: AdvertisementWithCreator, is_favorite: bool) -> Self {
        Self {
            id: advertisement.id,
            title: advertisement.title,
            description: advertisement.description,
            creator: CreatorDto {
                id: advertisement.creator_id,
                username: advertisement.creator_username,
                first_name: advertisement.creator_first_name,
                last_name: advertisement.creator_last_name,
            },
            status: advertisement.status,
            created_at: advertisement.created_at,
            is_favorite,
        }
    }
}

/// Client payload for creating an advertisement. Unknown fields, including a
/// client-supplied `creator`, are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateAdvertisementInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<AdvertisementStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdvertisement {
    pub title: String,
    pub description: String,
    pub status: AdvertisementStatus,
}

impl CreateAdvertisementInput {
    pub fn validate(self) -> AppResult<NewAdvertisement> {
        Ok(NewAdvertisement {
            title: validate_title(self.title)?,
            description: self.description.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAdvertisementInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<AdvertisementStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisementChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<AdvertisementStatus>,
}

impl UpdateAdvertisementInput {
    /// A full update (`partial == false`) must carry a title; a partial one may
    /// carry any subset of fields.
    pub fn into_changes(self, partial: bool) -> AppResult<AdvertisementChanges> {
        let title = match self.title {
            Some(title) => Some(validate_title(title)?),
            None if partial => None,
            None => return Err(AppError::Validation("title: this field is required".into())),
        };

        Ok(AdvertisementChanges {
            title,
            description: self.description,
            status: self.status,
        })
    }
}

fn validate_title(title: String) -> AppResult<String> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title: this field may not be blank".into()));
    }
    Ok(title)
}
