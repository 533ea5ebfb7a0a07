use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, FromRow)]
pub struct Favorite {
    pub id: i32,
    pub user_id: i32,
    pub advertisement_id: i32,
    pub created_at: OffsetDateTime,
}

/// Wire form of a favorite. The owning user is implied by the request and is
/// never part of the payload.
#[derive(Debug, Serialize)]
pub struct FavoriteDto {
    pub id: i32,
    pub advertisement: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Favorite> for FavoriteDto {
    fn from(favorite: Favorite) -> Self {
        Self {
            id: favorite.id,
            advertisement: favorite.advertisement_id,
            created_at: favorite.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FavoriteAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<FavoriteDto>,
}

impl FavoriteAck {
    pub fn added(favorite: Favorite) -> Self {
        Self {
            status: "added to favorites",
            favorite: Some(favorite.into()),
        }
    }

    pub fn removed() -> Self {
        Self {
            status: "removed from favorites",
            favorite: None,
        }
    }
}
