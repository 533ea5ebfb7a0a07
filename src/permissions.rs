//! Who may see and who may change an advertisement.
//!
//! Visibility is decided before ownership: a DRAFT hidden from the viewer is
//! reported as missing, never as forbidden.

use sqlx::{Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::{AdvertisementStatus, AdvertisementWithCreator, Identity},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    Favorite,
    Unfavorite,
    MyFavorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AuthenticationRequired,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::AuthenticationRequired) => Err(AppError::Unauthorized),
            Decision::Deny(DenyReason::NotOwner) => Err(AppError::Forbidden(
                "only the creator or an administrator may modify this advertisement".into(),
            )),
        }
    }
}

/// Per-action check. `advertisement` is only consulted for object-level
/// actions and must already have passed [`can_view`].
pub fn authorize(
    action: Action,
    viewer: Option<Identity>,
    advertisement: Option<&AdvertisementWithCreator>,
) -> Decision {
    match action {
        Action::List | Action::Retrieve => Decision::Allow,
        Action::Create | Action::Favorite | Action::Unfavorite | Action::MyFavorites => {
            match viewer {
                Some(_) => Decision::Allow,
                None => Decision::Deny(DenyReason::AuthenticationRequired),
            }
        }
        Action::Update | Action::PartialUpdate | Action::Destroy => {
            let Some(identity) = viewer else {
                return Decision::Deny(DenyReason::AuthenticationRequired);
            };
            match advertisement {
                Some(ad) if identity.is_staff || ad.creator_id == identity.user_id => {
                    Decision::Allow
                }
                _ => Decision::Deny(DenyReason::NotOwner),
            }
        }
    }
}

pub fn can_view(advertisement: &AdvertisementWithCreator, viewer: Option<Identity>) -> bool {
    if advertisement.status != AdvertisementStatus::Draft {
        return true;
    }
    viewer.is_some_and(|identity| identity.is_staff || identity.user_id == advertisement.creator_id)
}

/// SQL form of [`can_view`] for listings over `advertisements a`.
pub fn push_visibility(viewer: Option<Identity>, builder: &mut QueryBuilder<'_, Postgres>) {
    match viewer {
        Some(identity) if identity.is_staff => {}
        Some(identity) => {
            builder
                .push(" AND (a.status <> ")
                .push_bind(AdvertisementStatus::Draft)
                .push(" OR a.creator_id = ")
                .push_bind(identity.user_id)
                .push(")");
        }
        None => {
            builder
                .push(" AND a.status <> ")
                .push_bind(AdvertisementStatus::Draft);
        }
    }
}
