//! Listing filters: raw query parameters are parsed once into a typed
//! [`AdvertisementFilter`], which then compiles into SQL predicates.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use time::{Date, OffsetDateTime, macros::format_description};

use crate::{
    error::{AppError, AppResult},
    models::{AdvertisementStatus, Identity},
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Query string as received. Everything stays textual here so that a bad
/// value becomes a validation error naming the parameter.
#[derive(Debug, Default, Deserialize)]
pub struct ListAdvertisementsQuery {
    pub status: Option<String>,
    pub created_at_after: Option<String>,
    pub created_at_before: Option<String>,
    pub creator: Option<String>,
    pub favorites: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvertisementFilter {
    pub status: Option<AdvertisementStatus>,
    /// Inclusive lower bound.
    pub created_from: Option<OffsetDateTime>,
    /// Exclusive upper bound.
    pub created_until: Option<OffsetDateTime>,
    pub creator: Option<i32>,
    pub favorites: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Everything a listing needs: what to match, who is asking, which slice.
#[derive(Debug, Clone, Copy)]
pub struct AdvertisementQuery {
    pub filter: AdvertisementFilter,
    pub viewer: Option<Identity>,
    pub page: Page,
}

impl ListAdvertisementsQuery {
    pub fn parse(self) -> AppResult<(AdvertisementFilter, Page)> {
        let status = non_empty(self.status.as_deref())
            .map(str::parse::<AdvertisementStatus>)
            .transpose()?;

        let created_from = non_empty(self.created_at_after.as_deref())
            .map(|raw| parse_date("created_at_after", raw))
            .transpose()?
            .map(start_of_day);

        // The "before" date is inclusive, so the bound is the next midnight.
        let created_until = non_empty(self.created_at_before.as_deref())
            .map(|raw| parse_date("created_at_before", raw))
            .transpose()?
            .and_then(Date::next_day)
            .map(start_of_day);

        let creator = non_empty(self.creator.as_deref())
            .map(|raw| {
                raw.parse::<i32>().map_err(|_| {
                    AppError::Validation(format!("creator: \"{raw}\" is not a valid user id"))
                })
            })
            .transpose()?;

        let favorites = non_empty(self.favorites.as_deref())
            .map(parse_bool)
            .transpose()?
            .unwrap_or(false);

        let filter = AdvertisementFilter {
            status,
            created_from,
            created_until,
            creator,
            favorites,
        };

        Ok((filter, Page::new(self.limit, self.offset)))
    }
}

impl AdvertisementFilter {
    /// Restricts a listing to the viewer's favorites and nothing else.
    pub fn favorites_only() -> Self {
        Self {
            favorites: true,
            ..Self::default()
        }
    }

    /// Appends `AND …` predicates for every supplied criterion. The builder
    /// must already be positioned after a `WHERE` clause over `advertisements a`.
    pub fn push_predicates(&self, viewer: Option<Identity>, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            builder.push(" AND a.status = ").push_bind(status);
        }
        if let Some(from) = self.created_from {
            builder.push(" AND a.created_at >= ").push_bind(from);
        }
        if let Some(until) = self.created_until {
            builder.push(" AND a.created_at < ").push_bind(until);
        }
        if let Some(creator) = self.creator {
            builder.push(" AND a.creator_id = ").push_bind(creator);
        }
        // Anonymous favorites is a no-op, not an empty result.
        if let (true, Some(identity)) = (self.favorites, viewer) {
            builder
                .push(
                    " AND EXISTS (SELECT 1 FROM favorites f \
                     WHERE f.advertisement_id = a.id AND f.user_id = ",
                )
                .push_bind(identity.user_id)
                .push(")");
        }
    }

    /// In-process equivalent of [`push_predicates`](Self::push_predicates).
    #[cfg(test)]
    pub fn matches(
        &self,
        advertisement: &crate::models::AdvertisementWithCreator,
        favorited_by_viewer: bool,
        viewer: Option<Identity>,
    ) -> bool {
        self.status.is_none_or(|status| advertisement.status == status)
            && self.created_from.is_none_or(|from| advertisement.created_at >= from)
            && self.created_until.is_none_or(|until| advertisement.created_at < until)
            && self.creator.is_none_or(|creator| advertisement.creator_id == creator)
            && (!self.favorites || viewer.is_none() || favorited_by_viewer)
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_date(param: &str, raw: &str) -> AppResult<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::Validation(format!("{param}: expected a date as YYYY-MM-DD")))
}

fn start_of_day(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}

fn parse_bool(raw: &str) -> AppResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "favorites: \"{raw}\" is not a valid boolean"
        ))),
    }
}
