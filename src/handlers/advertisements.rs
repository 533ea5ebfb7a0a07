use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    filters::{ListAdvertisementsQuery, Page},
    middleware::{AuthUser, OptionalAuthUser},
    models::{
        AdvertisementDto, AdvertisementsResponse, CreateAdvertisementInput, FavoriteAck,
        UpdateAdvertisementInput,
    },
};

#[derive(Debug, serde::Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_advertisements(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    AppQuery(query): AppQuery<ListAdvertisementsQuery>,
) -> AppResult<Json<AdvertisementsResponse>> {
    let (filter, page) = query.parse()?;
    let response = state.advertisement_service.list(filter, page, viewer).await?;

    Ok(Json(response))
}

pub async fn create_advertisement(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    AppJson(input): AppJson<CreateAdvertisementInput>,
) -> AppResult<(StatusCode, Json<AdvertisementDto>)> {
    let response = state.advertisement_service.create(identity, input).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_advertisement(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<AdvertisementDto>> {
    let response = state.advertisement_service.get(id, viewer).await?;

    Ok(Json(response))
}

pub async fn update_advertisement(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    AppPath(id): AppPath<i32>,
    AppJson(input): AppJson<UpdateAdvertisementInput>,
) -> AppResult<Json<AdvertisementDto>> {
    let response = state
        .advertisement_service
        .update(id, identity, input, false)
        .await?;

    Ok(Json(response))
}

pub async fn partial_update_advertisement(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    AppPath(id): AppPath<i32>,
    AppJson(input): AppJson<UpdateAdvertisementInput>,
) -> AppResult<Json<AdvertisementDto>> {
    let response = state
        .advertisement_service
        .update(id, identity, input, true)
        .await?;

    Ok(Json(response))
}

pub async fn delete_advertisement(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.advertisement_service.delete(id, identity).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn favorite_advertisement(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<FavoriteAck>> {
    let response = state.advertisement_service.favorite(id, identity).await?;

    Ok(Json(response))
}

pub async fn unfavorite_advertisement(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<FavoriteAck>> {
    let response = state.advertisement_service.unfavorite(id, identity).await?;

    Ok(Json(response))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<Json<AdvertisementsResponse>> {
    let page = Page::new(query.limit, query.offset);
    let response = state
        .advertisement_service
        .favorites(page, Some(identity))
        .await?;

    Ok(Json(response))
}
