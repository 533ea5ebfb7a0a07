use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::AppResult,
    extract::AppJson,
    middleware::AuthUser,
    models::{CreatorDto, LoginInput, RegisterInput, UserResponse},
};

pub async fn register(
    State(state): State<AppState>,
    AppJson(input): AppJson<RegisterInput>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state.auth_service.register(input).await?;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<LoginInput>,
) -> AppResult<Json<UserResponse>> {
    let user = state.auth_service.login(input).await?;

    Ok(Json(UserResponse { user }))
}

pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<CreatorDto>> {
    let user = state.auth_service.get_user(identity.user_id).await?;

    Ok(Json(CreatorDto::from(user)))
}
