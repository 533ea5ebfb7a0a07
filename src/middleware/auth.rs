use axum::{
    RequestPartsExt,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AppState, error::AppError, models::Identity};

/// Rejects the request unless it carries a valid bearer token.
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).await?;
        let identity = state.auth_service.identify(&token).await?;
        Ok(AuthUser(identity))
    }
}

/// Anonymous when the token is missing or no longer valid.
pub struct OptionalAuthUser(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Ok(token) = extract_token(parts).await else {
            return Ok(OptionalAuthUser(None));
        };

        match state.auth_service.identify(&token).await {
            Ok(identity) => Ok(OptionalAuthUser(Some(identity))),
            Err(AppError::Database(e)) => Err(AppError::Database(e)),
            Err(_) => Ok(OptionalAuthUser(None)),
        }
    }
}

async fn extract_token(parts: &mut Parts) -> Result<String, AppError> {
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::Unauthorized)?;

    Ok(bearer.token().to_string())
}
