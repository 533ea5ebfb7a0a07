use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{AppState, handlers, middleware::throttle};

pub fn create_router(state: AppState) -> Router {
    let advertisements = Router::new()
        .route(
            "/api/advertisements",
            get(handlers::list_advertisements).post(handlers::create_advertisement),
        )
        .route("/api/advertisements/favorites", get(handlers::list_favorites))
        .route(
            "/api/advertisements/{id}",
            get(handlers::get_advertisement)
                .put(handlers::update_advertisement)
                .patch(handlers::partial_update_advertisement)
                .delete(handlers::delete_advertisement),
        )
        .route(
            "/api/advertisements/{id}/favorite",
            post(handlers::favorite_advertisement).delete(handlers::unfavorite_advertisement),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), throttle));

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/user", get(handlers::get_user))
        .merge(advertisements)
        .with_state(state)
}
