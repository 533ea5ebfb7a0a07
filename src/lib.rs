pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod filters;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;

pub use config::Config;

use std::sync::Arc;

use middleware::Throttle;
use services::{AdvertisementService, AuthService};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth_service: AuthService,
    pub advertisement_service: AdvertisementService,
    pub throttle: Arc<Throttle>,
}
