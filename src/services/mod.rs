mod advertisement;
mod auth;

pub use advertisement::AdvertisementService;
pub use auth::AuthService;
