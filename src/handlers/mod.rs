mod advertisements;
mod auth;
mod health;

pub use advertisements::{
    create_advertisement, delete_advertisement, favorite_advertisement, get_advertisement,
    list_advertisements, list_favorites, partial_update_advertisement, unfavorite_advertisement,
    update_advertisement,
};
pub use auth::{get_user, login, register};
pub use health::health_check;
