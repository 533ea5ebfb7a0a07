mod advertisement;
mod favorite;
mod user;

pub use advertisement::*;
pub use favorite::*;
pub use user::*;
