mod auth;
mod throttle;

pub use auth::{AuthUser, OptionalAuthUser};
pub use throttle::{Throttle, ThrottleKey, throttle};
