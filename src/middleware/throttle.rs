//! Request budgets for the advertisement resource, one for anonymous clients
//! (keyed by address) and one for signed-in users (keyed by user id).

use std::{
    collections::VecDeque,
    fmt,
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::{AppState, config::ThrottleRate, error::AppError, telemetry::REQUESTS_THROTTLED};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThrottleKey {
    User(i32),
    Anonymous(String),
}

impl fmt::Display for ThrottleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThrottleKey::User(id) => write!(f, "user:{id}"),
            ThrottleKey::Anonymous(addr) => write!(f, "anon:{addr}"),
        }
    }
}

/// Sliding-window request history per client.
pub struct Throttle {
    anon_rate: ThrottleRate,
    user_rate: ThrottleRate,
    history: DashMap<ThrottleKey, VecDeque<Instant>>,
}

impl Throttle {
    pub fn new(anon_rate: ThrottleRate, user_rate: ThrottleRate) -> Self {
        Self {
            anon_rate,
            user_rate,
            history: DashMap::new(),
        }
    }

    fn rate_for(&self, key: &ThrottleKey) -> ThrottleRate {
        match key {
            ThrottleKey::User(_) => self.user_rate,
            ThrottleKey::Anonymous(_) => self.anon_rate,
        }
    }

    /// Records the request, or returns how long the client must wait.
    pub fn check(&self, key: ThrottleKey, now: Instant) -> Result<(), Duration> {
        let rate = self.rate_for(&key);
        let mut history = self.history.entry(key).or_default();

        while history
            .front()
            .is_some_and(|oldest| now.duration_since(*oldest) >= rate.period)
        {
            history.pop_front();
        }

        if history.len() >= rate.requests as usize {
            let oldest = history.front().copied().unwrap_or(now);
            return Err(rate.period.saturating_sub(now.duration_since(oldest)));
        }

        history.push_back(now);
        Ok(())
    }

    /// Drops clients with no request inside their window.
    pub fn prune(&self, now: Instant) {
        self.history.retain(|key, history| {
            let period = match key {
                ThrottleKey::User(_) => self.user_rate.period,
                ThrottleKey::Anonymous(_) => self.anon_rate.period,
            };
            history
                .back()
                .is_some_and(|newest| now.duration_since(*newest) < period)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.history.len()
    }
}

pub async fn throttle(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = throttle_key(&state, &request);

    if let Err(wait) = state.throttle.check(key.clone(), Instant::now()) {
        let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        REQUESTS_THROTTLED.add(1, &[]);
        tracing::warn!(client = %key, retry_after, "Request throttled");
        return Err(AppError::Throttled {
            retry_after: retry_after.max(1),
        });
    }

    Ok(next.run(request).await)
}

fn throttle_key(state: &AppState, request: &Request) -> ThrottleKey {
    let user_id = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .and_then(|token| state.auth_service.validate_token(token).ok());

    if let Some(user_id) = user_id {
        return ThrottleKey::User(user_id);
    }

    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    ThrottleKey::Anonymous(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(requests: u32, secs: u64) -> ThrottleRate {
        ThrottleRate {
            requests,
            period: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_budget_exhausts_then_recovers() {
        let throttle = Throttle::new(rate(2, 60), rate(100, 60));
        let start = Instant::now();
        let key = ThrottleKey::Anonymous("10.0.0.1".into());

        assert!(throttle.check(key.clone(), start).is_ok());
        assert!(throttle.check(key.clone(), start + Duration::from_secs(10)).is_ok());

        let wait = throttle
            .check(key.clone(), start + Duration::from_secs(20))
            .expect_err("third request should be throttled");
        assert_eq!(wait, Duration::from_secs(40));

        assert!(throttle.check(key, start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_users_and_anonymous_have_separate_budgets() {
        let throttle = Throttle::new(rate(1, 60), rate(3, 60));
        let now = Instant::now();

        assert!(throttle.check(ThrottleKey::Anonymous("a".into()), now).is_ok());
        assert!(throttle.check(ThrottleKey::Anonymous("a".into()), now).is_err());
        assert!(throttle.check(ThrottleKey::Anonymous("b".into()), now).is_ok());

        for _ in 0..3 {
            assert!(throttle.check(ThrottleKey::User(7), now).is_ok());
        }
        assert!(throttle.check(ThrottleKey::User(7), now).is_err());
        assert!(throttle.check(ThrottleKey::User(8), now).is_ok());
    }

    #[test]
    fn test_prune_forgets_idle_clients() {
        let throttle = Throttle::new(rate(5, 60), rate(5, 60));
        let start = Instant::now();

        throttle
            .check(ThrottleKey::User(1), start)
            .expect("first request");
        throttle
            .check(ThrottleKey::User(2), start + Duration::from_secs(50))
            .expect("first request");
        assert_eq!(throttle.tracked_clients(), 2);

        throttle.prune(start + Duration::from_secs(70));
        assert_eq!(throttle.tracked_clients(), 1);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ThrottleKey::User(3).to_string(), "user:3");
        assert_eq!(ThrottleKey::Anonymous("::1".into()).to_string(), "anon:::1");
    }
}
