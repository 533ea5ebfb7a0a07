use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expires_in_hours: i64,
    pub anon_rate: ThrottleRate,
    pub user_rate: ThrottleRate,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: parse_var("PORT", "8080")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "25")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expires_in_hours: parse_var("JWT_EXPIRES_IN_HOURS", "168")?,
            anon_rate: parse_var("THROTTLE_ANON_RATE", "100/day")?,
            user_rate: parse_var("THROTTLE_USER_RATE", "1000/day")?,
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "classifieds-api".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|endpoint| !endpoint.trim().is_empty()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{name} has an invalid value: {raw:?}"))
}

/// A request budget such as `100/day`: at most `requests` within `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleRate {
    pub requests: u32,
    pub period: Duration,
}

#[derive(Debug, thiserror::Error)]
#[error("expected <count>/<period> with period one of s, m, h, d")]
pub struct InvalidThrottleRate;

impl FromStr for ThrottleRate {
    type Err = InvalidThrottleRate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, period) = s.trim().split_once('/').ok_or(InvalidThrottleRate)?;
        let requests: u32 = count.trim().parse().map_err(|_| InvalidThrottleRate)?;

        // Only the leading letter matters, so "min", "hour" and "day" all work.
        let seconds = match period.trim().chars().next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 60 * 60,
            Some('d') => 60 * 60 * 24,
            _ => return Err(InvalidThrottleRate),
        };

        if requests == 0 {
            return Err(InvalidThrottleRate);
        }

        Ok(Self {
            requests,
            period: Duration::from_secs(seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_rate_parses_long_and_short_periods() {
        let rate: ThrottleRate = "100/day".parse().expect("rate should parse");
        assert_eq!(rate.requests, 100);
        assert_eq!(rate.period, Duration::from_secs(86_400));

        let rate: ThrottleRate = "5/m".parse().expect("rate should parse");
        assert_eq!(rate.requests, 5);
        assert_eq!(rate.period, Duration::from_secs(60));

        let rate: ThrottleRate = " 10 / hour ".parse().expect("rate should parse");
        assert_eq!(rate.period, Duration::from_secs(3600));
    }

    #[test]
    fn test_throttle_rate_rejects_garbage() {
        assert!("100".parse::<ThrottleRate>().is_err());
        assert!("abc/day".parse::<ThrottleRate>().is_err());
        assert!("10/week".parse::<ThrottleRate>().is_err());
        assert!("0/day".parse::<ThrottleRate>().is_err());
    }
}
