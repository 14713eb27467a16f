use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Credentials for the admin account seeded into an empty `users` table.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub admin: AdminSeed,
    pub users_cache_ttl_secs: u64,
    pub host: String,
    pub port: u16,
    pub frontend_dir: Option<PathBuf>,
}

/// Longest accepted token lifetime: one year.
const MAX_JWT_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Where and how operational logs are written.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub json: bool,
    /// Directory for the daily-rotated log file. Console only when unset.
    pub dir: Option<PathBuf>,
    pub retention_days: usize,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            json: std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json"),
            dir: std::env::var("LOG_DIR").ok().map(PathBuf::from),
            // Zero would leave the appender nothing to keep.
            retention_days: env_or("LOG_RETENTION_DAYS", 7usize).max(1),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn jwt_ttl_minutes(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(60 * 24);
    };
    let minutes: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("JWT_TTL_MINUTES is not a number: {raw:?}"))?;
    anyhow::ensure!(
        (1..=MAX_JWT_TTL_MINUTES).contains(&minutes),
        "JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}, got {minutes}"
    );
    Ok(minutes)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "restaurant".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "restaurant-users".into()),
            ttl_minutes: jwt_ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref())?,
        };
        let admin = AdminSeed {
            email: std::env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@restaurant.com".into()),
            password: std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into()),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            jwt,
            admin,
            users_cache_ttl_secs: env_or("USERS_CACHE_TTL_SECS", 300),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 3000),
            frontend_dir: std::env::var("FRONTEND_DIR").ok().map(PathBuf::from),
        })
    }

    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub fn default_log_filter() -> &'static str {
        match std::env::var("APP_ENV").as_deref() {
            Ok("production") => "restaurant=info,tower_http=info",
            _ => "restaurant=debug,axum=info,tower_http=info",
        }
    }
}
