use std::str::FromStr;

use anyhow::Context;
use jsonwebtoken::Algorithm;

/// Eight days, matching the lifetime clients were built against.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 8;
/// Ten years.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            algorithm: parse_algorithm(
                &std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            )?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "finance-api".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "finance-api-users".into()),
            ttl_minutes: check_ttl(env_parse(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                DEFAULT_TOKEN_TTL_MINUTES,
            )?)?,
        };
        Ok(Self {
            database_url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10)?,
            jwt,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 8080)?,
            cors_origins: parse_origins(
                &std::env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:8000".into()),
            ),
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

/// Unset means `default`; set but unparsable is an error.
pub(crate) fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid {key} {v:?}")),
    }
}

pub(crate) fn check_ttl(minutes: i64) -> anyhow::Result<i64> {
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!(
            "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {minutes}"
        );
    }
    Ok(minutes)
}

/// Tokens are signed with a shared secret, so only the HMAC family is usable.
pub(crate) fn parse_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    let algorithm = Algorithm::from_str(raw.trim())
        .with_context(|| format!("unknown JWT_ALGORITHM {raw:?}"))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => anyhow::bail!("JWT_ALGORITHM {other:?} needs a key pair; use HS256, HS384 or HS512"),
    }
}

pub(crate) fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
