use std::sync::Arc;

use tracing::info;

use crate::auth::token::TokenIssuer;
use crate::config::{AppConfig, JwtConfig, DEFAULT_TOKEN_TTL_MINUTES};
use crate::db::{memory::MemoryDatabase, postgres::PgDatabase, Database};

const MEMORY_URL: &str = "memory://";

/// Shared, immutable per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub config: Arc<AppConfig>,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::from_env()?).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db: Arc<dyn Database> = if config.database_url.starts_with(MEMORY_URL) {
            info!("using in-memory store");
            Arc::new(MemoryDatabase::new())
        } else {
            let pg = PgDatabase::connect(&config.database_url, config.max_connections).await?;
            pg.migrate().await?;
            Arc::new(pg)
        };
        Ok(Self::from_parts(db, Arc::new(config)))
    }

    pub fn from_parts(db: Arc<dyn Database>, config: Arc<AppConfig>) -> Self {
        let tokens = TokenIssuer::new(&config.jwt);
        Self { db, config, tokens }
    }

    /// In-memory store with a fixed signing secret.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: MEMORY_URL.into(),
            max_connections: 1,
            jwt: JwtConfig {
                secret: "test".into(),
                algorithm: jsonwebtoken::Algorithm::HS256,
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            },
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec!["*".into()],
        });
        Self::from_parts(Arc::new(MemoryDatabase::new()), config)
    }
}
