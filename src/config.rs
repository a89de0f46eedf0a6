use crate::error::AppError;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// When unset the service falls back to the in-memory store (dev only).
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub cors_allowed_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let port = env::var("PORT")
            .ok()
            .map(|v| {
                v.parse::<u16>()
                    .map_err(|_| AppError::Config(format!("invalid PORT: {v}")))
            })
            .transpose()?
            .unwrap_or(5000);

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Config("JWT_SECRET missing".into()))?;

        Ok(Self {
            port,
            database_url: env::var("DATABASE_URL").ok(),
            jwt_secret,
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| "*".into()),
        })
    }

    pub fn test_defaults() -> Self {
        Self {
            port: 0,
            database_url: None,
            jwt_secret: "test-secret".into(),
            cors_allowed_origin: "*".into(),
        }
    }
}
