use chrono::Duration;
use std::env;

use crate::auth::token::{TokenCodec, DEFAULT_ISSUER};
use crate::error::AppError;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60 * 24;

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    /// Base64-encoded HMAC secret. Read once at startup.
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub jwt_issuer: String,
}

fn required(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::ConfigError(format!("{} must be set", name)))
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let server_port = match env::var("SERVER_PORT") {
            Ok(port) => port
                .parse()
                .map_err(|_| AppError::ConfigError("SERVER_PORT must be a number".into()))?,
            Err(_) => 8080,
        };
        let ttl_seconds = match env::var("JWT_TTL_SECONDS") {
            Ok(ttl) => ttl
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    AppError::ConfigError("JWT_TTL_SECONDS must be a positive number".into())
                })?,
            Err(_) => DEFAULT_TOKEN_TTL_SECONDS,
        };
        let jwt_ttl = Duration::try_seconds(ttl_seconds).ok_or_else(|| {
            AppError::ConfigError(format!("JWT_TTL_SECONDS is out of range: {}", ttl_seconds))
        })?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_port,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    /// Builds the token codec; a bad secret is a startup failure.
    pub fn token_codec(&self) -> Result<TokenCodec, AppError> {
        Ok(TokenCodec::new(
            &self.jwt_secret,
            self.jwt_ttl,
            self.jwt_issuer.clone(),
        )?)
    }
}
