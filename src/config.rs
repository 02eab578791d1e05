// src/config.rs

use crate::error::{PortfolioError, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use url::Url;

pub const ENV_PREFIX: &str = "KRAKEN";
pub const DEFAULT_REST_URL: &str = "https://api.kraken.com";
pub const DEFAULT_WS_URL: &str = "wss://ws.kraken.com";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub api_secret: String,
    pub rest_url: String,
    pub ws_url: String,
}

impl AppConfig {
    /// Loads the optional env file, then layers defaults, `Settings.*` and
    /// `KRAKEN_*` environment variables.
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        load_env_file(env_file)?;
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(env: Environment) -> Result<Self> {
        let builder = Config::builder()
            .set_default("api_key", "")?
            .set_default("api_secret", "")?
            .set_default("rest_url", DEFAULT_REST_URL)?
            .set_default("ws_url", DEFAULT_WS_URL)?
            .add_source(File::with_name("Settings").required(false))
            .add_source(env);

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Credentials::new(&self.api_key, &self.api_secret)?;
        Url::parse(&self.rest_url)?;
        Url::parse(&self.ws_url)?;
        Ok(())
    }

    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::new(&self.api_key, &self.api_secret)
    }
}

/// A missing default `.env` is fine; a file the user named explicitly must exist.
fn load_env_file(env_file: Option<&Path>) -> Result<()> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                PortfolioError::Config(format!("error loading env file {}: {}", path.display(), e))
            })?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String, // base64
}

impl Credentials {
    pub fn new(api_key: &str, api_secret: &str) -> Result<Self> {
        let api_key = api_key.trim();
        let api_secret = api_secret.trim();
        if api_key.is_empty() {
            return Err(PortfolioError::Config(format!("{}_API_KEY is not set", ENV_PREFIX)));
        }
        if api_secret.is_empty() {
            return Err(PortfolioError::Config(format!(
                "{}_API_SECRET is not set",
                ENV_PREFIX
            )));
        }
        Ok(Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
