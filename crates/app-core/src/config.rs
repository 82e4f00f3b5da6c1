//! Layered configuration: an optional YAML file overlaid by environment
//! variables, with `.env` support for local development.

use std::path::{Path, PathBuf};

use config::{Config as RawConfig, Environment, File};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load or parse configuration")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value for `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    inner: RawConfig,
}

impl Config {
    pub fn builder<P: AsRef<Path>>(path: P) -> ConfigBuilder {
        ConfigBuilder::new(path.as_ref().to_path_buf())
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn builder_test() -> test_utils::TestConfigBuilder {
        test_utils::TestConfigBuilder::new()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        self.inner.get(key).map_err(ConfigError::from)
    }

    /// Like [`Config::get`], but a missing key yields `default`. Malformed
    /// values are still an error.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.inner.get(key) {
            Ok(value) => Ok(value),
            Err(config::ConfigError::NotFound(_)) => Ok(default),
            Err(err) => Err(ConfigError::from(err)),
        }
    }

    /// Returns the value of a string key, treating a missing key and a blank
    /// value the same way.
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get::<String>(key).ok().filter(|v| !v.trim().is_empty())
    }
}

pub struct ConfigBuilder {
    path: PathBuf,
    required: bool,
    env: bool,
    dotenv: bool,
}

impl ConfigBuilder {
    fn new(path: PathBuf) -> Self {
        Self { path, required: false, env: true, dotenv: true }
    }

    /// Fails the build when the file does not exist.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Skips the environment overlay. The file becomes the only source.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self.dotenv = false;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        if self.dotenv {
            match dotenvy::dotenv() {
                Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
                Err(err) if err.not_found() => {},
                Err(err) => tracing::warn!("Failed to load .env file: {}", err),
            }
        }

        let mut builder = RawConfig::builder().add_source(File::from(self.path.as_path()).required(self.required));

        // OAUTH__GOOGLE__CLIENT_ID -> oauth.google.client_id
        if self.env {
            builder = builder.add_source(Environment::default().separator("__").try_parsing(true));
        }

        let inner = builder.build()?;
        tracing::info!("Configuration loaded from {}", self.path.to_string_lossy());

        Ok(Config { inner })
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod test_utils {
    use std::collections::HashMap;

    use config::Value;

    use super::*;

    #[derive(Default)]
    pub struct TestConfigBuilder {
        values: HashMap<String, Value>,
    }

    impl TestConfigBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
            self.values.insert(key.to_string(), value.into());
            self
        }

        /// Fills in credentials for every supported provider.
        pub fn with_oauth_credentials(self) -> Self {
            ["google", "facebook", "linkedin"].into_iter().fold(self, |builder, provider| {
                builder
                    .with(&format!("oauth.{provider}.client_id"), format!("{provider}-client-id"))
                    .with(&format!("oauth.{provider}.client_secret"), format!("{provider}-client-secret"))
            })
        }

        pub fn build(self) -> Config {
            let mut builder = RawConfig::builder();

            for (key, value) in self.values {
                builder = builder.set_override(key, value).unwrap();
            }

            let inner = builder.build().expect("Failed to create config from test values");

            Config { inner }
        }
    }
}
