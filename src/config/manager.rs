//! Single entry point for loading configuration: structured settings come
//! from the TOML file, secrets come from the environment.

use crate::error::ErrorContext;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};
use std::env;
use std::path::Path;
use std::sync::Arc;

use super::AppConfig;

/// Owns the loaded configuration and knows how to find it.
pub struct ConfigManager {
    config: Arc<AppConfig>,
}

impl ConfigManager {
    /// Resolves the config file path from `GATEWAY_CONFIG_PATH`/`CONFIG_FILE`,
    /// falling back to `config/config.{RUST_ENV}.toml`.
    pub fn new() -> crate::error::Result<Self> {
        let config_file = env::var("GATEWAY_CONFIG_PATH")
            .or_else(|_| {
                env::var("CONFIG_FILE").map(|file| {
                    if Path::new(&file).is_absolute() {
                        file
                    } else {
                        format!("config/{file}")
                    }
                })
            })
            .unwrap_or_else(|_| {
                let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
                format!("config/config.{env_name}.toml")
            });

        Self::from_file(Path::new(&config_file))
    }

    /// Loads and validates a config file at an explicit path.
    pub fn from_file(config_path: &Path) -> crate::error::Result<Self> {
        let mut config = Self::load_config_file(config_path)?;
        config.auth.load_secret_from_env()?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Config,
            "config_loaded",
            "configuration loaded",
            path = %config_path.display()
        );

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Returns a cheap clone of the loaded config `Arc`.
    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    fn load_config_file(path: &Path) -> crate::error::Result<AppConfig> {
        if !path.exists() {
            return Err(crate::error::ProxyError::config(format!(
                "config file does not exist: {}",
                path.display()
            )));
        }

        let config_content = std::fs::read_to_string(path)
            .with_config_context(|| format!("failed to read config file: {}", path.display()))?;

        let config: AppConfig = toml::from_str(&config_content)
            .with_config_context(|| format!("failed to parse config file: {}", path.display()))?;

        super::validate_config(&config)?;

        ldebug!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_parsed",
            "configuration parsed and validated"
        );

        Ok(config)
    }
}
