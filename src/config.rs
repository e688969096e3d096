//! The config module defines the application configuration. It is based on [config], a layered
//! configuration system for Rust applications (with strong support for 12-factor applications).
//!
//! # Layers
//!
//! The configuration consists of multiple layers. Upper layers overwrite lower layer configurations
//! (e.g. environment variables overwrite the default configuration).
//!
//! ## Layer 1 (Environment variables) \[optional\]
//!
//! The environment variables are the top most layer. They can be used to overwrite any previous
//! configuration. Environment variables have the format `[ENV_PREFIX]__[field]__[sub_field]` where
//! `ENV_PREFIX` is an environment variable defaulting to `GETTEXT_ANYWHERE`. That means, the
//! handler of the domain `messages` can be overwritten by the environment variable
//! `GETTEXT_ANYWHERE__DOMAINS__MESSAGES__HANDLER`.
//!
//! ## Layer 2 (Custom configuration) \[optional\]
//!
//! The next layer is an optional configuration file intended to be used by deployments and local
//! testing. The file location can be configured using the `CONFIG_FILE` environment variable,
//! defaulting to `config/config`. It can be of any file type supported by [config] (e.g.
//! `config/config.toml`).
//!
//! ## Layer 3 (Default configuration)
//!
//! The default configuration provides default value for all config fields. It is loaded from
//! `config/default.toml` at compile time.
//!
//! # Usage
//!
//! The application configuration can be created by using [Config::new]. This loads/overrides the
//! configuration fields layer-by-layer.
//!
//! ```rs
//! let config: Config = Config::new()?;
//! config.apply(&registry).await?;
//! ```

pub mod log_filter;

use crate::error::Result;
use crate::registry::HandlerRegistry;
use config::{ConfigError, Environment, File, FileFormat};
use gettext_anywhere_handlers::HandlerOptions;
use log_filter::{LogFilter, parse_log_filter};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;

/// [Domain] holds the handler registration of a single domain.
#[derive(Debug, Clone, Deserialize)]
pub struct Domain {
    /// The name of the handler type (e.g. `file` or `s3`).
    pub handler: String,

    /// The options that are passed to the handler.
    #[serde(default)]
    pub options: HandlerOptions,
}

/// [Config] holds all configuration for the application. I.g. one immutable instance is created
/// on startup and then applied to the handler registry.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The filter for log output.
    #[serde(deserialize_with = "parse_log_filter")]
    pub log_filter: LogFilter,

    /// The handler registrations by domain.
    #[serde(default)]
    pub domains: BTreeMap<String, Domain>,
}

impl Config {
    /// Creates a new application configuration as described in the [module documentation](crate::config).
    pub fn new() -> Result<Self, ConfigError> {
        // the environment prefix for all `Config` fields
        let env_prefix = env::var("ENV_PREFIX").unwrap_or("gettext_anywhere".into());
        // the path of the custom configuration file
        let config_file = env::var("CONFIG_FILE").unwrap_or("config/config".into());

        let s = config::Config::builder()
            // load default configuration (embedded at compile time)
            .add_source(File::from_str(
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")),
                FileFormat::Toml,
            ))
            // load custom configuration from file (at runtime)
            .add_source(File::with_name(&config_file).required(false))
            // add in config from the environment
            // e.g. `GETTEXT_ANYWHERE__LOG_FILTER=debug` would set the `log_filter` key
            .add_source(Environment::with_prefix(&env_prefix).separator("__"))
            .build()?;

        // you can deserialize (and thus freeze) the entire configuration as
        s.try_deserialize()
    }

    /// Parses a configuration from a TOML document on top of the default configuration.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(File::from_str(
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")),
                FileFormat::Toml,
            ))
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Registers the handlers of all configured domains.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ContractViolation`](crate::Error::ContractViolation) if a domain
    /// names an unknown handler type.
    pub async fn apply(&self, registry: &HandlerRegistry) -> Result<()> {
        for (domain, registration) in &self.domains {
            registry
                .register_named(
                    domain.as_str(),
                    &registration.handler,
                    registration.options.clone(),
                )
                .await?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml("").expect("expected default configuration to be deserializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.log_filter.to_string(), "info");
        assert!(config.domains.is_empty());
    }

    #[test]
    fn parse_domains() {
        let config = Config::from_toml(
            r#"
            log_filter = "debug"

            [domains.messages]
            handler = "s3"
            options = { bucket_name = "translations", force_path_style = true }

            [domains.errors]
            handler = "file"
            "#,
        )
        .unwrap();

        let messages = &config.domains["messages"];
        assert_eq!(messages.handler, "s3");
        assert_eq!(messages.options.get_str("bucket_name"), Some("translations"));
        assert!(config.domains["errors"].options.is_empty());
    }

    #[tokio::test]
    async fn apply_registers_domains() {
        let config = Config::from_toml(
            r#"
            [domains.messages]
            handler = "file"
            options = { default_locale_dir = "/srv/locale" }
            "#,
        )
        .unwrap();
        let registry = HandlerRegistry::with_builtin_kinds();
        config.apply(&registry).await.unwrap();

        assert_eq!(registry.domains().await, vec!["messages"]);
    }

    #[tokio::test]
    async fn apply_unknown_handler() {
        let config = Config::from_toml(
            r#"
            [domains.messages]
            handler = "gopher"
            "#,
        )
        .unwrap();
        let registry = HandlerRegistry::with_builtin_kinds();
        let err = config.apply(&registry).await.unwrap_err();

        assert!(matches!(err, Error::ContractViolation { kind } if kind == "gopher"));
    }
}
