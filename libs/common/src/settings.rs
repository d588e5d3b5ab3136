//! Listener settings shared by the services

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

/// Where a service binds its HTTP listener
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Load from `<PREFIX>_HOST` and `<PREFIX>_PORT`
    ///
    /// Host defaults to `0.0.0.0`, port to `default_port`.
    pub fn from_env(prefix: &str, default_port: u16) -> Result<Self> {
        let settings = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", default_port)?
            .add_source(Environment::with_prefix(prefix).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
