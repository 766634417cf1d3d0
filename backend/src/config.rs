use std::{env, path::PathBuf};

use anyhow::{bail, Context, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_DATABASE_PATH: &str = "./data/folio.db";
pub const DEFAULT_APP_ENV: &str = "development";

/// Process configuration read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub app_env: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got `{raw}`"))?,
            None => DEFAULT_PORT,
        };

        let database_path = lookup("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        if database_path.trim().is_empty() {
            bail!("DATABASE_PATH is set but empty");
        }

        Ok(Self {
            port,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_path: PathBuf::from(database_path),
            app_env: lookup("APP_ENV").unwrap_or_else(|| DEFAULT_APP_ENV.to_string()),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).expect("defaults");
        assert_eq!(config.port, 5000);
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
        assert_eq!(config.database_path, PathBuf::from("./data/folio.db"));
        assert_eq!(config.app_env, "development");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("BIND_ADDR", "127.0.0.1"),
            ("DATABASE_PATH", "/tmp/site.db"),
            ("APP_ENV", "production"),
        ])
        .expect("explicit config");
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.database_path, PathBuf::from("/tmp/site.db"));
        assert_eq!(config.app_env, "production");
    }

    #[test]
    fn invalid_port_and_empty_database_path_fail() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("DATABASE_PATH", "  ")]).is_err());
    }
}
