use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL, only needed by `serve` and `migrate`
    pub database_url: Option<String>,
    /// Base URL of the API the terminal UI talks to
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Address the API server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// File the terminal UI writes its logs to
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_api_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_log_file() -> String {
    "invoicer.log".to_string()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if the file exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Database URL, failing when `DATABASE_URL` is not set
    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to reach the database")
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_variables_are_missing() {
        let vars = vec![("DATABASE_URL".to_string(), "postgres://localhost/db".to_string())];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.database_url().unwrap(), "postgres://localhost/db");
        assert_eq!(config.api_url, "http://127.0.0.1:8000");
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.log_file, "invoicer.log");
    }

    #[test]
    fn database_url_is_required_on_demand() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert!(config.database_url().is_err());
    }
}
