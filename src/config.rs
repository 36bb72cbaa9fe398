use std::{env, net::SocketAddr};

use thiserror::Error;

use crate::cluster_client::CounterSet;

#[derive(Debug, Clone)]
pub struct Config {
    pub users_token: String,
    pub administrators_token: Option<String>,
    pub bind_addr: String,
    pub bind_port: u16,
    pub powershell_path: String,
    pub config_provider: Option<String>,
    pub connection_string: Option<String>,
    pub counters: CounterSet,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CACHE_ADMIN_USERS_TOKEN is required and must not be empty")]
    MissingUsersToken,
    #[error("CACHE_ADMIN_ADMINISTRATORS_TOKEN must differ from CACHE_ADMIN_USERS_TOKEN")]
    SharedToken,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("CACHE_CONFIG_PROVIDER and CACHE_CONFIG_CONNECTION_STRING must be set together")]
    IncompleteClusterConfig,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn counter_list(name: &str) -> Option<Vec<String>> {
    non_empty_var(name)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|counter| !counter.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|counters| !counters.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let users_token =
            non_empty_var("CACHE_ADMIN_USERS_TOKEN").ok_or(ConfigError::MissingUsersToken)?;
        let administrators_token = non_empty_var("CACHE_ADMIN_ADMINISTRATORS_TOKEN");
        if administrators_token.as_deref() == Some(users_token.as_str()) {
            return Err(ConfigError::SharedToken);
        }

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let bind_port = env::var("BIND_PORT")
            .ok()
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let config_provider = non_empty_var("CACHE_CONFIG_PROVIDER");
        let connection_string = non_empty_var("CACHE_CONFIG_CONNECTION_STRING");
        if config_provider.is_some() != connection_string.is_some() {
            return Err(ConfigError::IncompleteClusterConfig);
        }

        let defaults = CounterSet::default();
        let counters = CounterSet {
            host_counters: counter_list("HOST_COUNTERS").unwrap_or(defaults.host_counters),
            cache_counters: counter_list("CACHE_COUNTERS").unwrap_or(defaults.cache_counters),
        };

        let config = Self {
            users_token,
            administrators_token,
            bind_addr,
            bind_port,
            powershell_path: non_empty_var("POWERSHELL_PATH")
                .unwrap_or_else(|| "powershell.exe".to_string()),
            config_provider,
            connection_string,
            counters,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
