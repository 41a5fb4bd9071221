//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::arena::damage::ShellParams;
use crate::arena::MatchRules;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Public base URL, used to build WebSocket URLs for clients
    pub public_base_url: String,
    /// Allowed client origin for CORS
    pub client_origin: String,

    /// Match rules applied to every session this server creates
    pub rules: MatchRules,
}

impl Config {
    /// Load configuration from environment variables. Every variable has a
    /// default; a variable that is set but unparseable is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let rules = MatchRules {
            rounds_to_win: env_parse("ROUNDS_TO_WIN", 5)?,
            start_delay: env_parse("START_DELAY_SECS", 3.0)?,
            end_delay: env_parse("END_DELAY_SECS", 3.0)?,
            max_competitors: env_parse("MAX_COMPETITORS", 4)?,
            starting_health: env_parse("STARTING_HEALTH", 100.0)?,
            arena_radius: env_parse("ARENA_RADIUS", 30.0)?,
            shell: ShellParams {
                max_damage: env_parse("SHELL_MAX_DAMAGE", 100.0)?,
                explosion_radius: env_parse("SHELL_EXPLOSION_RADIUS", 5.0)?,
                explosion_force: env_parse("SHELL_EXPLOSION_FORCE", 1000.0)?,
            },
            lobby_timeout: env_parse("LOBBY_TIMEOUT_SECS", 300.0)?,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            rules,
        })
    }
}

fn env_parse<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
