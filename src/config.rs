//! Configuration management with validation and defaults.
//!
//! TOML file plus `LUCKYTEN_*` environment overrides, validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Round timing and staking rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Betting window length in seconds.
    pub betting_window_secs: u64,
    /// Pause between window close and settlement, in seconds.
    pub resolving_secs: u64,
    /// Pause after settlement before the next round opens, in milliseconds.
    pub settled_pause_ms: u64,
    pub min_stake: u64,
    pub max_stake: u64,
    pub payout_multiplier: u32,
    /// First period number used on a fresh database.
    pub starting_period: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            betting_window_secs: 20,
            resolving_secs: 3,
            settled_pause_ms: 2000,
            min_stake: 10,
            max_stake: 50_000,
            payout_multiplier: 4,
            starting_period: 1001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./engine_data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen_address: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Capability for the administrator control surface. `None` disables the
    /// admin endpoints entirely.
    pub admin_api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            admin_api_key: None,
        }
    }
}

/// Wallet operation bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub max_deposit: u64,
    pub min_withdrawal: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            max_deposit: 100_000,
            min_withdrawal: 100,
        }
    }
}

/// Configuration loader with environment variable support.
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = if let Some(ref path) = self.config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::LoadFailed(format!("failed to read {}: {}", path, e)))?;
            toml::from_str(&content)
                .map_err(|e| ConfigError::LoadFailed(format!("failed to parse TOML: {}", e)))?
        } else {
            AppConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;
        Ok(config)
    }

    fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        if let Ok(dir) = env::var("LUCKYTEN_DATA_DIR") {
            config.storage.data_dir = dir;
        }
        if let Ok(port) = env::var("LUCKYTEN_API_PORT") {
            config.api.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "LUCKYTEN_API_PORT".to_string(),
                value: port,
                reason: "invalid port number".to_string(),
            })?;
        }
        if let Ok(key) = env::var("LUCKYTEN_ADMIN_API_KEY") {
            config.api.admin_api_key = Some(key);
        }
        if let Ok(window) = env::var("LUCKYTEN_BETTING_WINDOW_SECS") {
            config.game.betting_window_secs =
                window.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "LUCKYTEN_BETTING_WINDOW_SECS".to_string(),
                    value: window,
                    reason: "invalid duration".to_string(),
                })?;
        }
        Ok(())
    }

    fn validate(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let invalid = |field: &str, value: String, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        };

        if config.game.betting_window_secs == 0 {
            return Err(invalid(
                "game.betting_window_secs",
                "0".to_string(),
                "betting window cannot be zero",
            ));
        }
        if config.game.min_stake == 0 || config.game.min_stake > config.game.max_stake {
            return Err(invalid(
                "game.min_stake",
                config.game.min_stake.to_string(),
                "stake bounds must satisfy 0 < min <= max",
            ));
        }
        if config.game.payout_multiplier == 0 {
            return Err(invalid(
                "game.payout_multiplier",
                "0".to_string(),
                "multiplier cannot be zero",
            ));
        }
        if config.api.port == 0 {
            return Err(invalid(
                "api.port",
                "0".to_string(),
                "port cannot be zero",
            ));
        }
        if config.storage.data_dir.is_empty() {
            return Err(invalid(
                "storage.data_dir",
                String::new(),
                "data directory is required",
            ));
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
