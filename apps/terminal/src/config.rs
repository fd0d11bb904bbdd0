//! # Terminal Configuration
//!
//! Settings for the terminal app and the `duka` CLI.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DUKA_DB_PATH=/srv/duka/duka.db                                     │
//! │     DUKA_MARKUP_BPS=2500                                               │
//! │     DUKA_CURRENCY_SYMBOL="KSh "                                        │
//! │     DUKA_RECENT_LIMIT=100                                              │
//! │     DUKA_LOG=debug                                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/duka-pos/duka.toml (Linux)                               │
//! │     ~/Library/Application Support/com.duka.pos/duka.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     30% markup, 50 recent rows, database in the data dir               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # duka.toml
//! [database]
//! path = "/srv/duka/duka.db"
//! max_connections = 5
//!
//! [pricing]
//! markup_bps = 3000        # 30% over buy price for first-time purchases
//! currency_symbol = "KSh "
//!
//! [display]
//! recent_limit = 50
//! show_low_stock = true
//!
//! [logging]
//! filter = "info,duka=debug,sqlx=warn"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use duka_core::{DEFAULT_MARKUP_BPS, DEFAULT_RECENT_LIMIT};

/// Default tracing filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,duka=debug,sqlx=warn";

const CONFIG_FILE_NAME: &str = "duka.toml";
const DB_FILE_NAME: &str = "duka.db";

/// Markup above 1000% is almost certainly a typo.
const MAX_MARKUP_BPS: u32 = 100_000;
const MAX_RECENT_LIMIT: i64 = 1000;

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the application directories")]
    NoProjectDirs,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to `duka.db` in the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Markup over buy price for a product's first purchase in a branch.
    #[serde(default = "default_markup_bps")]
    pub markup_bps: u32,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            markup_bps: default_markup_bps(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Rows in recent sales / purchases / adjustments.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: i64,

    /// Include the low-stock listing in the salesperson dashboard.
    #[serde(default = "default_true")]
    pub show_low_stock: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            show_low_stock: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Complete terminal configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub display: DisplaySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`duka.toml`)
    /// 3. Environment variables
    ///
    /// An explicit `config_path` that does not exist is an error; a missing
    /// default file is not.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoProjectDirs)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml()?)?;

        info!(?path, "Config saved");
        Ok(path)
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.pricing.markup_bps > MAX_MARKUP_BPS {
            return Err(ConfigError::Invalid(format!(
                "pricing.markup_bps must be at most {}, got {}",
                MAX_MARKUP_BPS, self.pricing.markup_bps
            )));
        }

        if !(1..=MAX_RECENT_LIMIT).contains(&self.display.recent_limit) {
            return Err(ConfigError::Invalid(format!(
                "display.recent_limit must be between 1 and {}, got {}",
                MAX_RECENT_LIMIT, self.display.recent_limit
            )));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".into()));
        }

        Ok(())
    }

    /// Applies `DUKA_*` overrides from `lookup`.
    ///
    /// Takes the lookup as a function so tests don't touch process env.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DUKA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(bps) = lookup("DUKA_MARKUP_BPS") {
            self.pricing.markup_bps = parse_value("DUKA_MARKUP_BPS", &bps)?;
        }

        if let Some(symbol) = lookup("DUKA_CURRENCY_SYMBOL") {
            self.pricing.currency_symbol = symbol;
        }

        if let Some(limit) = lookup("DUKA_RECENT_LIMIT") {
            self.display.recent_limit = parse_value("DUKA_RECENT_LIMIT", &limit)?;
        }

        if let Some(filter) = lookup("DUKA_LOG") {
            self.logging.filter = filter;
        }

        Ok(())
    }

    /// Resolves the database file, creating the data dir when defaulted.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "duka", "pos")
            .ok_or(ConfigError::NoProjectDirs)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join(DB_FILE_NAME))
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "duka", "pos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Default Value Functions (for serde)
// =============================================================================

fn default_max_connections() -> u32 {
    5
}

fn default_markup_bps() -> u32 {
    DEFAULT_MARKUP_BPS
}

fn default_currency_symbol() -> String {
    "KSh ".to_string()
}

fn default_recent_limit() -> i64 {
    DEFAULT_RECENT_LIMIT
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_true() -> bool {
    true
}
