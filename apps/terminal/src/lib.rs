//! # Duka Terminal Library
//!
//! The point-of-sale layer over `duka-db`: commands a front end invokes,
//! the state they share, and startup helpers for the `duka` binary.
//!
//! ## Module Organization
//! ```text
//! duka_terminal/
//! ├── lib.rs          ◄─── You are here (startup helpers)
//! ├── config.rs       ◄─── AppConfig: defaults → duka.toml → DUKA_* env
//! ├── error.rs        ◄─── ApiError returned by every command
//! ├── state/
//! │   ├── db.rs       ◄─── Database handle
//! │   ├── cart.rs     ◄─── Per-user sale and purchase carts
//! │   └── config.rs   ◄─── Loaded configuration
//! └── commands/       ◄─── sale, purchase, adjustment, catalog, user,
//!                          registration, report
//! ```
//!
//! ## State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐   │
//! │  │    DbState       │ │    CartState     │ │    ConfigState       │   │
//! │  │                  │ │                  │ │                      │   │
//! │  │  • Database pool │ │  • Sale carts    │ │  • Markup            │   │
//! │  │  • Repositories  │ │  • Purchase carts│ │  • Currency symbol   │   │
//! │  │                  │ │  (per user)      │ │  • History limit     │   │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘   │
//! │                                                                         │
//! │  Each command takes only the state it needs.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use duka_db::{Database, DbConfig};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter, e.g. `RUST_LOG=duka=trace`.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        debug!("Tracing subscriber already installed");
    }
}

/// Opens the configured database and applies pending migrations.
pub async fn open_database(config: &AppConfig) -> Result<Database, StartupError> {
    let path = config.database_path()?;
    info!(db_path = %path.display(), "Database path determined");

    let db = Database::new(DbConfig::new(path).max_connections(config.database.max_connections))
        .await?;
    info!("Database connected and migrations applied");
    Ok(db)
}

/// Anything that can stop the terminal from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] duka_db::DbError),
}
