//! # State Module
//!
//! Process-wide state shared by the terminal commands.
//!
//! Each command takes only the state it needs:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────────┐  ┌──────────────────┐      │
//! │  │   DbState    │  │      CartState       │  │   ConfigState    │      │
//! │  │              │  │                      │  │                  │      │
//! │  │  Database    │  │  Arc<Mutex<          │  │  markup_bps      │      │
//! │  │  (SQLite     │  │    user → SaleCart   │  │  currency        │      │
//! │  │   pool)      │  │    user → PurchCart  │  │  recent_limit    │      │
//! │  │              │  │  >>                  │  │                  │      │
//! │  └──────────────┘  └──────────────────────┘  └──────────────────┘      │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • CartState: one Mutex over every user's carts, never held across     │
//! │    an await                                                            │
//! │  • ConfigState: Read-only after startup                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Carts reserve nothing. Stock is only checked for real when the sale or
//! purchase is committed.

mod cart;
mod config;
mod db;

pub use cart::CartState;
pub use config::ConfigState;
pub use db::DbState;
