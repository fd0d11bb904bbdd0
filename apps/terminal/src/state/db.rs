//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! The `Database` from `duka-db` holds a `SqlitePool`, so commands can run
//! queries concurrently without extra locking.

use duka_db::Database;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let rows = db_state.inner().stocks().available_for_sale(&branch_id, None).await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
