//! # Configuration State
//!
//! The loaded [`AppConfig`], read-only after startup.

use crate::config::AppConfig;
use duka_core::Money;

#[derive(Debug, Clone, Default)]
pub struct ConfigState {
    config: AppConfig,
}

impl ConfigState {
    pub fn new(config: AppConfig) -> Self {
        ConfigState { config }
    }

    pub fn inner(&self) -> &AppConfig {
        &self.config
    }

    /// Markup for a product's first purchase in a branch.
    pub fn markup_bps(&self) -> u32 {
        self.config.pricing.markup_bps
    }

    pub fn recent_limit(&self) -> i64 {
        self.config.display.recent_limit
    }

    pub fn show_low_stock(&self) -> bool {
        self.config.display.show_low_stock
    }

    /// Formats cents with the configured currency symbol.
    pub fn format_money(&self, cents: i64) -> String {
        Money::from_cents(cents).format_with(&self.config.pricing.currency_symbol)
    }
}
