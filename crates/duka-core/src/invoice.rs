//! # Invoice Numbers
//!
//! `<PREFIX>-<YYYYMMDD>-<NNNN>` where PREFIX is `PUR` or `INV` and the
//! sequence restarts at 1 every day, per kind.
//!
//! duka-db issues the sequence from a counter row updated inside the same
//! transaction as the header insert; this module only formats and parses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;

/// Which transaction type an invoice number belongs to.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Purchase,
    Sale,
}

impl InvoiceKind {
    /// Invoice prefix.
    pub const fn prefix(&self) -> &'static str {
        match self {
            InvoiceKind::Purchase => "PUR",
            InvoiceKind::Sale => "INV",
        }
    }
}

impl fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Day key used for the per-day counter, e.g. `"20240315"`.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Formats an invoice number.
///
/// Sequences past 9999 widen rather than wrap.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use duka_core::invoice::{format_invoice_number, InvoiceKind};
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// assert_eq!(format_invoice_number(InvoiceKind::Purchase, day, 1), "PUR-20240315-0001");
/// assert_eq!(format_invoice_number(InvoiceKind::Sale, day, 42), "INV-20240315-0042");
/// ```
pub fn format_invoice_number(kind: InvoiceKind, date: NaiveDate, sequence: i64) -> String {
    format!("{}-{}-{:04}", kind.prefix(), day_key(date), sequence)
}

/// A parsed invoice number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceNumber {
    pub kind: InvoiceKind,
    pub date: NaiveDate,
    pub sequence: i64,
}

impl std::str::FromStr for InvoiceNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "invoice_no".to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.trim().splitn(3, '-');
        let kind = match parts.next() {
            Some("PUR") => InvoiceKind::Purchase,
            Some("INV") => InvoiceKind::Sale,
            _ => return Err(invalid("prefix must be PUR or INV")),
        };
        let date = parts
            .next()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())
            .ok_or_else(|| invalid("date must be YYYYMMDD"))?;
        let sequence = parts
            .next()
            .filter(|n| n.len() >= 4)
            .and_then(|n| n.parse::<i64>().ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| invalid("sequence must be a positive number of at least 4 digits"))?;

        Ok(InvoiceNumber {
            kind,
            date,
            sequence,
        })
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_invoice_number(self.kind, self.date, self.sequence))
    }
}
