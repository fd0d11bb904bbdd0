//! # Invoice Sequences
//!
//! One counter row per (kind, day). Bumped with an UPSERT inside the
//! transaction that inserts the purchase or sale header, so two concurrent
//! checkouts can never receive the same number and a rolled-back checkout
//! gives its number back.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use duka_core::invoice::{day_key, format_invoice_number};
use duka_core::InvoiceKind;

/// Issues the next invoice number for `kind` on the UTC day of `at`.
pub(crate) async fn next_invoice_number(
    conn: &mut SqliteConnection,
    kind: InvoiceKind,
    at: DateTime<Utc>,
) -> DbResult<String> {
    let date = at.date_naive();

    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_counters (kind, day, last_seq)
        VALUES (?1, ?2, 1)
        ON CONFLICT (kind, day) DO UPDATE SET last_seq = last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(kind)
    .bind(day_key(date))
    .fetch_one(&mut *conn)
    .await?;

    let number = format_invoice_number(kind, date, sequence);
    debug!(%kind, invoice_no = %number, "Issued invoice number");
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_sequences_are_per_kind_and_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let day1 = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap();

        let a = next_invoice_number(&mut conn, InvoiceKind::Sale, day1).await.unwrap();
        let b = next_invoice_number(&mut conn, InvoiceKind::Sale, day1).await.unwrap();
        let p = next_invoice_number(&mut conn, InvoiceKind::Purchase, day1).await.unwrap();
        let c = next_invoice_number(&mut conn, InvoiceKind::Sale, day2).await.unwrap();

        assert_eq!(a, "INV-20240315-0001");
        assert_eq!(b, "INV-20240315-0002");
        assert_eq!(p, "PUR-20240315-0001");
        assert_eq!(c, "INV-20240316-0001");
    }
}
