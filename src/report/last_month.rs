use chrono::{DateTime, Datelike, Utc};
use std::path::Path;

use crate::{
    error::ReportError,
    report::write::write_csv_atomically,
    table::{InvoiceRecord, InvoiceTable, RECORD_HEADER},
};

pub const FILE_NAME: &str = "last_month_invoices.csv";

/// `(year, month)` of the calendar month before the one `now` falls in (UTC).
pub fn previous_month(now: DateTime<Utc>) -> (i32, u32) {
    match now.month() {
        1 => (now.year() - 1, 12),
        m => (now.year(), m - 1),
    }
}

/// Invoices created during the month before `now`, in table order.
pub fn select_last_month(table: &InvoiceTable, now: DateTime<Utc>) -> Vec<&InvoiceRecord> {
    let (year, month) = previous_month(now);
    table
        .iter()
        .filter(|r| r.creation_date.year() == year && r.creation_date.month() == month)
        .collect()
}

pub fn save_last_month_invoices(
    table: &InvoiceTable,
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<usize, ReportError> {
    let rows = select_last_month(table, now);
    write_csv_atomically(&output_dir.join(FILE_NAME), |w| {
        w.write_record(RECORD_HEADER)?;
        for r in &rows {
            w.serialize(r)?;
        }
        Ok(())
    })?;
    Ok(rows.len())
}
