use chrono::NaiveDate;
use std::path::Path;

use crate::{
    error::ReportError,
    report::write::write_csv_atomically,
    table::{InvoiceRecord, InvoiceTable, RECORD_HEADER},
};

pub const FILE_NAME: &str = "unpaid_today.csv";

/// Unpaid invoices created before `today` and due after it, compared by calendar date.
pub fn select_unpaid_today(table: &InvoiceTable, today: NaiveDate) -> Vec<&InvoiceRecord> {
    table
        .iter()
        .filter(|r| !r.is_paid && r.creation_date.date() < today && r.due_date.date() > today)
        .collect()
}

pub fn save_unpaid_today(
    table: &InvoiceTable,
    output_dir: &Path,
    today: NaiveDate,
) -> Result<usize, ReportError> {
    let rows = select_unpaid_today(table, today);
    write_csv_atomically(&output_dir.join(FILE_NAME), |w| {
        w.write_record(RECORD_HEADER)?;
        for r in &rows {
            w.serialize(r)?;
        }
        Ok(())
    })?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{record, table_of};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()
    }

    #[test]
    fn open_invoice_is_listed_until_paid() {
        let mut r = record("1", (2024, 2, 19), (2024, 2, 21));
        let table = table_of(vec![r.clone()]);
        assert_eq!(select_unpaid_today(&table, today()).len(), 1);

        r.is_paid = true;
        let table = table_of(vec![r]);
        assert!(select_unpaid_today(&table, today()).is_empty());
    }

    #[test]
    fn boundaries_are_exclusive() {
        let table = table_of(vec![
            record("1", (2024, 2, 20), (2024, 2, 21)), // created today
            record("2", (2024, 2, 19), (2024, 2, 20)), // due today
            record("3", (2024, 1, 1), (2024, 1, 31)),  // already overdue
            record("4", (2024, 1, 1), (2024, 12, 31)),
        ]);
        let ids: Vec<_> = select_unpaid_today(&table, today())
            .into_iter()
            .map(|r| r.record_id.as_str())
            .collect();
        assert_eq!(ids, vec!["4"]);
    }

    #[test]
    fn time_of_day_is_ignored() {
        let mut r = record("1", (2024, 2, 19), (2024, 2, 20));
        r.due_date = r.due_date + chrono::Duration::hours(23);
        let table = table_of(vec![r]);
        assert!(select_unpaid_today(&table, today()).is_empty());
    }
}
