// src/report/mod.rs
pub mod last_month;
pub mod payment_type;
pub mod unpaid;
pub mod vat_per_month;
mod write;

use chrono::{DateTime, Utc};
use std::{fmt, fs, path::Path, time::Instant};
use tracing::{error, info, instrument};

use crate::{error::ReportError, table::InvoiceTable};

pub use last_month::save_last_month_invoices;
pub use payment_type::save_total_by_payment_type;
pub use unpaid::save_unpaid_today;
pub use vat_per_month::save_vat_per_month;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportKind {
    LastMonthInvoices,
    VatPerMonth,
    TotalByPaymentType,
    UnpaidToday,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::LastMonthInvoices,
        ReportKind::VatPerMonth,
        ReportKind::TotalByPaymentType,
        ReportKind::UnpaidToday,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ReportKind::LastMonthInvoices => last_month::FILE_NAME,
            ReportKind::VatPerMonth => vat_per_month::FILE_NAME,
            ReportKind::TotalByPaymentType => payment_type::FILE_NAME,
            ReportKind::UnpaidToday => unpaid::FILE_NAME,
        }
    }

    /// Compute and write this report. Returns the number of data rows written.
    pub fn generate(
        &self,
        table: &InvoiceTable,
        output_dir: &Path,
        now: DateTime<Utc>,
    ) -> Result<usize, ReportError> {
        match self {
            ReportKind::LastMonthInvoices => save_last_month_invoices(table, output_dir, now),
            ReportKind::VatPerMonth => save_vat_per_month(table, output_dir),
            ReportKind::TotalByPaymentType => save_total_by_payment_type(table, output_dir),
            ReportKind::UnpaidToday => save_unpaid_today(table, output_dir, now.date_naive()),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportKind::LastMonthInvoices => "invoices created last month",
            ReportKind::VatPerMonth => "invoices per month and VAT class",
            ReportKind::TotalByPaymentType => "total by payment type",
            ReportKind::UnpaidToday => "unpaid invoices for today",
        };
        f.write_str(name)
    }
}

/// What `generate_all` managed to write.
#[derive(Debug, Default)]
pub struct ReportSummary {
    pub written: Vec<(ReportKind, usize)>,
    pub failed: Vec<(ReportKind, ReportError)>,
}

impl ReportSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write all four reports into `output_dir`, creating it if needed.
///
/// Reports are independent: a failing one is logged and recorded, the rest still run.
/// Only failing to create the output directory stops the whole batch.
#[instrument(
    level = "info",
    skip(table),
    fields(rows = table.len(), output_dir = %output_dir.display())
)]
pub fn generate_all(
    table: &InvoiceTable,
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<ReportSummary, ReportError> {
    fs::create_dir_all(output_dir).map_err(|source| ReportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut summary = ReportSummary::default();
    for kind in ReportKind::ALL {
        let start = Instant::now();
        match kind.generate(table, output_dir, now) {
            Ok(rows) => {
                info!(
                    report = %kind,
                    file = kind.file_name(),
                    rows,
                    elapsed = ?start.elapsed(),
                    "report written"
                );
                summary.written.push((kind, rows));
            }
            Err(e) => {
                error!(report = %kind, file = kind.file_name(), "report failed: {}", e);
                summary.failed.push((kind, e));
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{record, table_of};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap()
    }

    #[test]
    fn writes_all_four_files_into_a_new_directory() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("output");
        let table = table_of(vec![
            record("1", (2024, 1, 15), (2024, 3, 1)),
            record("2", (2024, 2, 15), (2024, 3, 15)),
        ]);

        let summary = generate_all(&table, &out, now())?;
        assert!(summary.is_success());
        assert_eq!(summary.written.len(), 4);
        for kind in ReportKind::ALL {
            assert!(out.join(kind.file_name()).is_file(), "{} missing", kind);
        }
        let unpaid = summary
            .written
            .iter()
            .find(|(k, _)| *k == ReportKind::UnpaidToday)
            .map(|(_, n)| *n);
        assert_eq!(unpaid, Some(2));
        Ok(())
    }

    #[test]
    fn one_failing_report_does_not_stop_the_others() -> anyhow::Result<()> {
        let dir = tempdir()?;
        // a directory squatting on the target name makes the final rename fail
        std::fs::create_dir(dir.path().join(vat_per_month::FILE_NAME))?;
        let table = table_of(vec![record("1", (2024, 1, 15), (2024, 3, 1))]);

        let summary = generate_all(&table, dir.path(), now())?;
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, ReportKind::VatPerMonth);
        assert_eq!(summary.written.len(), 3);
        assert!(dir.path().join(unpaid::FILE_NAME).is_file());
        Ok(())
    }
}
