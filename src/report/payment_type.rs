use serde::Serialize;
use std::{collections::HashMap, path::Path};

use crate::{error::ReportError, report::write::write_csv_atomically, table::InvoiceTable};

pub const FILE_NAME: &str = "total_by_payment_type.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTypeTotal {
    #[serde(rename = "Payment type")]
    pub payment_type: String,
    #[serde(rename = "Count")]
    pub count: usize,
}

/// Invoice count per payment type, most frequent first, ties by name.
pub fn count_by_payment_type(table: &InvoiceTable) -> Vec<PaymentTypeTotal> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in table {
        *counts.entry(r.payment_type.as_str()).or_default() += 1;
    }
    let mut totals: Vec<PaymentTypeTotal> = counts
        .into_iter()
        .map(|(payment_type, count)| PaymentTypeTotal {
            payment_type: payment_type.to_string(),
            count,
        })
        .collect();
    totals.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.payment_type.cmp(&b.payment_type))
    });
    totals
}

pub fn save_total_by_payment_type(
    table: &InvoiceTable,
    output_dir: &Path,
) -> Result<usize, ReportError> {
    let totals = count_by_payment_type(table);
    write_csv_atomically(&output_dir.join(FILE_NAME), |w| {
        w.write_record(["Payment type", "Count"])?;
        for t in &totals {
            w.serialize(t)?;
        }
        Ok(())
    })?;
    Ok(totals.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{record, table_of};
    use std::fs;
    use tempfile::tempdir;

    fn paid_by(id: &str, kind: &str) -> crate::table::InvoiceRecord {
        let mut r = record(id, (2024, 1, 1), (2024, 2, 1));
        r.payment_type = kind.to_string();
        r
    }

    #[test]
    fn counts_sum_to_row_count() {
        let table = table_of(vec![
            paid_by("1", "card"),
            paid_by("2", "cash"),
            paid_by("3", "card"),
            paid_by("4", "transfer"),
            paid_by("5", "card"),
            paid_by("6", "cash"),
        ]);
        let totals = count_by_payment_type(&table);
        assert_eq!(totals.iter().map(|t| t.count).sum::<usize>(), table.len());
        let order: Vec<_> = totals
            .iter()
            .map(|t| (t.payment_type.as_str(), t.count))
            .collect();
        assert_eq!(order, vec![("card", 3), ("cash", 2), ("transfer", 1)]);
    }

    #[test]
    fn writes_two_columns() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let table = table_of(vec![paid_by("1", "cash"), paid_by("2", "card")]);
        assert_eq!(save_total_by_payment_type(&table, dir.path())?, 2);
        let text = fs::read_to_string(dir.path().join(FILE_NAME))?;
        assert_eq!(text, "Payment type,Count\ncard,1\ncash,1\n");
        Ok(())
    }
}
