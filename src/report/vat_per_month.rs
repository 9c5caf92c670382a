use chrono::Datelike;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use crate::{error::ReportError, report::write::write_csv_atomically, table::InvoiceTable};

pub const FILE_NAME: &str = "VAT_per_month.csv";

/// Invoice counts per creation month and VAT class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VatMatrix {
    /// VAT classes, numeric labels in numeric order, others after them
    pub classes: Vec<String>,
    /// `(YYYY-MM, count per class)`, months ascending; only months with invoices
    pub months: Vec<(String, Vec<usize>)>,
}

pub fn count_vat_per_month(table: &InvoiceTable) -> VatMatrix {
    let mut counts: BTreeMap<(i32, u32), BTreeMap<&str, usize>> = BTreeMap::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for r in table {
        let month = (r.creation_date.year(), r.creation_date.month());
        *counts.entry(month).or_default().entry(r.vat.as_str()).or_default() += 1;
        seen.insert(r.vat.as_str());
    }

    let mut classes: Vec<&str> = seen.into_iter().collect();
    classes.sort_by(|a, b| compare_vat(a, b));

    let months = counts
        .into_iter()
        .map(|((y, m), per_class)| {
            let row = classes
                .iter()
                .map(|c| per_class.get(c).copied().unwrap_or(0))
                .collect();
            (format!("{:04}-{:02}", y, m), row)
        })
        .collect();

    VatMatrix {
        classes: classes.into_iter().map(str::to_string).collect(),
        months,
    }
}

fn compare_vat(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

pub fn save_vat_per_month(table: &InvoiceTable, output_dir: &Path) -> Result<usize, ReportError> {
    let matrix = count_vat_per_month(table);
    write_csv_atomically(&output_dir.join(FILE_NAME), |w| {
        let mut header = vec!["creation_date".to_string()];
        header.extend(matrix.classes.iter().cloned());
        w.write_record(&header)?;
        for (month, row) in &matrix.months {
            let mut record = vec![month.clone()];
            record.extend(row.iter().map(usize::to_string));
            w.write_record(&record)?;
        }
        Ok(())
    })?;
    Ok(matrix.months.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::{record, table_of};
    use std::fs;
    use tempfile::tempdir;

    fn with_vat(id: &str, created: (i32, u32, u32), vat: &str) -> crate::table::InvoiceRecord {
        let mut r = record(id, created, (2030, 1, 1));
        r.vat = vat.to_string();
        r
    }

    #[test]
    fn counts_per_month_and_class() {
        let table = table_of(vec![
            with_vat("1", (2024, 1, 3), "21"),
            with_vat("2", (2024, 1, 9), "21"),
            with_vat("3", (2024, 1, 20), "0"),
            with_vat("4", (2024, 3, 1), "15"),
            with_vat("5", (2023, 12, 31), "21"),
        ]);
        let m = count_vat_per_month(&table);
        assert_eq!(m.classes, vec!["0", "15", "21"]);
        assert_eq!(
            m.months,
            vec![
                ("2023-12".to_string(), vec![0, 0, 1]),
                ("2024-01".to_string(), vec![1, 0, 2]),
                ("2024-03".to_string(), vec![0, 1, 0]),
            ]
        );
    }

    #[test]
    fn numeric_classes_sort_numerically() {
        let mut v = vec!["21", "exempt", "5", "10"];
        v.sort_by(|a, b| compare_vat(a, b));
        assert_eq!(v, vec!["5", "10", "21", "exempt"]);
    }

    #[test]
    fn writes_matrix() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let table = table_of(vec![
            with_vat("1", (2024, 1, 3), "21"),
            with_vat("2", (2024, 2, 3), "0"),
        ]);
        assert_eq!(save_vat_per_month(&table, dir.path())?, 2);
        let text = fs::read_to_string(dir.path().join(FILE_NAME))?;
        assert_eq!(text, "creation_date,0,21\n2024-01,0,1\n2024-02,1,0\n");
        Ok(())
    }
}
