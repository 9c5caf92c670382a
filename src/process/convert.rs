use std::{
    collections::{btree_map::Entry, BTreeMap},
    path::Path,
};
use tracing::{instrument, warn};

use crate::{
    config::DuplicatePolicy,
    error::LoadError,
    process::{chunk::ChunkRows, date_parser::parse_invoice_datetime, raw_table::RawInvoiceRow},
    table::{FileSpan, InvoiceRecord, InvoiceTable},
};

/// Concatenate every chunk's rows into one table, typing the date columns and
/// indexing by record id.
///
/// No row is dropped or deduplicated. An unparsable date aborts the merge. A record id
/// seen from a second file is always logged; `policy` decides whether it fails the merge.
#[instrument(level = "info", skip(chunks), fields(chunks = chunks.len()))]
pub fn merge_chunks(
    chunks: Vec<ChunkRows>,
    policy: DuplicatePolicy,
) -> Result<InvoiceTable, LoadError> {
    let total: usize = chunks
        .iter()
        .flat_map(|c| &c.files)
        .map(|f| f.rows.len())
        .sum();
    let mut records = Vec::with_capacity(total);
    let mut index: BTreeMap<String, Vec<FileSpan>> = BTreeMap::new();

    for file in chunks.into_iter().flat_map(|c| c.files) {
        let start = records.len();
        for row in file.rows {
            records.push(convert_row(&file.path, &file.record_id, row)?);
        }
        let span = FileSpan {
            path: file.path,
            rows: start..records.len(),
        };

        match index.entry(file.record_id) {
            Entry::Vacant(slot) => {
                slot.insert(vec![span]);
            }
            Entry::Occupied(mut slot) => {
                let first = slot.get()[0].path.clone();
                warn!(
                    record_id = %slot.key(),
                    first = %first.display(),
                    second = %span.path.display(),
                    "record id derived from more than one file"
                );
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(LoadError::DuplicateKey {
                            record_id: slot.key().clone(),
                            first,
                            second: span.path,
                        });
                    }
                    DuplicatePolicy::Keep => slot.get_mut().push(span),
                }
            }
        }
    }

    Ok(InvoiceTable::from_parts(records, index))
}

fn convert_row(
    path: &Path,
    record_id: &str,
    raw: RawInvoiceRow,
) -> Result<InvoiceRecord, LoadError> {
    let creation_date = parse_date_column(path, raw.line, "creation_date", raw.creation_date)?;
    let due_date = parse_date_column(path, raw.line, "due_date", raw.due_date)?;
    Ok(InvoiceRecord {
        record_id: record_id.to_string(),
        var_symbol: raw.var_symbol,
        creation_date,
        due_date,
        amount: raw.amount,
        vat: raw.vat,
        payment_type: raw.payment_type,
        is_paid: raw.is_paid,
    })
}

fn parse_date_column(
    path: &Path,
    line: u64,
    column: &'static str,
    value: String,
) -> Result<chrono::NaiveDateTime, LoadError> {
    parse_invoice_datetime(&value).ok_or_else(|| LoadError::Conversion {
        path: path.to_path_buf(),
        line,
        column,
        value,
    })
}
