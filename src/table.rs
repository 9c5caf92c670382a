//! The merged, immutable invoice table handed to the reports.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, ops::Range, path::PathBuf};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column names of a serialized `InvoiceRecord`, in field order.
pub const RECORD_HEADER: [&str; 8] = [
    "ID",
    "var_symbol",
    "creation_date",
    "due_date",
    "amount",
    "VAT",
    "payment_type",
    "is_paid",
];

/// One invoice line with typed dates. Serializes to the report column layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRecord {
    #[serde(rename = "ID")]
    pub record_id: String,
    pub var_symbol: String,
    #[serde(serialize_with = "serialize_datetime")]
    pub creation_date: NaiveDateTime,
    #[serde(serialize_with = "serialize_datetime")]
    pub due_date: NaiveDateTime,
    pub amount: f64,
    #[serde(rename = "VAT")]
    pub vat: String,
    pub payment_type: String,
    #[serde(serialize_with = "serialize_flag")]
    pub is_paid: bool,
}

/// Rows of the table contributed by one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpan {
    pub path: PathBuf,
    pub rows: Range<usize>,
}

/// All invoice records, in chunk then file then line order, indexed by `record_id`.
#[derive(Debug, Default)]
pub struct InvoiceTable {
    records: Vec<InvoiceRecord>,
    index: BTreeMap<String, Vec<FileSpan>>,
}

impl InvoiceTable {
    pub(crate) fn from_parts(
        records: Vec<InvoiceRecord>,
        index: BTreeMap<String, Vec<FileSpan>>,
    ) -> Self {
        Self { records, index }
    }

    pub fn records(&self) -> &[InvoiceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct record ids, ascending.
    pub fn record_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Files (and their row ranges) that produced `record_id`. More than one entry
    /// only when duplicates were kept.
    pub fn sources(&self, record_id: &str) -> &[FileSpan] {
        self.index.get(record_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All records carrying `record_id`, in table order.
    pub fn get<'a>(&'a self, record_id: &str) -> impl Iterator<Item = &'a InvoiceRecord> + 'a {
        self.sources(record_id)
            .iter()
            .flat_map(move |span| &self.records[span.rows.clone()])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InvoiceRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a InvoiceTable {
    type Item = &'a InvoiceRecord;
    type IntoIter = std::slice::Iter<'a, InvoiceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn serialize_datetime<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&dt.format(DATETIME_FORMAT))
}

fn serialize_flag<S: Serializer>(flag: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*flag))
}
