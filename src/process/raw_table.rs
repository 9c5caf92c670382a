use serde::{de, Deserialize, Deserializer};
use std::path::PathBuf;

/// Source column order. Input files carry no header row.
pub const COLUMNS: [&str; 7] = [
    "var_symbol",
    "creation_date",
    "due_date",
    "amount",
    "VAT",
    "payment_type",
    "is_paid",
];

/// One source line, dates still textual.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawInvoiceRow {
    /// 1-based line number in the source file; filled in by the parser.
    #[serde(skip)]
    pub line: u64,
    pub var_symbol: String,
    pub creation_date: String,
    pub due_date: String,
    pub amount: f64,
    pub vat: String,
    pub payment_type: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is_paid: bool,
}

/// Every row parsed from one input file, in line order.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRows {
    pub path: PathBuf,
    /// Digits of the file name, shared by all rows of the file.
    pub record_id: String,
    pub rows: Vec<RawInvoiceRow>,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.trim() {
        "0" | "false" | "False" => Ok(false),
        "1" | "true" | "True" => Ok(true),
        other => Err(de::Error::invalid_value(
            de::Unexpected::Str(other),
            &"0 or 1",
        )),
    }
}
