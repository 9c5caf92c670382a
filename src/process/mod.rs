// src/process/mod.rs
pub mod chunk;
pub mod convert;
pub mod date_parser;
pub mod raw_table;
pub mod split;
pub mod utils;

use csv::{ReaderBuilder, StringRecord, Trim};
use glob::glob;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, info, instrument, warn};

use crate::{config::Config, error::LoadError, table::InvoiceTable};
use chunk::{load_chunks, LoadOptions};
use convert::merge_chunks;
use raw_table::{FileRows, RawInvoiceRow, COLUMNS};
use split::divide_into_chunks;
use utils::record_id_from_path;

/// Parse one `;`-separated invoice file (no header row) into its rows.
///
/// Every row shares the record id derived from the file name. Blank and
/// whitespace-only lines are skipped; any other malformed line fails the whole file.
#[instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub fn parse_invoice_file(path: &Path) -> Result<FileRows, LoadError> {
    let record_id = record_id_from_path(path).ok_or_else(|| LoadError::MissingRecordId {
        path: path.to_path_buf(),
    })?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true) // column count is checked per line below, with the line number
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            line: None,
            source,
        })?;

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        let more = rdr.read_record(&mut record).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            line: source.position().map(|p| p.line()),
            source,
        })?;
        if !more {
            break;
        }

        let line = record.position().map(|p| p.line()).unwrap_or_default();
        // whitespace-only line, trimmed down to a single empty field
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != COLUMNS.len() {
            return Err(LoadError::ColumnCount {
                path: path.to_path_buf(),
                line,
                expected: COLUMNS.len(),
                found: record.len(),
            });
        }

        let mut row: RawInvoiceRow =
            record
                .deserialize(None)
                .map_err(|source| LoadError::Parse {
                    path: path.to_path_buf(),
                    line: Some(line),
                    source,
                })?;
        row.line = line;
        rows.push(row);
    }

    debug!(rows = rows.len(), record_id = %record_id, "parsed file");
    Ok(FileRows {
        path: path.to_path_buf(),
        record_id,
        rows,
    })
}

/// All `*.csv` files directly inside `data_dir`, sorted by path.
pub fn discover_invoice_files(data_dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !data_dir.is_dir() {
        return Err(LoadError::Io {
            path: data_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }
    let pattern = data_dir.join("*.csv");
    let mut files = glob(&pattern.to_string_lossy())?
        .collect::<Result<Vec<PathBuf>, _>>()?;
    files.sort();
    Ok(files)
}

/// Discover, partition, load in parallel and merge every invoice file under
/// `config.data_dir`.
#[instrument(
    level = "info",
    skip(config),
    fields(data_dir = %config.data_dir.display(), workers = config.n_workers)
)]
pub fn load_invoices(config: &Config) -> Result<InvoiceTable, LoadError> {
    let start = Instant::now();

    let files = discover_invoice_files(&config.data_dir)?;
    if files.is_empty() {
        warn!("no invoice files found");
    }
    let n_files = files.len();
    let chunks = divide_into_chunks(files, config.n_workers)?;
    info!(files = n_files, chunks = chunks.len(), elapsed = ?start.elapsed(), "files listed");

    let options = LoadOptions {
        n_workers: config.n_workers,
        timeout: config.load_timeout(),
    };
    let loaded = load_chunks(chunks, &options)?;
    info!(elapsed = ?start.elapsed(), "chunks loaded");

    let table = merge_chunks(loaded, config.duplicate_ids)?;
    info!(
        rows = table.len(),
        ids = table.record_ids().count(),
        elapsed = ?start.elapsed(),
        "table ready"
    );
    Ok(table)
}
