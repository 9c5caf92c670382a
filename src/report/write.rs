use csv::{Writer, WriterBuilder};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
};

use crate::error::ReportError;

pub(crate) type CsvSink = Writer<BufWriter<File>>;

/// Write a comma-separated report to `path` through a temporary file renamed
/// over the target, so a failed report never leaves a half-written file behind.
/// Headers are written by `fill` itself so that empty reports still get one.
pub(crate) fn write_csv_atomically<F>(path: &Path, fill: F) -> Result<(), ReportError>
where
    F: FnOnce(&mut CsvSink) -> Result<(), csv::Error>,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let result = write_to(&tmp_path, path, fill).and_then(|()| {
        fs::rename(&tmp_path, path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_to<F>(tmp_path: &Path, path: &Path, fill: F) -> Result<(), ReportError>
where
    F: FnOnce(&mut CsvSink) -> Result<(), csv::Error>,
{
    let file = File::create(tmp_path).map_err(|source| ReportError::Io {
        path: tmp_path.to_path_buf(),
        source,
    })?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    fill(&mut writer).map_err(|source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    writer.flush().map_err(|source| ReportError::Io {
        path: tmp_path.to_path_buf(),
        source,
    })
}
