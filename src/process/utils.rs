use std::path::Path;

/// Derives the record id of an input file: every ASCII digit of its file name, in order.
///
/// Only the file name is looked at, so `inp2/inv_00042.csv` still gives `"00042"`.
/// Returns `None` when the name has no digits.
pub fn record_id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let id: String = name.chars().filter(char::is_ascii_digit).collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
