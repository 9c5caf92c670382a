pub mod config;
pub mod error;
pub mod process;
pub mod report;
pub mod table;

pub use config::{Config, DuplicatePolicy};
pub use error::{LoadError, ReportError};
pub use process::load_invoices;
pub use table::{InvoiceRecord, InvoiceTable};
