pub mod cli;
pub mod compare;
pub mod error;
pub mod export;
pub mod parser;
pub mod types;

pub use error::ReportError;
pub use parser::{scan_log, LogScanner};
