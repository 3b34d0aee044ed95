pub mod barcode;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod expiry;
pub mod lookup;
pub mod reports;
pub mod scan;
pub mod types;
pub mod utils;

pub use barcode::{AiMap, ParsedBarcode, decode, parse};
pub use error::{AppError, Result};
pub use expiry::{ExpiryStatus, classify};
