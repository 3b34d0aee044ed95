use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "expiry-tracker", version, about = "Track pharmacy product expiry dates from scanned barcodes")]
pub struct Cli {
    #[arg(long, global = true, help = "SQLite database file (overrides EXPIRY_DB_PATH)")]
    pub db: Option<PathBuf>,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a barcode without storing anything
    Parse { code: String },
    /// Process scans; reads one code per line from stdin when none are given
    Scan { codes: Vec<String> },
    /// Import a master product list (CSV/TSV)
    Import {
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        append: bool,
    },
    /// List scanned items with their expiry status
    History,
    /// Correct a scanned item
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        qty: Option<u32>,
        #[arg(long, help = "Expiry as YYMMDD; empty string clears it")]
        expiry: Option<String>,
        #[arg(long)]
        batch: Option<String>,
    },
    Delete {
        id: i64,
    },
    ClearHistory,
    ResetMaster,
    /// Write CSV and HTML expiry reports
    Report {
        #[arg(long, default_value = "reports")]
        out: PathBuf,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    Get { key: String },
    Set { key: String, value: String },
}
