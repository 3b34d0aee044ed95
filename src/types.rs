use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::expiry::ExpiryStatus;

/// Row of the master product list imported from CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterProduct {
    pub barcode: String,
    pub name: String,
    pub rms: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    Exact,
    Gtin13,
    Last8,
    /// Not in the master list; the name came from a remote product database.
    Api,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "EXACT",
            MatchType::Gtin13 => "GTIN13",
            MatchType::Last8 => "LAST8",
            MatchType::Api => "API",
            MatchType::None => "NONE",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "EXACT" => MatchType::Exact,
            "GTIN13" => MatchType::Gtin13,
            "LAST8" => MatchType::Last8,
            "API" => MatchType::Api,
            _ => MatchType::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductMatch {
    pub name: String,
    pub rms: String,
    pub match_type: MatchType,
}

impl ProductMatch {
    pub fn none() -> Self {
        Self {
            name: String::new(),
            rms: String::new(),
            match_type: MatchType::None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.match_type != MatchType::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteProduct {
    pub name: String,
    pub source: String,
}

/// A scanned item as stored in the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub raw: String,
    pub gtin: String,
    pub name: String,
    pub rms: String,
    pub match_type: MatchType,
    pub source: String,
    pub expiry: String,
    #[serde(rename = "expiryISO")]
    pub expiry_iso: String,
    pub expiry_display: String,
    pub batch: String,
    pub serial: String,
    pub qty: u32,
    pub scanned_at: DateTime<Utc>,
}

/// Result of processing one scan: the stored entry plus its status today.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub entry: HistoryEntry,
    pub status: ExpiryStatus,
}

/// Fields a user may correct on an existing history entry.
#[derive(Debug, Clone, Default)]
pub struct HistoryEdit {
    pub name: Option<String>,
    pub qty: Option<u32>,
    /// GS1 YYMMDD; an empty string clears the expiry.
    pub expiry: Option<String>,
    pub batch: Option<String>,
}
