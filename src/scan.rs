use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::barcode;
use crate::catalog::{self, CatalogIndex};
use crate::config::AppConfig;
use crate::db;
use crate::error::Result;
use crate::expiry::{self, ExpiryStatus};
use crate::lookup::LookupChain;
use crate::types::{HistoryEdit, HistoryEntry, MasterProduct, MatchType, ScanOutcome};
use crate::utils::gtin_from_digits;

/// Drops a scan when the same code arrives again inside the window.
#[derive(Debug)]
pub struct DuplicateGuard {
    window: chrono::Duration,
    last: Option<(DateTime<Utc>, String)>,
}

impl DuplicateGuard {
    pub fn new(window: chrono::Duration) -> Self {
        Self { window, last: None }
    }

    /// Records the scan and reports whether it should be processed.
    pub fn admit(&mut self, code: &str, now: DateTime<Utc>) -> bool {
        if let Some((last_time, last_code)) = &self.last
            && now.signed_duration_since(*last_time) < self.window
            && last_code == code
        {
            return false;
        }
        self.last = Some((now, code.to_string()));
        true
    }
}

pub struct Scanner {
    conn: Connection,
    index: CatalogIndex,
    lookup: LookupChain,
    config: AppConfig,
    guard: DuplicateGuard,
}

impl Scanner {
    pub fn new(conn: Connection, lookup: LookupChain, config: AppConfig) -> Result<Self> {
        let guard = DuplicateGuard::new(config.duplicate_window);
        let mut scanner = Self {
            conn,
            index: CatalogIndex::new(),
            lookup,
            config,
            guard,
        };
        scanner.reload_catalog()?;
        Ok(scanner)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.index
    }

    pub fn today(&self) -> NaiveDate {
        expiry::today_in(self.config.timezone)
    }

    pub fn reload_catalog(&mut self) -> Result<usize> {
        self.index = CatalogIndex::from_products(db::get_master(&self.conn)?);
        debug!(entries = self.index.len(), "catalog index rebuilt");
        Ok(self.index.len())
    }

    /// Loads a master product file, replacing current data unless `append`.
    pub fn import_master(&mut self, text: &str, append: bool) -> Result<usize> {
        let items = catalog::parse_master_file(text)?;
        let count = db::bulk_add_master(&mut self.conn, &items, !append)?;
        self.reload_catalog()?;
        info!(count, append, "master data imported");
        Ok(count)
    }

    pub fn reset_master(&mut self) -> Result<()> {
        db::clear_master(&self.conn)?;
        self.reload_catalog()?;
        Ok(())
    }

    /// Corrects a history entry. An edited name is also written to master
    /// data so later scans of the same GTIN come back named.
    pub fn edit_entry(&mut self, id: i64, edit: &HistoryEdit) -> Result<HistoryEntry> {
        let entry = db::update_history(&self.conn, id, edit)?;
        if edit.name.is_some() && !entry.name.is_empty() && !entry.gtin.is_empty() {
            let product = MasterProduct {
                barcode: entry.gtin.clone(),
                name: entry.name.clone(),
                rms: entry.rms.clone(),
            };
            db::add_master(&self.conn, &product)?;
            self.index.insert(product);
            info!(id, gtin = %entry.gtin, "master data updated from edit");
        }
        Ok(entry)
    }

    pub fn process(&mut self, code: &str) -> Result<Option<ScanOutcome>> {
        self.process_at(code, Utc::now())
    }

    /// Parses, names and stores one scan. Returns `None` for empty input,
    /// codes without a usable GTIN and duplicate scans.
    pub fn process_at(&mut self, code: &str, now: DateTime<Utc>) -> Result<Option<ScanOutcome>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        let parsed = barcode::parse(code);
        let gtin = if parsed.gtin.is_empty() {
            match gtin_from_digits(code) {
                Some(gtin) => gtin,
                None => {
                    info!(code, "no GTIN in scan");
                    return Ok(None);
                }
            }
        } else {
            parsed.gtin.clone()
        };

        if !self.guard.admit(&gtin, now) {
            debug!(gtin = %gtin, "duplicate scan ignored");
            return Ok(None);
        }

        let mut matched = self.index.match_gtin(&gtin);
        let mut source = String::new();
        if !matched.is_found()
            && let Some(remote) = self.lookup.lookup(&gtin)
        {
            // remember it so the next scan resolves locally
            let product = MasterProduct {
                barcode: gtin.clone(),
                name: remote.name.clone(),
                rms: String::new(),
            };
            db::add_master(&self.conn, &product)?;
            self.index.insert(product);
            matched.name = remote.name;
            matched.match_type = MatchType::Api;
            source = remote.source;
        }

        let mut entry = HistoryEntry {
            id: 0,
            raw: parsed.raw,
            gtin,
            name: matched.name,
            rms: matched.rms,
            match_type: matched.match_type,
            source,
            expiry: parsed.expiry,
            expiry_iso: parsed.expiry_iso,
            expiry_display: parsed.expiry_display,
            batch: parsed.batch,
            serial: parsed.serial,
            qty: parsed.qty,
            scanned_at: now,
        };
        entry.id = db::add_history(&self.conn, &entry)?;

        let status = self.status_of(&entry);
        info!(
            id = entry.id,
            gtin = %entry.gtin,
            match_type = entry.match_type.as_str(),
            status = %status,
            "scan recorded"
        );
        Ok(Some(ScanOutcome { entry, status }))
    }

    pub fn status_of(&self, entry: &HistoryEntry) -> ExpiryStatus {
        expiry::classify(
            Some(entry.expiry_iso.as_str()),
            self.config.expiry_soon_days,
            self.today(),
        )
    }
}
