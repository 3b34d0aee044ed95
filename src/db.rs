use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::barcode::interpret_expiry;
use crate::error::{AppError, Result};
use crate::types::{HistoryEdit, HistoryEntry, MasterProduct, MatchType};

pub fn init_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS master (
            barcode TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            rms TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY,
            raw TEXT NOT NULL,
            gtin TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            rms TEXT NOT NULL DEFAULT '',
            match_type TEXT NOT NULL DEFAULT 'NONE',
            source TEXT NOT NULL DEFAULT '',
            expiry TEXT NOT NULL DEFAULT '',
            expiry_iso TEXT NOT NULL DEFAULT '',
            expiry_display TEXT NOT NULL DEFAULT '',
            batch TEXT NOT NULL DEFAULT '',
            serial TEXT NOT NULL DEFAULT '',
            qty INTEGER NOT NULL DEFAULT 1,
            scanned_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

// Master data
/// Upserts `items` in one transaction, first emptying the table when `replace`.
/// A failure leaves the previous master data untouched.
pub fn bulk_add_master(
    conn: &mut Connection,
    items: &[MasterProduct],
    replace: bool,
) -> Result<usize> {
    let tx = conn.transaction()?;
    if replace {
        tx.execute("DELETE FROM master", [])?;
    }
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO master (barcode, name, rms) VALUES (?, ?, ?)
             ON CONFLICT(barcode) DO UPDATE SET name = excluded.name, rms = excluded.rms",
        )?;
        for item in items {
            count += stmt.execute(params![item.barcode, item.name, item.rms])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn add_master(conn: &Connection, item: &MasterProduct) -> Result<()> {
    conn.execute(
        "INSERT INTO master (barcode, name, rms) VALUES (?, ?, ?)
         ON CONFLICT(barcode) DO UPDATE SET name = excluded.name, rms = excluded.rms",
        params![item.barcode, item.name, item.rms],
    )?;
    Ok(())
}

pub fn clear_master(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM master", [])?;
    Ok(())
}

pub fn count_master(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM master", [], |row| row.get(0))?;
    Ok(count)
}

pub fn get_master(conn: &Connection) -> Result<Vec<MasterProduct>> {
    let mut stmt = conn.prepare("SELECT barcode, name, rms FROM master ORDER BY barcode")?;
    let iter = stmt.query_map([], |row| {
        Ok(MasterProduct {
            barcode: row.get(0)?,
            name: row.get(1)?,
            rms: row.get(2)?,
        })
    })?;
    Ok(iter.collect::<rusqlite::Result<Vec<_>>>()?)
}

// History
const HISTORY_COLUMNS: &str = "id, raw, gtin, name, rms, match_type, source, expiry, expiry_iso, \
     expiry_display, batch, serial, qty, scanned_at";

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let match_type: String = row.get(5)?;
    let scanned_at: String = row.get(13)?;
    let scanned_at = DateTime::parse_from_rfc3339(&scanned_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);
    Ok(HistoryEntry {
        id: row.get(0)?,
        raw: row.get(1)?,
        gtin: row.get(2)?,
        name: row.get(3)?,
        rms: row.get(4)?,
        match_type: MatchType::from_db(&match_type),
        source: row.get(6)?,
        expiry: row.get(7)?,
        expiry_iso: row.get(8)?,
        expiry_display: row.get(9)?,
        batch: row.get(10)?,
        serial: row.get(11)?,
        qty: row.get(12)?,
        scanned_at,
    })
}

/// Stores `entry` (its `id` is ignored) and returns the new row id.
pub fn add_history(conn: &Connection, entry: &HistoryEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO history (raw, gtin, name, rms, match_type, source, expiry, expiry_iso,
            expiry_display, batch, serial, qty, scanned_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            entry.raw,
            entry.gtin,
            entry.name,
            entry.rms,
            entry.match_type.as_str(),
            entry.source,
            entry.expiry,
            entry.expiry_iso,
            entry.expiry_display,
            entry.batch,
            entry.serial,
            entry.qty,
            entry.scanned_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All scans, newest first.
pub fn get_history(conn: &Connection) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM history ORDER BY scanned_at DESC, id DESC",
        HISTORY_COLUMNS
    ))?;
    let iter = stmt.query_map([], history_from_row)?;
    Ok(iter.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_history_entry(conn: &Connection, id: i64) -> Result<Option<HistoryEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {} FROM history WHERE id = ?", HISTORY_COLUMNS),
            params![id],
            history_from_row,
        )
        .optional()?;
    Ok(entry)
}

pub fn update_history(conn: &Connection, id: i64, edit: &HistoryEdit) -> Result<HistoryEntry> {
    let mut entry = get_history_entry(conn, id)?.ok_or(AppError::NotFound(id))?;

    if let Some(name) = &edit.name {
        entry.name = name.trim().to_string();
    }
    if let Some(qty) = edit.qty {
        entry.qty = qty.max(1);
    }
    if let Some(batch) = &edit.batch {
        entry.batch = crate::barcode::sanitize_code(batch);
    }
    if let Some(expiry) = &edit.expiry {
        let expiry = expiry.trim();
        if expiry.is_empty() {
            entry.expiry.clear();
            entry.expiry_iso.clear();
            entry.expiry_display.clear();
        } else {
            let date =
                interpret_expiry(expiry).ok_or_else(|| AppError::InvalidExpiry(expiry.to_string()))?;
            entry.expiry = expiry.to_string();
            entry.expiry_iso = date.iso;
            entry.expiry_display = date.display;
        }
    }

    conn.execute(
        "UPDATE history SET name = ?, qty = ?, batch = ?, expiry = ?, expiry_iso = ?,
            expiry_display = ? WHERE id = ?",
        params![
            entry.name,
            entry.qty,
            entry.batch,
            entry.expiry,
            entry.expiry_iso,
            entry.expiry_display,
            id
        ],
    )?;
    Ok(entry)
}

pub fn delete_history(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM history WHERE id = ?", params![id])?;
    if changed == 0 {
        return Err(AppError::NotFound(id));
    }
    Ok(())
}

pub fn clear_history(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM history", [])?)
}

// Settings
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}
