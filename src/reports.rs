use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;
use crate::expiry::{self, ExpiryStatus};
use crate::types::HistoryEntry;

struct ReportRow {
    id: i64,
    gtin: String,
    name: String,
    rms: String,
    batch: String,
    serial: String,
    expiry: String,
    days_left: Option<i64>,
    qty: u32,
    status: ExpiryStatus,
}

/// Paths of the files written by [`export_history`].
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub csv: PathBuf,
    pub html: PathBuf,
}

pub fn export_history(
    entries: &[HistoryEntry],
    today: NaiveDate,
    threshold_days: i64,
    output_root: &Path,
) -> Result<ReportFiles> {
    fs::create_dir_all(output_root)?;
    let day_key = today.format("%Y-%m-%d").to_string();

    let rows: Vec<ReportRow> = entries
        .iter()
        .map(|entry| to_report_row(entry, today, threshold_days))
        .collect();

    let files = ReportFiles {
        csv: output_root.join(format!("expiry_report_{}.csv", day_key)),
        html: output_root.join(format!("expiry_report_{}.html", day_key)),
    };
    write_csv_report(&files.csv, &day_key, &rows)?;
    write_html_report(&files.html, &day_key, threshold_days, &rows)?;

    info!(rows = rows.len(), dir = %output_root.display(), "expiry report written");
    Ok(files)
}

fn to_report_row(entry: &HistoryEntry, today: NaiveDate, threshold_days: i64) -> ReportRow {
    let iso = entry.expiry_iso.as_str();
    ReportRow {
        id: entry.id,
        gtin: entry.gtin.clone(),
        name: entry.name.clone(),
        rms: entry.rms.clone(),
        batch: entry.batch.clone(),
        serial: entry.serial.clone(),
        expiry: entry.expiry_display.clone(),
        days_left: expiry::days_until(iso, today),
        qty: entry.qty,
        status: expiry::classify(Some(iso), threshold_days, today),
    }
}

fn status_counts(rows: &[ReportRow]) -> BTreeMap<&'static str, usize> {
    let mut counts: BTreeMap<&'static str, usize> = ExpiryStatus::ALL
        .iter()
        .map(|status| (status.as_str(), 0))
        .collect();
    for row in rows {
        *counts.entry(row.status.as_str()).or_default() += 1;
    }
    counts
}

fn write_csv_report(path: &Path, day: &str, rows: &[ReportRow]) -> Result<()> {
    let mut contents = String::new();
    writeln!(contents, "Report date,{}", day).expect("write to string");
    contents.push_str("Id,GTIN,Name,RMS,Batch,Serial,Expiry,Days Left,Qty,Status\n");
    for row in rows {
        writeln!(
            contents,
            "{},{},{},{},{},{},{},{},{},{}",
            row.id,
            row.gtin,
            csv_field(&row.name),
            csv_field(&row.rms),
            row.batch,
            row.serial,
            row.expiry,
            row.days_left.map(|d| d.to_string()).unwrap_or_default(),
            row.qty,
            row.status
        )
        .expect("write to string");
    }
    for (status, count) in status_counts(rows) {
        writeln!(contents, "Total {},{}", status, count).expect("write to string");
    }

    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

fn write_html_report(path: &Path, day: &str, threshold_days: i64, rows: &[ReportRow]) -> Result<()> {
    let mut html = String::new();
    writeln!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Expiry report {day}</title>\
<style>body{{font-family:Arial,sans-serif;padding:20px}}table{{border-collapse:collapse;width:100%;margin-top:16px}}th,td{{border:1px solid #555;padding:6px;text-align:center}}th{{background-color:#eee}}\
tr.expired{{background-color:#f8d7da}}tr.expiring{{background-color:#fff3cd}}</style></head><body>",
        day = day
    )
    .expect("write to string");
    writeln!(
        html,
        "<h1>Expiry report</h1><h2>{} (expiring within {} days)</h2>",
        day, threshold_days
    )
    .expect("write to string");
    html.push_str("<table><thead><tr><th>GTIN</th><th>Name</th><th>RMS</th><th>Batch</th><th>Serial</th><th>Expiry</th><th>Days Left</th><th>Qty</th><th>Status</th></tr></thead><tbody>");

    if rows.is_empty() {
        html.push_str("<tr><td colspan=\"9\">No scanned items.</td></tr>");
    } else {
        for row in rows {
            writeln!(
                html,
                "<tr class=\"{status}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{status}</td></tr>",
                row.gtin,
                escape_html(&row.name),
                escape_html(&row.rms),
                row.batch,
                row.serial,
                row.expiry,
                row.days_left.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                row.qty,
                status = row.status
            )
            .expect("write to string");
        }
    }
    html.push_str("</tbody></table><p>");
    for (status, count) in status_counts(rows) {
        write!(html, "<strong>{}:</strong> {} ", status, count).expect("write to string");
    }
    html.push_str("</p></body></html>");

    let mut file = File::create(path)?;
    file.write_all(html.as_bytes())?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn quotes_csv_fields_with_commas() {
        assert_eq!(csv_field("Paracetamol, 500mg"), "\"Paracetamol, 500mg\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }
}
