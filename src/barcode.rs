// src/barcode.rs
use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::utils::{digits_only, pad_gtin};

/// Canonical GS1 group separator (FNC1 in compact encodings).
pub const GROUP_SEPARATOR: char = '\u{1d}';

const MAX_CODE_LEN: usize = 20;

pub mod ai {
    pub const GTIN: &str = "01";
    pub const EXPIRY: &str = "17";
    pub const BATCH: &str = "10";
    pub const SERIAL: &str = "21";
}

/// Application Identifier -> raw value, built fresh for every decode.
pub type AiMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBarcode {
    pub raw: String,
    pub gtin: String,
    /// YYMMDD exactly as scanned.
    pub expiry: String,
    #[serde(rename = "expiryISO")]
    pub expiry_iso: String,
    pub expiry_display: String,
    pub batch: String,
    pub serial: String,
    pub qty: u32,
    #[serde(rename = "isGS1")]
    pub is_gs1: bool,
}

impl ParsedBarcode {
    fn empty(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            gtin: String::new(),
            expiry: String::new(),
            expiry_iso: String::new(),
            expiry_display: String::new(),
            batch: String::new(),
            serial: String::new(),
            qty: 1,
            is_gs1: false,
        }
    }
}

pub fn normalize(raw: &str) -> String {
    // scanners append CR/LF/TAB and some prepend a BOM
    let s = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    s.chars().filter(|c| !matches!(c, '\r' | '\n' | '\t')).collect()
}

/// Splits a barcode payload into its Application Identifiers.
///
/// Bracketed notation (`(01)...(17)...`) wins outright when at least one
/// `(NN)` group is present; otherwise the compact encoding is walked left
/// to right. Never fails: unknown structure yields an empty or partial map.
pub fn decode(raw: &str) -> AiMap {
    let input: Vec<char> = normalize(raw)
        .chars()
        .map(|c| if is_group_separator(c) { GROUP_SEPARATOR } else { c })
        .collect();

    let fields = decode_bracketed(&input);
    if !fields.is_empty() {
        return fields;
    }
    decode_compact(&input)
}

fn is_group_separator(c: char) -> bool {
    // some keyboard-wedge scanners send FNC1 as U+241D (SYMBOL FOR GROUP SEPARATOR)
    c == GROUP_SEPARATOR || c == '\u{241d}'
}

fn decode_bracketed(input: &[char]) -> AiMap {
    let mut fields = AiMap::new();
    let mut i = 0;
    while i < input.len() {
        let is_ai = input[i] == '('
            && i + 3 < input.len()
            && input[i + 1].is_ascii_digit()
            && input[i + 2].is_ascii_digit()
            && input[i + 3] == ')';
        if !is_ai {
            i += 1;
            continue;
        }

        let key: String = input[i + 1..i + 3].iter().collect();
        let start = i + 4;
        let end = input[start..]
            .iter()
            .position(|&c| c == '(')
            .map_or(input.len(), |offset| start + offset);
        let value: String = input[start..end].iter().collect();
        fields.insert(key, value.trim().to_string());
        i = end;
    }
    fields
}

fn decode_compact(input: &[char]) -> AiMap {
    let mut fields = AiMap::new();
    let mut cursor = 0;

    if input.len() >= 16 && input[0] == '0' && input[1] == '1' {
        fields.insert(ai::GTIN.to_string(), input[2..16].iter().collect());
        cursor = 16;
    }

    while input.len() - cursor >= 2 {
        let key: String = input[cursor..cursor + 2].iter().collect();
        cursor += 2;

        match key.as_str() {
            ai::EXPIRY => {
                // fixed length; a short tail is kept and rejected later
                let end = (cursor + 6).min(input.len());
                fields.insert(key.clone(), input[cursor..end].iter().collect());
                cursor = end;
            }
            ai::BATCH | ai::SERIAL => {
                let rest = &input[cursor..];
                match rest.iter().position(|&c| c == GROUP_SEPARATOR) {
                    Some(stop) => {
                        fields.insert(key.clone(), rest[..stop].iter().collect());
                        cursor += stop + 1;
                    }
                    None => {
                        fields.insert(key.clone(), rest.iter().collect());
                        break;
                    }
                }
            }
            _ => break,
        }
    }
    fields
}

/// Returns true when the payload looks like a GS1 element string rather
/// than a plain EAN/UPC symbol.
pub fn looks_like_gs1(code: &str) -> bool {
    if code.contains('(') {
        return true;
    }
    let bytes = code.as_bytes();
    bytes.len() >= 16 && bytes.starts_with(b"01") && bytes[2..16].iter().all(u8::is_ascii_digit)
}

pub fn parse(raw: &str) -> ParsedBarcode {
    let mut result = ParsedBarcode::empty(raw);
    if raw.is_empty() {
        return result;
    }

    let code = normalize(raw);

    if !looks_like_gs1(&code) {
        let digits = digits_only(&code);
        if (8..=14).contains(&digits.len()) {
            result.gtin = pad_gtin(&digits);
        }
        return result;
    }

    result.is_gs1 = true;
    let fields = decode(&code);

    if let Some(gtin) = fields.get(ai::GTIN)
        && is_digits(gtin, 14)
    {
        result.gtin = gtin.clone();
    }

    if let Some(yymmdd) = fields.get(ai::EXPIRY)
        && let Some(expiry) = interpret_expiry(yymmdd)
    {
        result.expiry = yymmdd.clone();
        result.expiry_iso = expiry.iso;
        result.expiry_display = expiry.display;
    }

    if let Some(batch) = fields.get(ai::BATCH) {
        result.batch = sanitize_code(batch);
    }

    if let Some(serial) = fields.get(ai::SERIAL) {
        result.serial = sanitize_code(serial);
    }

    result
}

pub struct ExpiryDate {
    pub iso: String,
    pub display: String,
}

/// Resolves a GS1 YYMMDD value. Years are always 20YY; day `00` means the
/// last day of the month.
pub fn interpret_expiry(yymmdd: &str) -> Option<ExpiryDate> {
    if !is_digits(yymmdd, 6) {
        return None;
    }
    let yy: i32 = yymmdd[0..2].parse().ok()?;
    let mm: u32 = yymmdd[2..4].parse().ok()?;
    let mut dd: u32 = yymmdd[4..6].parse().ok()?;

    let year = 2000 + yy;
    if dd == 0 {
        dd = end_of_month_day(year, mm)?;
    }

    Some(ExpiryDate {
        iso: format!("{:04}-{:02}-{:02}", year, mm, dd),
        display: format!("{:02}/{:02}/{:04}", dd, mm, year),
    })
}

/// Last day of `month`, wrapping months outside 1-12 into the
/// neighbouring years (month 0 is December of the previous year).
fn end_of_month_day(year: i32, month: u32) -> Option<u32> {
    let index = year * 12 + month as i32 - 1;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    last_day_of_month(index.div_euclid(12), month)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(last.day())
}

/// Keeps `[A-Za-z0-9_-]` and caps the result at 20 characters.
pub fn sanitize_code(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_CODE_LEN)
        .collect()
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gs() -> String {
        GROUP_SEPARATOR.to_string()
    }

    #[test]
    fn normalize_strips_scanner_noise() {
        assert_eq!(normalize("\u{FEFF} 0101234\r\n"), "0101234");
        assert_eq!(normalize("01\t234"), "01234");
    }

    #[test]
    fn decodes_bracketed_form() {
        let fields = decode("(01)00012345678905(17)251231(10) LOT42 ");
        assert_eq!(fields.get("01").map(String::as_str), Some("00012345678905"));
        assert_eq!(fields.get("17").map(String::as_str), Some("251231"));
        assert_eq!(fields.get("10").map(String::as_str), Some("LOT42"));
    }

    #[test]
    fn bracketed_last_occurrence_wins() {
        let fields = decode("(10)FIRST(10)SECOND");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["10"], "SECOND");
    }

    #[test]
    fn bracketed_form_keeps_unknown_ais() {
        let fields = decode("(01)00012345678905(99)ABC");
        assert_eq!(fields["99"], "ABC");
    }

    #[test]
    fn decodes_compact_form_with_separators() {
        let raw = format!("010001234567890517251231{}LOT42{}21SER9", "10", gs());
        let fields = decode(&raw);
        assert_eq!(fields["01"], "00012345678905");
        assert_eq!(fields["17"], "251231");
        assert_eq!(fields["10"], "LOT42");
        assert_eq!(fields["21"], "SER9");
    }

    #[test]
    fn variable_field_without_separator_is_terminal() {
        let fields = decode("010001234567890510LOT4217251231");
        assert_eq!(fields["10"], "LOT4217251231");
        assert!(!fields.contains_key("17"));
    }

    #[test]
    fn unknown_ai_halts_compact_decoding() {
        let fields = decode("010001234567890517251231991234510LOT");
        assert_eq!(fields["01"], "00012345678905");
        assert_eq!(fields["17"], "251231");
        assert!(!fields.contains_key("10"));
        assert!(!fields.contains_key("99"));
    }

    #[test]
    fn short_expiry_is_decoded_but_rejected() {
        let fields = decode("01000123456789051725");
        assert_eq!(fields["17"], "25");

        let parsed = parse("01000123456789051725");
        assert!(parsed.is_gs1);
        assert_eq!(parsed.gtin, "00012345678905");
        assert!(parsed.expiry.is_empty());
        assert!(parsed.expiry_iso.is_empty());
    }

    #[test]
    fn stray_parenthesis_skips_compact_decoding() {
        assert!(decode("0100012345678905(17251231").is_empty());
        let parsed = parse("0100012345678905(17251231");
        assert!(parsed.is_gs1);
        assert!(parsed.gtin.is_empty());
    }

    #[test]
    fn bracketed_and_compact_forms_agree() {
        let bracketed = parse("(01)00012345678905(17)251231(10)LOT42");
        let compact = parse(&format!("01000123456789051725123110LOT42{}", gs()));
        for parsed in [&bracketed, &compact] {
            assert_eq!(parsed.gtin, "00012345678905");
            assert_eq!(parsed.expiry_iso, "2025-12-31");
            assert_eq!(parsed.batch, "LOT42");
            assert!(parsed.is_gs1);
        }
        assert_eq!(bracketed.expiry_display, compact.expiry_display);
    }

    #[test]
    fn day_zero_means_end_of_month() {
        assert_eq!(parse("(17)251200").expiry_iso, "2025-12-31");
        assert_eq!(parse("(17)250200").expiry_iso, "2025-02-28");
        assert_eq!(parse("(17)240200").expiry_iso, "2024-02-29");
        assert_eq!(parse("(17)240200").expiry_display, "29/02/2024");
        assert_eq!(parse("(17)240200").expiry, "240200");
    }

    #[test]
    fn expiry_with_out_of_range_month_keeps_the_digits() {
        let parsed = parse("(01)00012345678905(17)251315");
        assert_eq!(parsed.gtin, "00012345678905");
        assert_eq!(parsed.expiry, "251315");
        assert_eq!(parsed.expiry_iso, "2025-13-15");
        assert_eq!(parsed.expiry_display, "15/13/2025");

        let parsed = parse("(17)250015");
        assert_eq!(parsed.expiry, "250015");
        assert_eq!(parsed.expiry_iso, "2025-00-15");
    }

    #[test]
    fn day_zero_wraps_out_of_range_months() {
        // month 00 resolves to December of the year before, month 13 to January after
        assert_eq!(parse("(17)250000").expiry_iso, "2025-00-31");
        assert_eq!(parse("(17)251300").expiry_iso, "2025-13-31");
        assert_eq!(parse("(17)251400").expiry_iso, "2025-14-28");
        assert_eq!(end_of_month_day(2024, 14), Some(28));
        assert_eq!(end_of_month_day(2023, 14), Some(29));
    }

    #[test]
    fn compact_form_accepts_the_printable_gs_symbol() {
        let raw = "01000123456789051725123110LOT42\u{241d}21SER9";
        let fields = decode(raw);
        assert_eq!(fields["10"], "LOT42");
        assert_eq!(fields["21"], "SER9");
        assert_eq!(parse(raw).batch, "LOT42");
    }

    #[test]
    fn batch_and_serial_are_sanitized_and_capped() {
        let parsed = parse("(10)LOT#42!(21)S/N 0001-A_b");
        assert_eq!(parsed.batch, "LOT42");
        assert_eq!(parsed.serial, "SN0001-A_b");

        let long = "A".repeat(30);
        let parsed = parse(&format!("(10){long}"));
        assert_eq!(parsed.batch.len(), 20);
    }

    #[test]
    fn non_numeric_gtin_is_ignored() {
        let parsed = parse("(01)0001234567890X(10)LOT");
        assert!(parsed.gtin.is_empty());
        assert_eq!(parsed.batch, "LOT");
    }

    #[test]
    fn plain_barcode_falls_back_to_padded_gtin() {
        let parsed = parse("5012345678900");
        assert!(!parsed.is_gs1);
        assert_eq!(parsed.gtin, "05012345678900");
        assert!(parsed.expiry.is_empty());
        assert!(parsed.batch.is_empty());
        assert_eq!(parsed.qty, 1);
    }

    #[test]
    fn plain_barcode_outside_length_range_has_no_gtin() {
        assert!(parse("1234567").gtin.is_empty());
        assert!(parse("123456789012345").gtin.is_empty());
        assert_eq!(parse("9780-1234-56789").gtin, "09780123456789");
    }

    #[test]
    fn empty_input_yields_default_record() {
        let parsed = parse("");
        assert_eq!(parsed, ParsedBarcode::empty(""));
        assert_eq!(parsed.qty, 1);
    }

    #[test]
    fn raw_keeps_the_caller_input() {
        let parsed = parse(" 5012345678900\n");
        assert_eq!(parsed.raw, " 5012345678900\n");
        assert_eq!(parsed.gtin, "05012345678900");
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(parse("(01)00012345678905(17)251231")).expect("json");
        assert_eq!(json["expiryISO"], "2025-12-31");
        assert_eq!(json["isGS1"], true);
        assert_eq!(json["expiryDisplay"], "31/12/2025");
    }

    #[test]
    fn last_day_handles_december_rollover() {
        assert_eq!(last_day_of_month(2025, 12), Some(31));
        assert_eq!(last_day_of_month(2025, 4), Some(30));
        assert_eq!(last_day_of_month(2025, 13), None);
    }
}
