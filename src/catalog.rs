use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::types::{MasterProduct, MatchType, ProductMatch};
use crate::utils::{digits_only, last_n, pad_gtin};

const DELIMITERS: [char; 4] = ['\t', ',', ';', '|'];
const BARCODE_COLUMNS: [&str; 5] = ["barcode", "gtin", "ean", "upc", "code"];
const NAME_COLUMNS: [&str; 5] = [
    "name",
    "description",
    "product",
    "productname",
    "item description",
];
const RMS_COLUMNS: [&str; 4] = ["rms", "rmscode", "rms code", "rms_code"];

/// In-memory view of the master list used to name scanned products.
///
/// Owned by whoever scans; rebuild it from the database after imports.
#[derive(Debug, Default, Clone)]
pub struct CatalogIndex {
    by_code: HashMap<String, MasterProduct>,
    by_last8: HashMap<String, MasterProduct>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products<I>(products: I) -> Self
    where
        I: IntoIterator<Item = MasterProduct>,
    {
        let mut index = Self::new();
        for product in products {
            index.insert(product);
        }
        index
    }

    pub fn insert(&mut self, product: MasterProduct) {
        let digits = digits_only(&product.barcode);
        if digits.is_empty() {
            return;
        }
        if digits.len() >= 8 {
            self.by_last8
                .entry(last_n(&digits, 8).to_string())
                .or_insert_with(|| product.clone());
        }
        self.by_code.insert(digits, product);
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Exact GTIN-14 first, then the 13-digit form, then the last eight digits.
    pub fn match_gtin(&self, gtin: &str) -> ProductMatch {
        let digits = digits_only(gtin);
        if digits.is_empty() {
            return ProductMatch::none();
        }
        let gtin14 = pad_gtin(&digits);

        if let Some(product) = self.by_code.get(&gtin14) {
            return found(product, MatchType::Exact);
        }

        if gtin14.len() == 14 && gtin14.starts_with('0') {
            let gtin13 = &gtin14[1..];
            if let Some(product) = self.by_code.get(gtin13) {
                return found(product, MatchType::Gtin13);
            }
        }

        if gtin14.len() >= 8
            && let Some(product) = self.by_last8.get(last_n(&gtin14, 8))
        {
            return found(product, MatchType::Last8);
        }

        ProductMatch::none()
    }
}

fn found(product: &MasterProduct, match_type: MatchType) -> ProductMatch {
    ProductMatch {
        name: product.name.clone(),
        rms: product.rms.clone(),
        match_type,
    }
}

/// Picks whichever candidate delimiter splits the header into the most cells.
pub fn detect_delimiter(header: &str) -> char {
    let mut best = ',';
    let mut max_count = 0;
    for delim in DELIMITERS {
        let count = header.split(delim).count();
        if count > max_count {
            max_count = count;
            best = delim;
        }
    }
    best
}

pub fn parse_delimited_line(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
            continue;
        }
        if ch == delimiter && !in_quotes {
            cells.push(clean_cell(&current));
            current.clear();
            continue;
        }
        current.push(ch);
    }
    cells.push(clean_cell(&current));
    cells
}

fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    let cell = cell.strip_prefix(['\'', '"']).unwrap_or(cell);
    let cell = cell.strip_suffix(['\'', '"']).unwrap_or(cell);
    cell.trim().to_string()
}

fn cell(row: &[String], idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
}

fn find_column(cols: &[String], names: &[&str]) -> Option<usize> {
    cols.iter().position(|c| names.contains(&c.as_str()))
}

/// Parses a master product export (CSV, TSV, `;` or `|` separated).
pub fn parse_master_file(text: &str) -> Result<Vec<MasterProduct>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(AppError::InvalidMasterFile(
            "expected a header and at least one row".to_string(),
        ));
    }

    let delimiter = detect_delimiter(lines[0]);
    let cols = parse_delimited_line(&lines[0].to_lowercase(), delimiter);

    let barcode_idx = find_column(&cols, &BARCODE_COLUMNS).ok_or_else(|| {
        AppError::InvalidMasterFile(
            "no barcode column found (need: barcode, gtin, ean, upc or code)".to_string(),
        )
    })?;
    let name_idx = find_column(&cols, &NAME_COLUMNS);
    let rms_idx = find_column(&cols, &RMS_COLUMNS);

    let mut items = Vec::new();
    for line in &lines[1..] {
        let row = parse_delimited_line(line, delimiter);
        let barcode: String = cell(&row, Some(barcode_idx))
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if barcode.chars().count() < 8 {
            continue;
        }
        items.push(MasterProduct {
            barcode,
            name: cell(&row, name_idx),
            rms: cell(&row, rms_idx),
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(barcode: &str, name: &str) -> MasterProduct {
        MasterProduct {
            barcode: barcode.to_string(),
            name: name.to_string(),
            rms: format!("RMS-{name}"),
        }
    }

    #[test]
    fn detects_the_busiest_delimiter() {
        assert_eq!(detect_delimiter("barcode\tname\trms"), '\t');
        assert_eq!(detect_delimiter("barcode;name;rms"), ';');
        assert_eq!(detect_delimiter("barcode|name"), '|');
        assert_eq!(detect_delimiter("barcode,name"), ',');
        assert_eq!(detect_delimiter("barcode"), '\t');
    }

    #[test]
    fn splits_quoted_cells() {
        let cells = parse_delimited_line(r#"123,"Paracetamol, 500mg","a ""b"" c""#, ',');
        assert_eq!(cells, vec!["123", "Paracetamol, 500mg", r#"a "b" c"#]);
    }

    #[test]
    fn strips_stray_quotes_and_whitespace() {
        let cells = parse_delimited_line(" '0123' ; name ", ';');
        assert_eq!(cells, vec!["0123", "name"]);
    }

    #[test]
    fn parses_master_file_with_aliases() {
        let text = "GTIN;Item Description;RMS Code\r\n\
                    5012345678900;Ibuprofen 200mg;R-1\r\n\
                    \r\n\
                    1234;Too short;R-2\n\
                    0001 2345 6789 05;Aspirin;R-3\n";
        let items = parse_master_file(text).expect("parse");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Ibuprofen 200mg");
        assert_eq!(items[0].rms, "R-1");
        assert_eq!(items[1].barcode, "00012345678905");
    }

    #[test]
    fn master_file_without_barcode_column_is_rejected() {
        let err = parse_master_file("name,rms\nfoo,bar").unwrap_err();
        assert!(matches!(err, AppError::InvalidMasterFile(_)));
        let err = parse_master_file("barcode,name").unwrap_err();
        assert!(matches!(err, AppError::InvalidMasterFile(_)));
    }

    #[test]
    fn missing_optional_columns_default_to_empty() {
        let items = parse_master_file("ean\n5012345678900").expect("parse");
        assert_eq!(items[0].name, "");
        assert_eq!(items[0].rms, "");
    }

    #[test]
    fn matches_exact_then_gtin13_then_last8() {
        let index = CatalogIndex::from_products(vec![
            product("05012345678900", "exact"),
            product("4006381333931", "thirteen"),
            product("99912345", "eight"),
        ]);

        let m = index.match_gtin("05012345678900");
        assert_eq!((m.name.as_str(), m.match_type), ("exact", MatchType::Exact));

        let m = index.match_gtin("04006381333931");
        assert_eq!(m.match_type, MatchType::Gtin13);
        assert_eq!(m.name, "thirteen");
        assert_eq!(m.rms, "RMS-thirteen");

        let m = index.match_gtin("12300099912345");
        assert_eq!((m.name.as_str(), m.match_type), ("eight", MatchType::Last8));

        assert_eq!(index.match_gtin("11111111111111").match_type, MatchType::None);
        assert!(!index.match_gtin("").is_found());
    }

    #[test]
    fn twelve_digit_upc_falls_back_to_last8() {
        let index = CatalogIndex::from_products(vec![product("012345678905", "upc")]);
        let m = index.match_gtin("00012345678905");
        assert_eq!(m.match_type, MatchType::Last8);
        assert_eq!(m.name, "upc");
    }

    #[test]
    fn first_product_keeps_the_last8_slot() {
        let index = CatalogIndex::from_products(vec![
            product("11112345678", "first"),
            product("22212345678", "second"),
        ]);
        assert_eq!(index.match_gtin("99912345678").name, "first");
        assert_eq!(index.len(), 2);
    }
}
