pub const GTIN_LEN: usize = 14;

pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Left-pads a digit string with zeros to GTIN-14. Longer input is returned as is.
pub fn pad_gtin(digits: &str) -> String {
    format!("{:0>width$}", digits, width = GTIN_LEN)
}

/// Digits of `code` as a GTIN-14 when there are at least 8 of them.
pub fn gtin_from_digits(code: &str) -> Option<String> {
    let digits = digits_only(code);
    if digits.len() < 8 {
        return None;
    }
    Some(pad_gtin(&digits))
}

pub fn last_n(value: &str, n: usize) -> &str {
    let start = value.len().saturating_sub(n);
    &value[start..]
}
