//! Token coercion.
//!
//! Raw tokens coming out of the dump tokenizer are plain strings. A bare SQL
//! `NULL` and a quoted `'NULL'` both arrive as the text `NULL`, so every
//! coercion treats `""`, `"NULL"` and `"null"` as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Year prefixes the legacy system wrote for "no date set".
const SENTINEL_DATE_PREFIXES: [&str; 2] = ["1976", "0000"];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// True for tokens that stand for SQL NULL.
pub fn is_null_token(token: &str) -> bool {
    token.is_empty() || token == "NULL" || token == "null"
}

/// Token as an owned string, `None` for null tokens.
pub fn to_str(token: &str) -> Option<String> {
    if is_null_token(token) {
        None
    } else {
        Some(token.to_string())
    }
}

/// Leading base-10 integer of the token.
///
/// Accepts what `parseInt` accepts: optional leading whitespace and sign, then
/// digits; anything after the digits is ignored (`"12abc"` → 12, `"3.9"` → 3).
/// Values outside `i32` are `None`.
pub fn to_int(token: &str) -> Option<i32> {
    if is_null_token(token) {
        return None;
    }
    let s = token.trim_start();
    let unsigned = s.strip_prefix(|c| c == '+' || c == '-').unwrap_or(s);
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let sign_len = s.len() - unsigned.len();
    s[..sign_len + digits].parse().ok()
}

/// Longest leading decimal number of the token (`parseFloat` semantics).
pub fn to_float(token: &str) -> Option<f64> {
    if is_null_token(token) {
        return None;
    }
    let s = token.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Calendar date-time of the token.
///
/// `None` for null tokens, for the legacy placeholder years (`1976-…`,
/// `0000-…`) whatever follows them, and for text that is not a date.
/// Date-only values resolve to midnight; RFC 3339 values with an offset are
/// converted to UTC.
pub fn to_date(token: &str) -> Option<NaiveDateTime> {
    if is_null_token(token) {
        return None;
    }
    if SENTINEL_DATE_PREFIXES.iter().any(|p| token.starts_with(p)) {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(token, format) {
            return Some(value);
        }
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(token) {
        return Some(value.naive_utc());
    }
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
