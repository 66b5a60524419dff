//! Phone number canonicalization.
//!
//! Leads are keyed by the canonical `+1XXXXXXXXXX` form, so every number
//! crossing a boundary (stream metadata, dial requests, CSV import) goes
//! through [`canonicalize_phone`] first.

/// Canonicalize a phone number to `+1XXXXXXXXXX`.
///
/// Accepts any formatting (dashes, spaces, parens, a leading `+`); only the
/// digits matter. A 10-digit number is assumed to be NANP and gets a `1`
/// country code; an 11-digit number must already start with `1`. Any other
/// digit count has no canonical form and returns `None`.
pub fn canonicalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => Some(format!("+1{digits}")),
        11 if digits.starts_with('1') => Some(format!("+{digits}")),
        _ => None,
    }
}
