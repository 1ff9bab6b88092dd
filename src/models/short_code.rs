use once_cell::sync::Lazy;
use regex::Regex;

/// Display prefix for customer-facing order references.
pub const SHORT_CODE_PREFIX: &str = "DJ-";

static SHORT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^DJ-\d{4}$").expect("short code pattern is valid"));

/// Derives the human-friendly short code for an order id: `DJ-` followed
/// by the id modulo 10000, zero-padded to four digits. The code cycles
/// every 10,000 orders and is only disambiguating within a recent
/// window; the numeric id stays the unique key.
pub fn generate_short_code(order_id: i64) -> String {
    format!("{}{:04}", SHORT_CODE_PREFIX, order_id.rem_euclid(10_000))
}

/// Whether `candidate` is a well-formed short code. Case-sensitive:
/// `dj-4567` is not a short code.
pub fn is_valid_short_code(candidate: &str) -> bool {
    SHORT_CODE_RE.is_match(candidate)
}

/// Recovers the numeric suffix from a short code. The full order id is
/// not recoverable from the code alone.
pub fn short_code_suffix(candidate: &str) -> Option<u16> {
    if !is_valid_short_code(candidate) {
        return None;
    }
    candidate[SHORT_CODE_PREFIX.len()..].parse().ok()
}
