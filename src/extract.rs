//! Value extraction from broadcast payloads.
//!
//! The sensor firmware prints decorated text (`Turbidity: 641`) but a bare
//! number is accepted too, which is handy when feeding the relay by hand.
//! Extraction never fails loudly: anything unrecognised is simply no value.

use regex::Regex;
use std::sync::OnceLock;

static LABELLED: OnceLock<Regex> = OnceLock::new();

// `\d` would also take non-ascii digits, which then fail to parse
fn labelled_pattern() -> &'static Regex {
    LABELLED.get_or_init(|| Regex::new(r"(?i)turbidity:\s*([0-9]+)").expect("static pattern compiles"))
}

/// Pull a reading out of a payload.
///
/// Tries the labelled form first, anywhere in the text and in any case, then
/// falls back to a leading integer. Returns `None` for everything else.
pub fn extract_value(payload: &str) -> Option<f64> {
    if let Some(digits) = labelled_pattern().captures(payload).and_then(|c| c.get(1)) {
        return digits.as_str().parse::<f64>().ok();
    }
    parse_leading_integer(payload)
}

/// Leading-integer parse: optional whitespace and sign, then digits.
/// Whatever follows the digit run is ignored, so `"12.7"` reads as 12.
fn parse_leading_integer(payload: &str) -> Option<f64> {
    let text = payload.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let end = rest.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }

    let magnitude = rest[..end].parse::<f64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
