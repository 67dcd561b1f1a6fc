//! Unit normalization for datasheet and SPICE numeric tokens.
//!
//! Two conventions live side by side: datasheet text uses case-sensitive SI
//! prefixes (m is milli, M is mega), while SPICE netlists use case-insensitive
//! suffixes where `meg` means 1e6 and `m` always means milli.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("Invalid numeric literal: {0}")]
    InvalidNumber(String),
}

/// Scale factor for a case-sensitive SI prefix, as printed in datasheets.
///
/// Returns `None` for prefixes we do not recognize; callers treat that as
/// "no scaling" because datasheet notation is inconsistent.
pub fn si_prefix_scale(prefix: &str) -> Option<f64> {
    match prefix {
        "" => Some(1.0),
        "p" => Some(1e-12),
        "n" => Some(1e-9),
        "u" | "µ" | "μ" => Some(1e-6),
        "m" => Some(1e-3),
        "k" => Some(1e3),
        "M" => Some(1e6),
        "G" => Some(1e9),
        _ => None,
    }
}

/// Normalize a numeric literal with an adjacent SI prefix to base units.
///
/// `normalize("4.7", "k")` and `normalize("4700", "")` yield the same value.
/// A non-numeric literal is an error; an unknown prefix is logged and treated
/// as no scaling.
pub fn normalize(literal: &str, prefix: &str) -> Result<f64, UnitError> {
    let value: f64 = literal
        .trim()
        .parse()
        .map_err(|_| UnitError::InvalidNumber(literal.to_string()))?;

    let scale = match si_prefix_scale(prefix) {
        Some(s) => s,
        None => {
            tracing::warn!(prefix, literal, "unknown SI prefix, applying no scaling");
            1.0
        }
    };

    Ok(value * scale)
}

/// Parse a SPICE-style value token ("10k", "100n", "1meg", "4.7uF", "10kohm")
/// into base units. Suffixes are case-insensitive per SPICE convention;
/// trailing unit text after the multiplier is ignored.
pub fn parse_spice_value(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let mut num = String::new();
    let mut rest = String::new();
    let mut in_suffix = false;
    for ch in token.chars() {
        if !in_suffix && (ch.is_ascii_digit() || ch == '.' || ch == '-' || ch == '+'
            || ch == 'e' || ch == 'E')
        {
            // Scientific notation: only accept e/E when followed by a digit or sign,
            // otherwise it starts a suffix ("1e3" vs "1nF").
            if (ch == 'e' || ch == 'E') && !num_has_exponent_slot(&num, token) {
                in_suffix = true;
                rest.push(ch);
                continue;
            }
            num.push(ch);
        } else {
            in_suffix = true;
            rest.push(ch);
        }
    }

    let value: f64 = num.parse().ok()?;
    let suffix = rest.to_lowercase();

    let scale = if suffix.starts_with("meg") {
        1e6
    } else if suffix.starts_with('t') {
        1e12
    } else if suffix.starts_with('g') {
        1e9
    } else if suffix.starts_with('k') {
        1e3
    } else if suffix.starts_with('m') {
        1e-3
    } else if suffix.starts_with('u') || suffix.starts_with('µ') || suffix.starts_with('μ') {
        1e-6
    } else if suffix.starts_with('n') {
        1e-9
    } else if suffix.starts_with('p') {
        1e-12
    } else if suffix.starts_with('f') {
        // SPICE reads f as femto, never Farads: "1f" is 1e-15.
        1e-15
    } else {
        1.0
    };

    Some(value * scale)
}

// "1e3" keeps the e inside the number only if what follows parses as an exponent.
fn num_has_exponent_slot(num_so_far: &str, token: &str) -> bool {
    if num_so_far.is_empty() || num_so_far.contains('e') || num_so_far.contains('E') {
        return false;
    }
    let consumed = num_so_far.len();
    let tail = &token[consumed + 1..];
    let mut chars = tail.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+') | Some('-') => chars.next().map(|c| c.is_ascii_digit()).unwrap_or(false),
        _ => false,
    }
}
