//! Limit extraction patterns.
//!
//! A `LimitPattern` ties a named electrical limit (e.g. `Vds_max`) to the
//! label phrases a datasheet uses for it and the unit the value is printed
//! in. Matching is line-oriented: a label followed, within a bounded window
//! on the same line, by a numeric token with an optional SI prefix and the
//! expected unit.

use serde::{Deserialize, Serialize};

use crate::units;

/// Default search window (in characters) after a label match.
pub const DEFAULT_WINDOW: usize = 80;

/// A single named extraction rule. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitPattern {
    /// Limit identifier, e.g. "Vds_max".
    pub name: String,
    /// Label phrases that introduce the value ("Vds", "Drain-Source Voltage").
    pub labels: Vec<String>,
    /// Canonical unit symbol the value is printed in ("V", "A", "W").
    pub unit: String,
    /// Human-readable description.
    pub description: String,
    /// Override priority when two patterns produce the same name: the
    /// pattern with the greater priority wins.
    pub priority: u32,
    /// Search window after the label, in characters.
    pub window: usize,
}

impl LimitPattern {
    pub fn new(
        name: impl Into<String>,
        labels: Vec<&str>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            labels: labels.into_iter().map(String::from).collect(),
            unit: unit.into(),
            description: description.into(),
            priority: 0,
            window: DEFAULT_WINDOW,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Extract the first matching value from `text`, normalized to base units.
    ///
    /// First match wins: specification tables list the authoritative value
    /// first. A label whose trailing number is malformed is not a match and
    /// scanning continues.
    pub fn extract(&self, text: &str) -> Option<f64> {
        for line in text.lines() {
            let chars: Vec<char> = line.chars().collect();
            for label in &self.labels {
                let needle: Vec<char> = label.chars().collect();
                let mut from = 0;
                while let Some(pos) = find_ignore_case(&chars, from, &needle) {
                    let after = pos + needle.len();
                    let end = (after + self.window).min(chars.len());
                    if let Some(value) = scan_value(&chars[after..end], &self.unit) {
                        return Some(value);
                    }
                    from = after;
                }
            }
        }
        None
    }
}

/// Case-insensitive (ASCII) substring search over a char slice.
fn find_ignore_case(haystack: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    let last = haystack.len() - needle.len();
    for start in from..=last {
        if haystack[start..start + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
        {
            return Some(start);
        }
    }
    None
}

/// Scan a window for the first numeric token followed by an optional SI
/// prefix and the expected unit. Returns the normalized value.
fn scan_value(window: &[char], unit: &str) -> Option<f64> {
    let unit_chars: Vec<char> = unit.chars().collect();
    let mut i = 0;
    while i < window.len() {
        if !window[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        // Collect the numeric literal.
        let start = i;
        while i < window.len() && (window[i].is_ascii_digit() || window[i] == '.') {
            i += 1;
        }
        let literal: String = window[start..i].iter().collect();

        // Skip separating spaces.
        let mut j = i;
        while j < window.len() && window[j] == ' ' {
            j += 1;
        }

        // Optional SI prefix directly before the unit.
        let mut prefix = String::new();
        if j < window.len() && matches_unit(&window[j + 1..], &unit_chars) {
            if units::si_prefix_scale(&window[j].to_string()).is_some()
                && !window[j].eq_ignore_ascii_case(&unit_chars[0])
            {
                prefix.push(window[j]);
                j += 1;
            }
        }

        if matches_unit(&window[j..], &unit_chars) {
            match units::normalize(&literal, &prefix) {
                Ok(v) => return Some(v),
                // Malformed literal ("..12"): not a match, keep scanning.
                Err(_) => {}
            }
        }
        // No unit here; keep scanning the rest of the window.
    }
    None
}

/// The unit must appear at this position and not be glued to more letters
/// (so "V" does not match inside "VGS").
fn matches_unit(window: &[char], unit: &[char]) -> bool {
    if window.len() < unit.len() {
        return false;
    }
    let matched = window[..unit.len()]
        .iter()
        .zip(unit)
        .all(|(a, b)| a.eq_ignore_ascii_case(b));
    if !matched {
        return false;
    }
    match window.get(unit.len()) {
        Some(c) if c.is_ascii_alphanumeric() => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vds_pattern() -> LimitPattern {
        LimitPattern::new(
            "Vds_max",
            vec!["Vds", "Drain-Source Voltage"],
            "V",
            "Maximum drain-source voltage",
        )
    }

    #[test]
    fn test_extract_simple() {
        let p = vds_pattern();
        assert_eq!(p.extract("Vds(max) 55V"), Some(55.0));
        assert_eq!(p.extract("Drain-Source Voltage ........ 100 V"), Some(100.0));
    }

    #[test]
    fn test_extract_case_insensitive() {
        let p = vds_pattern();
        assert_eq!(p.extract("VDS 30 V"), Some(30.0));
    }

    #[test]
    fn test_extract_first_match_wins() {
        let p = vds_pattern();
        let text = "Vds max 55V\nVds typical 40V";
        assert_eq!(p.extract(text), Some(55.0));
    }

    #[test]
    fn test_extract_si_prefix() {
        let p = LimitPattern::new("Ib_max", vec!["Ib"], "A", "Maximum base current");
        assert_eq!(p.extract("Ib(max) 500 mA"), Some(0.5));
    }

    #[test]
    fn test_extract_uppercase_prefix_before_unit() {
        let p = LimitPattern::new("Vbr", vec!["Breakdown"], "V", "Breakdown voltage");
        assert_eq!(p.extract("Breakdown rated 2 MV"), Some(2e6));
    }

    #[test]
    fn test_extract_no_match() {
        let p = vds_pattern();
        assert_eq!(p.extract("no limits mentioned here"), None);
    }

    #[test]
    fn test_extract_wrong_unit_is_no_match() {
        let p = vds_pattern();
        assert_eq!(p.extract("Vds rise time 10 ns"), None);
    }

    #[test]
    fn test_extract_window_bounded_to_line() {
        let p = vds_pattern();
        // Value on the next line: not within the same-line window.
        assert_eq!(p.extract("Vds maximum rating\n55 V"), None);
    }

    #[test]
    fn test_malformed_number_continues() {
        let p = vds_pattern();
        // First candidate is glued to letters, the real value follows.
        assert_eq!(p.extract("Vds see note3, limit 55 V"), Some(55.0));
    }
}
