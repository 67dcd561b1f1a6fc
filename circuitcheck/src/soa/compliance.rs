//! SOA compliance checking.
//!
//! Compares extracted datasheet limits against declared operating
//! conditions, applying a configurable safety margin.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::extractor::ExtractedLimits;

/// Default safety margin: operating at 80% of a limit is still "ok".
pub const DEFAULT_SAFETY_MARGIN: f64 = 0.8;

/// Per-channel verdict.
///
/// Boundary convention (documented and tested): ratio equal to the safety
/// margin is `Ok`; ratio exactly 1.0 is `Warning`; only ratios strictly
/// above 1.0 are `Violation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Ok,
    Warning,
    Violation,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Ok => write!(f, "ok"),
            Verdict::Warning => write!(f, "warning"),
            Verdict::Violation => write!(f, "violation"),
        }
    }
}

/// One channel's compliance result. Produced fresh per check call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEntry {
    /// Channel name, e.g. "Vds".
    pub channel: String,
    /// Declared operating value.
    pub measured: f64,
    /// Datasheet limit.
    pub limit: f64,
    /// measured / limit.
    pub ratio: f64,
    pub verdict: Verdict,
}

impl ComplianceEntry {
    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        match self.verdict {
            Verdict::Ok => format!("{}={} OK (limit {})", self.channel, self.measured, self.limit),
            Verdict::Warning => format!(
                "{}={} close to limit {} (safety margin)",
                self.channel, self.measured, self.limit
            ),
            Verdict::Violation => format!(
                "{}={} > {} (limit exceeded)",
                self.channel, self.measured, self.limit
            ),
        }
    }
}

/// Checks operating conditions against extracted limits.
#[derive(Debug, Clone)]
pub struct ComplianceChecker {
    safety_margin: f64,
}

impl ComplianceChecker {
    pub fn new(safety_margin: f64) -> Self {
        Self { safety_margin }
    }

    pub fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    /// Check every channel present in both the limit set and the operating
    /// conditions.
    ///
    /// The operating key for a limit is the limit name with its `_max`
    /// suffix stripped ("Vds_max" is checked against "Vds"); an exact-name
    /// key is also accepted. Keys present on only one side produce no
    /// verdict. Zero or non-finite limits cannot be evaluated and are
    /// skipped. Output order follows the limit set's key order.
    pub fn check_compliance(
        &self,
        limits: &ExtractedLimits,
        operating: &BTreeMap<String, f64>,
    ) -> Vec<ComplianceEntry> {
        let mut entries = Vec::new();

        for (limit_name, &limit) in limits {
            let channel = limit_name.strip_suffix("_max").unwrap_or(limit_name);
            let measured = operating
                .get(channel)
                .or_else(|| operating.get(limit_name.as_str()))
                .copied();
            let Some(measured) = measured else {
                continue;
            };

            if !(limit.is_finite() && limit != 0.0) {
                tracing::debug!(limit_name, limit, "cannot evaluate against zero or non-finite limit");
                continue;
            }

            let ratio = measured / limit;
            let verdict = if ratio <= self.safety_margin {
                Verdict::Ok
            } else if ratio <= 1.0 {
                Verdict::Warning
            } else {
                Verdict::Violation
            };

            entries.push(ComplianceEntry {
                channel: channel.to_string(),
                measured,
                limit,
                ratio,
                verdict,
            });
        }

        entries
    }
}

impl Default for ComplianceChecker {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_MARGIN)
    }
}
