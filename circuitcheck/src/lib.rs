//! CircuitCheck - circuit safety analysis library
//!
//! This library extracts Safe Operating Area limits from component
//! datasheets, checks them against declared operating conditions, and runs
//! frequency-domain stability analysis over SPICE netlists.
//!
//! # Quick Start
//!
//! ```no_run
//! use circuitcheck::{AnalysisOptions, CircuitCheckCore};
//! use std::collections::BTreeMap;
//! use std::path::Path;
//!
//! let operating: BTreeMap<String, f64> =
//!     [("Vds".to_string(), 24.0), ("Id".to_string(), 5.0)].into();
//! let component = CircuitCheckCore::analyze_component(
//!     "Q1",
//!     "IRF540N",
//!     Path::new("irf540n.pdf"),
//!     &operating,
//!     &AnalysisOptions::default(),
//! ).unwrap();
//!
//! for entry in &component.compliance {
//!     println!("{}", entry.summary());
//! }
//! ```
//!
//! # Features
//!
//! - **SOA extraction**: Labeled limit patterns over datasheet text and PDFs
//! - **Compliance checking**: Margin-aware verdicts per electrical channel
//! - **SPICE parsing**: Element-level netlist model with connectivity
//! - **Stability analysis**: Crossover, phase and gain margins, grading
//! - **Part lookup**: Octopart/Mouser datasheet and model resolution

pub mod bom;
pub mod core;
pub mod parts;
pub mod report;
pub mod soa;
pub mod spice;
pub mod units;

// Re-export main types
pub use crate::core::{
    load_operating_conditions, AnalysisOptions, CircuitCheckCore, CircuitCheckError, Deadline,
    OperatingConditions,
};
pub use bom::{read_bom, BomRecord};
pub use report::{AnalysisReport, ComponentReport, StabilitySection};
pub use soa::{ComplianceChecker, ComplianceEntry, ExtractedLimits, LimitExtractor, LimitPattern, Verdict};
pub use spice::{
    FrequencySweepRunner, NetlistGraph, NetlistParser, StabilityAnalyzer, StabilityGrade,
    StabilityReport, SweepConfig, SweepOutcome,
};

/// Extract SOA limits from a text body (convenience wrapper).
pub fn extract_limits(text: &str) -> ExtractedLimits {
    LimitExtractor::new().extract_from_text(text)
}

/// Parse SPICE netlist text (convenience wrapper).
pub fn parse_netlist(content: &str) -> Result<NetlistGraph, CircuitCheckError> {
    NetlistParser::new()
        .parse_content(content)
        .map_err(Into::into)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        AnalysisOptions, AnalysisReport, CircuitCheckCore, CircuitCheckError, ComplianceChecker,
        ComplianceEntry, ExtractedLimits, LimitExtractor, NetlistParser, StabilityAnalyzer,
        StabilityGrade, SweepConfig, SweepOutcome, Verdict,
    };
}
