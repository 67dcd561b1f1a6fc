//! Safe Operating Area (SOA) analysis.
//!
//! Extracts named electrical limits from datasheet text via labeled numeric
//! patterns, sanity-checks the extracted set, and compares it against
//! declared operating conditions with a safety margin.
//!
//! ```text
//! datasheet text ──▶ LimitExtractor ──▶ ExtractedLimits ──▶ ComplianceChecker
//!                        │                                       │
//!                   LimitPattern set                    Vec<ComplianceEntry>
//! ```

pub mod builtin;
pub mod compliance;
pub mod extractor;
pub mod pattern;

// Re-exports for convenience
pub use builtin::{builtin_patterns, section_keywords};
pub use compliance::{ComplianceChecker, ComplianceEntry, Verdict, DEFAULT_SAFETY_MARGIN};
pub use extractor::{ExtractedLimits, LimitExtractor, SoaError, SoaExtraction};
pub use pattern::LimitPattern;
