//! SOA limit extraction from datasheet documents.
//!
//! Applies a registered set of [`LimitPattern`]s to document text and unions
//! the results into one mapping. PDF extraction is best-effort: pages that
//! fail to decode are skipped, and a caller deadline turns the remainder of
//! the document into a partial result instead of an error.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use super::builtin;
use super::pattern::LimitPattern;
use crate::core::Deadline;

/// Extracted limit set: limit name to value in base units.
///
/// Absence of a key means "not found", never a placeholder zero. BTreeMap
/// keeps downstream iteration order deterministic.
pub type ExtractedLimits = BTreeMap<String, f64>;

#[derive(Debug, Error)]
pub enum SoaError {
    #[error("Document not found: {0}")]
    NotFound(std::path::PathBuf),
    #[error("Failed to open document: {0}")]
    Document(String),
}

/// Result of a document extraction, carrying the partial-result flag.
#[derive(Debug, Clone)]
pub struct SoaExtraction {
    pub limits: ExtractedLimits,
    /// True when a deadline expired before every page was scanned.
    pub incomplete: bool,
    pub note: Option<String>,
}

fn budget_note(incomplete: bool) -> Option<String> {
    incomplete.then(|| "extraction stopped early: time budget exhausted".to_string())
}

/// Applies an ordered set of limit patterns to documents.
pub struct LimitExtractor {
    patterns: Vec<LimitPattern>,
    section_keywords: Vec<String>,
}

impl LimitExtractor {
    /// Create an extractor with the built-in pattern set.
    pub fn new() -> Self {
        Self::with_patterns(builtin::builtin_patterns())
    }

    /// Create an extractor with a custom pattern set.
    ///
    /// Patterns are applied in ascending priority order; when two patterns
    /// produce the same limit name, the higher-priority result wins.
    pub fn with_patterns(mut patterns: Vec<LimitPattern>) -> Self {
        patterns.sort_by_key(|p| p.priority);
        Self {
            patterns,
            section_keywords: builtin::section_keywords()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Register an additional pattern.
    pub fn register(&mut self, pattern: LimitPattern) {
        self.patterns.push(pattern);
        self.patterns.sort_by_key(|p| p.priority);
    }

    pub fn patterns(&self) -> &[LimitPattern] {
        &self.patterns
    }

    /// Extract limits from a plain text body.
    ///
    /// Text with no pattern labels yields an empty mapping, never an error.
    pub fn extract_from_text(&self, text: &str) -> ExtractedLimits {
        self.extract_from_pages(&[text], None).limits
    }

    /// Extract limits from a sequence of page texts.
    ///
    /// Pages containing SOA section keywords are scanned first since the
    /// authoritative ratings table usually lives there. Scanning stops early
    /// once every registered pattern has produced a value.
    pub fn extract_from_texts(&self, pages: &[String]) -> ExtractedLimits {
        self.extract_from_pages(&self.prioritize(pages), None).limits
    }

    /// Extract limits from a document on disk.
    ///
    /// `.pdf` files are read page by page; `.txt` and `.md` files are read
    /// as plain text. A missing file is an error; everything past that is
    /// best-effort.
    pub fn extract_from_document(
        &self,
        path: &Path,
        deadline: Option<&Deadline>,
    ) -> Result<SoaExtraction, SoaError> {
        if !path.exists() {
            return Err(SoaError::NotFound(path.to_path_buf()));
        }
        match path.extension().and_then(|s| s.to_str()) {
            Some("txt") | Some("md") => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| SoaError::Document(e.to_string()))?;
                let mut extraction = self.extract_from_pages(&[text.as_str()], deadline);
                extraction.note = budget_note(extraction.incomplete);
                Ok(extraction)
            }
            _ => self.extract_from_pdf(path, deadline),
        }
    }

    /// Extract limits from a PDF datasheet.
    pub fn extract_from_pdf(
        &self,
        path: &Path,
        deadline: Option<&Deadline>,
    ) -> Result<SoaExtraction, SoaError> {
        if !path.exists() {
            return Err(SoaError::NotFound(path.to_path_buf()));
        }

        let doc = lopdf::Document::load(path)
            .map_err(|e| SoaError::Document(e.to_string()))?;

        let mut pages: Vec<String> = Vec::new();
        let mut incomplete = false;
        for (page_number, _) in doc.get_pages() {
            if deadline.map(Deadline::expired).unwrap_or(false) {
                tracing::warn!(path = %path.display(), page_number, "deadline expired during PDF extraction");
                incomplete = true;
                break;
            }
            match doc.extract_text(&[page_number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    // A page that fails to decode is skipped, not fatal.
                    tracing::warn!(path = %path.display(), page_number, error = %e, "skipping undecodable page");
                }
            }
        }

        // The same deadline also bounds the pattern scan over whatever
        // pages made it out of the document.
        let mut extraction = self.extract_from_pages(&self.prioritize(&pages), deadline);
        extraction.incomplete |= incomplete;
        extraction.note = budget_note(extraction.incomplete);
        Ok(extraction)
    }

    /// Sanity-check an extracted limit set.
    ///
    /// Returns human-readable warnings; advisory only, never blocking.
    pub fn validate(&self, limits: &ExtractedLimits) -> Vec<String> {
        let mut warnings = Vec::new();

        for param in ["Vds_max", "Vr_max", "Vce_max", "Vbe_max"] {
            if let Some(&value) = limits.get(param) {
                if value < 0.0 {
                    warnings.push(format!("Negative voltage for {}: {}V", param, value));
                } else if value > 1000.0 {
                    warnings.push(format!("Very high voltage for {}: {}V", param, value));
                }
            }
        }

        for param in ["Id_max", "If_max", "Ic_max", "Ib_max"] {
            if let Some(&value) = limits.get(param) {
                if value < 0.0 {
                    warnings.push(format!("Negative current for {}: {}A", param, value));
                } else if value > 100.0 {
                    warnings.push(format!("Very high current for {}: {}A", param, value));
                }
            }
        }

        if let Some(&pd) = limits.get("Pd_max") {
            if pd < 0.0 {
                warnings.push(format!("Negative power for Pd_max: {}W", pd));
            } else if pd > 1000.0 {
                warnings.push(format!("Very high power for Pd_max: {}W", pd));
            }
            // Power limit cannot exceed the voltage/current product.
            if let (Some(&v), Some(&i)) = (limits.get("Vds_max"), limits.get("Id_max")) {
                let product = v * i;
                if product > 0.0 && pd > product * 1.05 {
                    warnings.push(format!(
                        "Pd_max {}W exceeds Vds_max x Id_max = {}W; ratings look inconsistent",
                        pd, product
                    ));
                }
            }
        }

        warnings
    }

    fn has_section_keyword(&self, text: &str) -> bool {
        self.section_keywords.iter().any(|k| text.contains(k.as_str()))
    }

    /// Order pages so the ones carrying SOA section keywords come first.
    fn prioritize<'a>(&self, pages: &'a [String]) -> Vec<&'a str> {
        let (prioritized, rest): (Vec<&String>, Vec<&String>) = pages
            .iter()
            .partition(|text| self.has_section_keyword(text));
        prioritized
            .into_iter()
            .chain(rest)
            .map(String::as_str)
            .collect()
    }

    fn extract_from_pages(&self, pages: &[&str], deadline: Option<&Deadline>) -> SoaExtraction {
        let mut limits = ExtractedLimits::new();
        let mut incomplete = false;

        // Pattern-major: each pattern takes its first match in page order,
        // so a later page never overrides an earlier one. Name collisions
        // between patterns are resolved by ascending priority order, where
        // the later (higher-priority) insert wins.
        'patterns: for pattern in &self.patterns {
            for text in pages {
                if deadline.map(Deadline::expired).unwrap_or(false) {
                    incomplete = true;
                    break 'patterns;
                }
                if let Some(value) = pattern.extract(text) {
                    limits.insert(pattern.name.clone(), value);
                    break;
                }
            }
        }

        SoaExtraction {
            limits,
            incomplete,
            note: None,
        }
    }
}

impl Default for LimitExtractor {
    fn default() -> Self {
        Self::new()
    }
}
