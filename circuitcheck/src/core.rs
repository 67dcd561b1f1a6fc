//! Core analysis orchestration shared by library callers and the CLI.
//! No network or engine dependencies beyond what a run actually needs.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::report::{AnalysisReport, ComponentReport, StabilitySection};
use crate::soa::compliance::ComplianceChecker;
use crate::soa::extractor::{ExtractedLimits, LimitExtractor, SoaError};
use crate::spice::engine::NgspiceEngine;
use crate::spice::netlist::{NetlistError, NetlistParser};
use crate::spice::stability::{StabilityAnalyzer, StabilityReport};
use crate::spice::sweep::{FrequencySweepRunner, SweepConfig, SweepOutcome};

#[derive(Debug, thiserror::Error)]
pub enum CircuitCheckError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl From<SoaError> for CircuitCheckError {
    fn from(e: SoaError) -> Self {
        match e {
            SoaError::NotFound(path) => CircuitCheckError::NotFound(path.display().to_string()),
            SoaError::Document(msg) => CircuitCheckError::Parse(msg),
        }
    }
}

impl From<NetlistError> for CircuitCheckError {
    fn from(e: NetlistError) -> Self {
        match e {
            NetlistError::NotFound(path) => {
                CircuitCheckError::NotFound(path.display().to_string())
            }
            NetlistError::Io(e) => CircuitCheckError::Io(e),
            NetlistError::Parse { .. } => CircuitCheckError::Parse(e.to_string()),
        }
    }
}

impl From<crate::bom::BomError> for CircuitCheckError {
    fn from(e: crate::bom::BomError) -> Self {
        match e {
            crate::bom::BomError::NotFound(path) => {
                CircuitCheckError::NotFound(path.display().to_string())
            }
            crate::bom::BomError::Io(e) => CircuitCheckError::Io(e),
            other => CircuitCheckError::Parse(other.to_string()),
        }
    }
}

/// Wall-clock budget for a long-running operation. Checked cooperatively at
/// page and stage boundaries.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Options for analysis runs.
#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    /// Safety margin applied during compliance checks.
    pub safety_margin: f64,
    /// Sweep parameters for stability analysis.
    pub sweep: SweepConfig,
    /// Reject malformed netlist lines instead of skipping them.
    pub strict_netlist: bool,
    /// Overall time budget; `None` means unbounded.
    pub time_budget: Option<Duration>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            safety_margin: crate::soa::compliance::DEFAULT_SAFETY_MARGIN,
            sweep: SweepConfig::default(),
            strict_netlist: false,
            time_budget: None,
        }
    }
}

/// Operating conditions per component reference, each a channel-to-value
/// mapping ("Vds" -> 24.0).
pub type OperatingConditions = BTreeMap<String, BTreeMap<String, f64>>;

/// Load operating conditions from a YAML or JSON file keyed by reference.
pub fn load_operating_conditions(path: &Path) -> Result<OperatingConditions, CircuitCheckError> {
    if !path.exists() {
        return Err(CircuitCheckError::NotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            serde_json::from_str(&content).map_err(|e| CircuitCheckError::Parse(e.to_string()))
        }
        // YAML is the default, and a superset of JSON anyway.
        _ => serde_yaml::from_str(&content).map_err(|e| CircuitCheckError::Parse(e.to_string())),
    }
}

/// Stateless entry points for full analysis runs.
pub struct CircuitCheckCore;

impl CircuitCheckCore {
    /// Extract limits from a datasheet and check them against operating
    /// conditions for one component.
    pub fn analyze_component(
        reference: &str,
        part_number: &str,
        datasheet: &Path,
        operating: &BTreeMap<String, f64>,
        options: &AnalysisOptions,
    ) -> Result<ComponentReport, CircuitCheckError> {
        let deadline = options.time_budget.map(Deadline::after);
        let extractor = LimitExtractor::new();
        let extraction = extractor.extract_from_document(datasheet, deadline.as_ref())?;

        let mut notes = Vec::new();
        if let Some(note) = extraction.note.clone() {
            notes.push(note);
        }

        let warnings = extractor.validate(&extraction.limits);
        let checker = ComplianceChecker::new(options.safety_margin);
        let compliance = checker.check_compliance(&extraction.limits, operating);

        Ok(ComponentReport {
            reference: reference.to_string(),
            part_number: part_number.to_string(),
            limits: extraction.limits,
            warnings,
            compliance,
            notes,
        })
    }

    /// Extract limits from a datasheet without compliance checking.
    pub fn analyze_soa(
        datasheet: &Path,
        options: &AnalysisOptions,
    ) -> Result<ExtractedLimits, CircuitCheckError> {
        let deadline = options.time_budget.map(Deadline::after);
        let extractor = LimitExtractor::new();
        Ok(extractor
            .extract_from_document(datasheet, deadline.as_ref())?
            .limits)
    }

    /// Run a frequency sweep over a SPICE netlist and grade the margins.
    ///
    /// Engine or netlist problems surface as an `Unavailable` outcome inside
    /// the section; only file-level failures are errors.
    pub fn analyze_stability(
        netlist_path: &Path,
        input_node: &str,
        output_node: &str,
        options: &AnalysisOptions,
    ) -> Result<StabilitySection, CircuitCheckError> {
        let graph = NetlistParser::new()
            .strict(options.strict_netlist)
            .parse_file(netlist_path)?;
        let deadline = options.time_budget.map(Deadline::after);

        let runner = FrequencySweepRunner::new(
            Box::new(NgspiceEngine::default()),
            options.sweep.clone(),
        );
        let outcome = runner.analyze_netlist(&graph, input_node, output_node, deadline.as_ref());

        let report: Option<StabilityReport> = outcome
            .response()
            .map(|response| StabilityAnalyzer::default().analyze(response));

        Ok(StabilitySection {
            input_node: input_node.to_string(),
            output_node: output_node.to_string(),
            outcome,
            report,
        })
    }

    /// Full project run: SOA for every component with a datasheet and
    /// declared conditions, plus optional stability analysis.
    ///
    /// Datasheet paths are resolved per reference from `datasheets`; a
    /// missing datasheet is recorded as a note, not a failure.
    pub fn analyze_project(
        project: &str,
        datasheets: &BTreeMap<String, std::path::PathBuf>,
        conditions: &OperatingConditions,
        stability_request: Option<(&Path, &str, &str)>,
        options: &AnalysisOptions,
    ) -> Result<AnalysisReport, CircuitCheckError> {
        let mut report = AnalysisReport::new(project);
        let empty = BTreeMap::new();

        for (reference, operating) in conditions {
            match datasheets.get(reference) {
                Some(path) => {
                    match Self::analyze_component(reference, "", path, operating, options) {
                        Ok(mut component) => {
                            if component.part_number.is_empty() {
                                component.part_number = path
                                    .file_stem()
                                    .and_then(|s| s.to_str())
                                    .unwrap_or("unknown")
                                    .to_string();
                            }
                            report.components.push(component);
                        }
                        Err(e) => {
                            tracing::warn!(reference, error = %e, "component analysis failed");
                            report.components.push(ComponentReport {
                                reference: reference.clone(),
                                notes: vec![format!("analysis failed: {}", e)],
                                ..Default::default()
                            });
                        }
                    }
                }
                None => {
                    report.components.push(ComponentReport {
                        reference: reference.clone(),
                        notes: vec!["no datasheet available".to_string()],
                        ..Default::default()
                    });
                }
            }
        }

        // References with datasheets but no declared conditions still get
        // their limits extracted.
        for (reference, path) in datasheets {
            if conditions.contains_key(reference) {
                continue;
            }
            if let Ok(component) = Self::analyze_component(reference, "", path, &empty, options) {
                report.components.push(component);
            }
        }

        // A stability failure must not discard the SOA results already
        // computed; it degrades to an unavailable section on the report.
        if let Some((netlist_path, input, output)) = stability_request {
            match Self::analyze_stability(netlist_path, input, output, options) {
                Ok(section) => report.stability = Some(section),
                Err(e) => {
                    tracing::warn!(netlist = %netlist_path.display(), error = %e, "stability analysis failed");
                    report.stability = Some(StabilitySection {
                        input_node: input.to_string(),
                        output_node: output.to_string(),
                        outcome: SweepOutcome::Unavailable {
                            reason: format!("stability analysis failed: {}", e),
                        },
                        report: None,
                    });
                }
            }
        }

        Ok(report)
    }
}
