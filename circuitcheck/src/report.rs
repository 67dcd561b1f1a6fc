//! Analysis report assembly and rendering.
//!
//! Collects per-component SOA results and the optional stability analysis
//! into one serializable report, with a Markdown renderer for humans and
//! serde for machines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::soa::compliance::{ComplianceEntry, Verdict};
use crate::soa::extractor::ExtractedLimits;
use crate::spice::stability::StabilityReport;
use crate::spice::sweep::SweepOutcome;

/// SOA findings for one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentReport {
    pub reference: String,
    pub part_number: String,
    pub limits: ExtractedLimits,
    /// Validation warnings over the extracted limit set.
    pub warnings: Vec<String>,
    pub compliance: Vec<ComplianceEntry>,
    /// Free-form notes: partial extraction, missing datasheet, and so on.
    pub notes: Vec<String>,
}

impl ComponentReport {
    pub fn worst_verdict(&self) -> Option<Verdict> {
        self.compliance.iter().map(|e| e.verdict).max_by_key(|v| match v {
            Verdict::Ok => 0,
            Verdict::Warning => 1,
            Verdict::Violation => 2,
        })
    }
}

/// Stability findings for the analyzed loop, when one was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilitySection {
    pub input_node: String,
    pub output_node: String,
    pub outcome: SweepOutcome,
    /// Present only when the sweep completed.
    pub report: Option<StabilityReport>,
}

/// One full analysis run over a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub project: String,
    pub generated_at: DateTime<Utc>,
    pub components: Vec<ComponentReport>,
    pub stability: Option<StabilitySection>,
}

impl AnalysisReport {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project: project.into(),
            generated_at: Utc::now(),
            components: Vec::new(),
            stability: None,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.components
            .iter()
            .flat_map(|c| &c.compliance)
            .filter(|e| e.verdict == Verdict::Violation)
            .count()
    }

    /// Render the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Circuit Safety Report: {}\n\n", self.project));
        out.push_str(&format!(
            "Generated: {}  \nReport ID: {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.id
        ));

        let violations = self.violation_count();
        if violations > 0 {
            out.push_str(&format!("**{} limit violation(s) found.**\n\n", violations));
        }

        out.push_str("## Components\n\n");
        if self.components.is_empty() {
            out.push_str("No components analyzed.\n\n");
        }
        for component in &self.components {
            out.push_str(&format!(
                "### {} ({})\n\n",
                component.reference, component.part_number
            ));

            if component.limits.is_empty() {
                out.push_str("No limits extracted.\n\n");
            } else {
                out.push_str(&limits_to_text(&component.limits));
                out.push('\n');
            }

            for entry in &component.compliance {
                let marker = match entry.verdict {
                    Verdict::Ok => "OK",
                    Verdict::Warning => "WARN",
                    Verdict::Violation => "FAIL",
                };
                out.push_str(&format!("- [{}] {}\n", marker, entry.summary()));
            }
            if !component.compliance.is_empty() {
                out.push('\n');
            }

            for warning in &component.warnings {
                out.push_str(&format!("- Warning: {}\n", warning));
            }
            for note in &component.notes {
                out.push_str(&format!("- Note: {}\n", note));
            }
            if !component.warnings.is_empty() || !component.notes.is_empty() {
                out.push('\n');
            }
        }

        if let Some(stability) = &self.stability {
            out.push_str("## Stability\n\n");
            out.push_str(&format!(
                "Loop: {} -> {}\n\n",
                stability.input_node, stability.output_node
            ));
            match (&stability.outcome, &stability.report) {
                (SweepOutcome::Unavailable { reason }, _) => {
                    out.push_str(&format!("Analysis unavailable: {}\n\n", reason));
                }
                (SweepOutcome::Completed(_), Some(report)) => {
                    out.push_str(&format!("Grade: **{}**\n\n", report.grade));
                    if let Some(freq) = report.crossover_freq_hz {
                        out.push_str(&format!("- Crossover frequency: {:.1} Hz\n", freq));
                    }
                    if let Some(pm) = report.phase_margin_deg {
                        out.push_str(&format!("- Phase margin: {:.1} deg\n", pm));
                    }
                    if let Some(gm) = report.gain_margin_db {
                        out.push_str(&format!("- Gain margin: {:.1} dB\n", gm));
                    }
                    if let Some(note) = &report.note {
                        out.push_str(&format!("- Note: {}\n", note));
                    }
                    out.push('\n');
                }
                (SweepOutcome::Completed(_), None) => {
                    out.push_str("Sweep completed; margins not analyzed.\n\n");
                }
            }
        }

        out
    }
}

/// Flat key-value rendering of a limit set.
pub fn limits_to_text(limits: &ExtractedLimits) -> String {
    let mut out = String::new();
    for (name, value) in limits {
        out.push_str(&format!("- {}: {}\n", name, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spice::stability::StabilityGrade;

    fn sample_component() -> ComponentReport {
        let mut limits = ExtractedLimits::new();
        limits.insert("Vds_max".to_string(), 55.0);
        limits.insert("Id_max".to_string(), 33.0);
        ComponentReport {
            reference: "Q1".to_string(),
            part_number: "IRF540N".to_string(),
            limits,
            warnings: vec![],
            compliance: vec![ComplianceEntry {
                channel: "Vds".to_string(),
                measured: 24.0,
                limit: 55.0,
                ratio: 24.0 / 55.0,
                verdict: Verdict::Ok,
            }],
            notes: vec![],
        }
    }

    #[test]
    fn test_markdown_contains_component_and_limits() {
        let mut report = AnalysisReport::new("demo");
        report.components.push(sample_component());
        let md = report.to_markdown();
        assert!(md.contains("# Circuit Safety Report: demo"));
        assert!(md.contains("### Q1 (IRF540N)"));
        assert!(md.contains("- Vds_max: 55"));
        assert!(md.contains("[OK]"));
    }

    #[test]
    fn test_markdown_flags_violations() {
        let mut report = AnalysisReport::new("demo");
        let mut component = sample_component();
        component.compliance.push(ComplianceEntry {
            channel: "Id".to_string(),
            measured: 40.0,
            limit: 33.0,
            ratio: 40.0 / 33.0,
            verdict: Verdict::Violation,
        });
        report.components.push(component);
        assert_eq!(report.violation_count(), 1);
        let md = report.to_markdown();
        assert!(md.contains("1 limit violation(s) found"));
        assert!(md.contains("[FAIL]"));
    }

    #[test]
    fn test_markdown_unavailable_stability() {
        let mut report = AnalysisReport::new("demo");
        report.stability = Some(StabilitySection {
            input_node: "in".to_string(),
            output_node: "out".to_string(),
            outcome: SweepOutcome::Unavailable {
                reason: "simulation engine 'ngspice' is not installed".to_string(),
            },
            report: None,
        });
        let md = report.to_markdown();
        assert!(md.contains("Analysis unavailable: simulation engine"));
    }

    #[test]
    fn test_markdown_completed_stability() {
        let mut report = AnalysisReport::new("demo");
        report.stability = Some(StabilitySection {
            input_node: "in".to_string(),
            output_node: "out".to_string(),
            outcome: SweepOutcome::Completed(crate::spice::sweep::FrequencyResponse {
                samples: vec![],
                note: None,
                incomplete: false,
            }),
            report: Some(StabilityReport {
                crossover_freq_hz: Some(1500.0),
                phase_margin_deg: Some(65.0),
                gain_margin_db: Some(12.0),
                grade: StabilityGrade::Excellent,
                note: None,
            }),
        });
        let md = report.to_markdown();
        assert!(md.contains("Grade: **excellent**"));
        assert!(md.contains("Phase margin: 65.0 deg"));
    }

    #[test]
    fn test_worst_verdict() {
        let mut component = sample_component();
        assert_eq!(component.worst_verdict(), Some(Verdict::Ok));
        component.compliance.push(ComplianceEntry {
            channel: "Id".to_string(),
            measured: 33.0,
            limit: 33.0,
            ratio: 1.0,
            verdict: Verdict::Warning,
        });
        assert_eq!(component.worst_verdict(), Some(Verdict::Warning));
    }

    #[test]
    fn test_json_round_trip() {
        let mut report = AnalysisReport::new("demo");
        report.components.push(sample_component());
        let json = serde_json::to_string(&report).unwrap();
        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
