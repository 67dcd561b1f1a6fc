//! Loop stability analysis over a frequency response.
//!
//! Finds the gain crossover (0 dB) by linear interpolation, reads the phase
//! margin there, finds the phase crossover (-180 degrees) for gain margin,
//! and grades the result against configurable thresholds.

use serde::{Deserialize, Serialize};

use super::sweep::{FrequencyResponse, ResponseSample};

/// Phase-margin grading thresholds in degrees. A margin strictly above
/// `excellent_deg` is excellent; at or above `good_deg` is good; at or above
/// `marginal_deg` is marginal; anything lower is poor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeThresholds {
    pub excellent_deg: f64,
    pub good_deg: f64,
    pub marginal_deg: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            excellent_deg: 60.0,
            good_deg: 45.0,
            marginal_deg: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityGrade {
    Excellent,
    Good,
    Marginal,
    Poor,
    /// No crossover found, so no margin to grade.
    Unknown,
}

impl std::fmt::Display for StabilityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StabilityGrade::Excellent => "excellent",
            StabilityGrade::Good => "good",
            StabilityGrade::Marginal => "marginal",
            StabilityGrade::Poor => "poor",
            StabilityGrade::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Stability margins derived from one frequency response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    /// Frequency where gain first crosses 0 dB going down.
    pub crossover_freq_hz: Option<f64>,
    /// 180 - |phase at crossover|.
    pub phase_margin_deg: Option<f64>,
    /// Negated gain at the -180 degree phase crossing.
    pub gain_margin_db: Option<f64>,
    pub grade: StabilityGrade,
    pub note: Option<String>,
}

/// Analyzes frequency responses for stability margins.
#[derive(Debug, Clone, Default)]
pub struct StabilityAnalyzer {
    thresholds: GradeThresholds,
}

impl StabilityAnalyzer {
    pub fn new(thresholds: GradeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GradeThresholds {
        &self.thresholds
    }

    /// Analyze a response. A response with no 0 dB crossing yields an
    /// `Unknown` grade with a note, never an error.
    pub fn analyze(&self, response: &FrequencyResponse) -> StabilityReport {
        let samples: Vec<ResponseSample> = response
            .samples
            .iter()
            .filter(|s| s.gain_db.is_finite() && s.phase_deg.is_finite())
            .copied()
            .collect();

        if samples.len() < 2 {
            return StabilityReport {
                crossover_freq_hz: None,
                phase_margin_deg: None,
                gain_margin_db: None,
                grade: StabilityGrade::Unknown,
                note: Some("too few finite samples to analyze".to_string()),
            };
        }

        let crossover = find_descending_crossing(&samples, |s| s.gain_db, 0.0);
        let (crossover_freq_hz, phase_margin_deg) = match crossover {
            Some(c) => {
                let phase = interpolate_at(&samples, c, |s| s.phase_deg);
                (Some(c), Some(180.0 - phase.abs()))
            }
            None => (None, None),
        };

        let gain_margin_db = find_descending_crossing(&samples, |s| s.phase_deg, -180.0)
            .map(|freq| -interpolate_at(&samples, freq, |s| s.gain_db));

        let grade = match phase_margin_deg {
            Some(pm) if pm > self.thresholds.excellent_deg => StabilityGrade::Excellent,
            Some(pm) if pm >= self.thresholds.good_deg => StabilityGrade::Good,
            Some(pm) if pm >= self.thresholds.marginal_deg => StabilityGrade::Marginal,
            Some(_) => StabilityGrade::Poor,
            None => StabilityGrade::Unknown,
        };

        StabilityReport {
            crossover_freq_hz,
            phase_margin_deg,
            gain_margin_db,
            grade,
            note: match grade {
                StabilityGrade::Unknown => {
                    Some("gain never crosses 0 dB in the swept range".to_string())
                }
                _ => None,
            },
        }
    }
}

/// First frequency, ascending, where `metric` crosses `level` going down.
/// Linear interpolation between the bracketing samples.
fn find_descending_crossing(
    samples: &[ResponseSample],
    metric: impl Fn(&ResponseSample) -> f64,
    level: f64,
) -> Option<f64> {
    for pair in samples.windows(2) {
        let (a, b) = (metric(&pair[0]), metric(&pair[1]));
        if a >= level && b < level {
            if (a - b).abs() < f64::EPSILON {
                return Some(pair[0].freq_hz);
            }
            let t = (a - level) / (a - b);
            return Some(pair[0].freq_hz + t * (pair[1].freq_hz - pair[0].freq_hz));
        }
    }
    None
}

/// Linearly interpolate `metric` at a frequency inside the sample range.
fn interpolate_at(
    samples: &[ResponseSample],
    freq: f64,
    metric: impl Fn(&ResponseSample) -> f64,
) -> f64 {
    for pair in samples.windows(2) {
        if pair[0].freq_hz <= freq && freq <= pair[1].freq_hz {
            let span = pair[1].freq_hz - pair[0].freq_hz;
            if span <= 0.0 {
                return metric(&pair[0]);
            }
            let t = (freq - pair[0].freq_hz) / span;
            return metric(&pair[0]) + t * (metric(&pair[1]) - metric(&pair[0]));
        }
    }
    // Out of range: clamp to the nearest endpoint.
    if freq < samples[0].freq_hz {
        metric(&samples[0])
    } else {
        metric(&samples[samples.len() - 1])
    }
}
