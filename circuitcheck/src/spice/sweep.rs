//! Frequency sweep orchestration.
//!
//! Validates the request against the parsed netlist, probes the engine, and
//! turns raw complex samples into a gain/phase response. Every way the sweep
//! can fail to run is expressed as [`SweepOutcome::Unavailable`] with a
//! reason string; errors are reserved for genuine faults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::engine::AcEngine;
use super::netlist::NetlistGraph;
use crate::core::Deadline;

/// AC sweep parameters. Defaults cover the audio-to-RF-edge decade range
/// most stability checks care about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub start_hz: f64,
    pub stop_hz: f64,
    pub points_per_decade: usize,
    /// Engine execution budget.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

mod duration_secs {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_hz: 1.0,
            stop_hz: 1e6,
            points_per_decade: 50,
            timeout: default_timeout(),
        }
    }
}

impl SweepConfig {
    /// Log-spaced sample frequencies, both endpoints inclusive.
    pub fn frequencies(&self) -> Vec<f64> {
        if !(self.start_hz > 0.0 && self.stop_hz > self.start_hz) {
            return vec![self.start_hz];
        }
        let decades = (self.stop_hz / self.start_hz).log10();
        let steps = ((decades * self.points_per_decade as f64).ceil() as usize).max(1);
        let mut freqs: Vec<f64> = (0..=steps)
            .map(|i| self.start_hz * 10f64.powf(decades * i as f64 / steps as f64))
            .collect();
        // powf rounding can push the last point off the stop frequency.
        if let Some(last) = freqs.last_mut() {
            *last = self.stop_hz;
        }
        freqs
    }
}

/// One gain/phase sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseSample {
    pub freq_hz: f64,
    pub gain_db: f64,
    /// Unwrapped phase in degrees.
    pub phase_deg: f64,
}

/// A completed frequency response, ascending in frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyResponse {
    pub samples: Vec<ResponseSample>,
    pub note: Option<String>,
    /// True when the sweep was cut short by a deadline.
    pub incomplete: bool,
}

/// Outcome of a sweep request. "The engine is missing" and "the request does
/// not fit this netlist" are ordinary outcomes a report can show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepOutcome {
    Completed(FrequencyResponse),
    Unavailable { reason: String },
}

impl SweepOutcome {
    fn unavailable(reason: impl Into<String>) -> Self {
        SweepOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn response(&self) -> Option<&FrequencyResponse> {
        match self {
            SweepOutcome::Completed(r) => Some(r),
            SweepOutcome::Unavailable { .. } => None,
        }
    }
}

/// Runs validated AC sweeps through an [`AcEngine`].
pub struct FrequencySweepRunner {
    engine: Box<dyn AcEngine>,
    config: SweepConfig,
}

impl FrequencySweepRunner {
    pub fn new(engine: Box<dyn AcEngine>, config: SweepConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run an AC sweep between two named nodes of a parsed netlist.
    ///
    /// Checks, in order: both nodes exist, the nodes are electrically
    /// connected, the deadline still has budget, and the engine is present.
    /// Each failed check produces an `Unavailable` outcome with a reason.
    pub fn analyze_netlist(
        &self,
        graph: &NetlistGraph,
        input_node: &str,
        output_node: &str,
        deadline: Option<&Deadline>,
    ) -> SweepOutcome {
        for node in [input_node, output_node] {
            if !graph.has_node(node) {
                let mut available: Vec<&str> = graph.nodes.iter().map(String::as_str).collect();
                available.sort_unstable();
                return SweepOutcome::unavailable(format!(
                    "node '{}' not present in netlist (available: {})",
                    node,
                    available.join(", ")
                ));
            }
        }
        if !graph.are_connected(input_node, output_node) {
            return SweepOutcome::unavailable(format!(
                "nodes '{}' and '{}' are not electrically connected",
                input_node, output_node
            ));
        }
        if deadline.map(Deadline::expired).unwrap_or(false) {
            return SweepOutcome::unavailable("time budget exhausted before simulation".to_string());
        }
        if !self.engine.is_available() {
            return SweepOutcome::unavailable(format!(
                "simulation engine '{}' is not installed",
                self.engine.name()
            ));
        }

        let netlist_text = graph.to_spice();
        match self
            .engine
            .run_ac(&netlist_text, &self.config, input_node, output_node)
        {
            Ok(raw) => SweepOutcome::Completed(build_response(&raw)),
            Err(e) => {
                tracing::warn!(engine = self.engine.name(), error = %e, "ac sweep failed");
                SweepOutcome::unavailable(e.to_string())
            }
        }
    }
}

/// Convert raw complex samples to gain/phase, with the phase unwrapped so
/// downstream crossover search sees a continuous curve.
fn build_response(raw: &[(f64, num_complex::Complex64)]) -> FrequencyResponse {
    let mut samples: Vec<ResponseSample> = raw
        .iter()
        .map(|&(freq_hz, h)| ResponseSample {
            freq_hz,
            // Epsilon keeps a hard zero from producing -inf.
            gain_db: 20.0 * (h.norm() + 1e-18).log10(),
            phase_deg: h.arg().to_degrees(),
        })
        .collect();
    samples.sort_by(|a, b| a.freq_hz.total_cmp(&b.freq_hz));
    unwrap_degrees(&mut samples);
    FrequencyResponse {
        samples,
        note: None,
        incomplete: false,
    }
}

/// In-place phase unwrap: remove artificial +-360 jumps between adjacent
/// samples.
pub fn unwrap_degrees(samples: &mut [ResponseSample]) {
    let mut offset = 0.0;
    for i in 1..samples.len() {
        let prev = samples[i - 1].phase_deg;
        let mut current = samples[i].phase_deg + offset;
        while current - prev > 180.0 {
            current -= 360.0;
            offset -= 360.0;
        }
        while current - prev < -180.0 {
            current += 360.0;
            offset += 360.0;
        }
        samples[i].phase_deg = current;
    }
}
