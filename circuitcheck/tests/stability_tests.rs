//! Stability analysis tests driven by a synthetic engine.

use num_complex::Complex64;

use circuitcheck::spice::engine::{AcEngine, EngineError, TransferSample};
use circuitcheck::spice::netlist::NetlistParser;
use circuitcheck::spice::stability::{StabilityAnalyzer, StabilityGrade};
use circuitcheck::spice::sweep::{FrequencySweepRunner, SweepConfig, SweepOutcome};

/// Engine that evaluates a first-order transfer function analytically:
/// H(f) = dc_gain / (1 + j f / corner_hz).
struct FirstOrderEngine {
    dc_gain: f64,
    corner_hz: f64,
}

impl AcEngine for FirstOrderEngine {
    fn name(&self) -> &str {
        "first-order"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn run_ac(
        &self,
        _netlist: &str,
        sweep: &SweepConfig,
        _input: &str,
        _output: &str,
    ) -> Result<Vec<TransferSample>, EngineError> {
        Ok(sweep
            .frequencies()
            .into_iter()
            .map(|f| {
                let h = Complex64::new(self.dc_gain, 0.0)
                    / Complex64::new(1.0, f / self.corner_hz);
                (f, h)
            })
            .collect())
    }
}

fn amp_graph() -> circuitcheck::spice::netlist::NetlistGraph {
    NetlistParser::new()
        .parse_content("V1 in 0 AC 1\nE1 out 0 in 0 100\nR1 out 0 1k")
        .unwrap()
}

#[test]
fn test_first_order_loop_is_excellent() {
    // 40 dB DC gain, 100 Hz corner: unity gain near 10 kHz where the phase
    // sits near -90 degrees, so the margin is close to 90.
    let runner = FrequencySweepRunner::new(
        Box::new(FirstOrderEngine {
            dc_gain: 100.0,
            corner_hz: 100.0,
        }),
        SweepConfig::default(),
    );

    let outcome = runner.analyze_netlist(&amp_graph(), "in", "out", None);
    let response = outcome.response().expect("sweep should complete");
    assert!(!response.samples.is_empty());

    let report = StabilityAnalyzer::default().analyze(response);
    let crossover = report.crossover_freq_hz.unwrap();
    assert!(
        (crossover - 10_000.0).abs() / 10_000.0 < 0.05,
        "crossover {} not near 10 kHz",
        crossover
    );
    let pm = report.phase_margin_deg.unwrap();
    assert!(pm > 85.0 && pm < 95.0, "phase margin {} out of range", pm);
    assert_eq!(report.grade, StabilityGrade::Excellent);
}

#[test]
fn test_gain_below_unity_everywhere_is_unknown() {
    let runner = FrequencySweepRunner::new(
        Box::new(FirstOrderEngine {
            dc_gain: 0.5,
            corner_hz: 100.0,
        }),
        SweepConfig::default(),
    );

    let outcome = runner.analyze_netlist(&amp_graph(), "in", "out", None);
    let report = StabilityAnalyzer::default().analyze(outcome.response().unwrap());
    assert_eq!(report.grade, StabilityGrade::Unknown);
    assert!(report.crossover_freq_hz.is_none());
}

#[test]
fn test_unknown_node_never_reaches_engine() {
    struct PanickyEngine;
    impl AcEngine for PanickyEngine {
        fn name(&self) -> &str {
            "panicky"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn run_ac(
            &self,
            _netlist: &str,
            _sweep: &SweepConfig,
            _input: &str,
            _output: &str,
        ) -> Result<Vec<TransferSample>, EngineError> {
            panic!("engine must not run for an invalid request");
        }
    }

    let runner = FrequencySweepRunner::new(Box::new(PanickyEngine), SweepConfig::default());
    let outcome = runner.analyze_netlist(&amp_graph(), "in", "nope", None);
    assert!(matches!(outcome, SweepOutcome::Unavailable { .. }));
}
