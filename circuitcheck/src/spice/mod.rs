//! SPICE netlist handling and AC analysis.
//!
//! Parsing ([`netlist`], [`kicad`]) is pure and always available; actually
//! sweeping a circuit needs an external engine ([`engine`]), and everything
//! downstream of that degrades to an explicit "unavailable" outcome rather
//! than failing.

pub mod engine;
pub mod kicad;
pub mod netlist;
pub mod stability;
pub mod sweep;

pub use engine::{AcEngine, EngineError, NgspiceEngine};
pub use kicad::{read_netlist, CircuitSummary, KicadComponent, KicadNet};
pub use netlist::{ElementKind, NetElement, NetlistGraph, NetlistParser};
pub use stability::{GradeThresholds, StabilityAnalyzer, StabilityGrade, StabilityReport};
pub use sweep::{
    FrequencyResponse, FrequencySweepRunner, ResponseSample, SweepConfig, SweepOutcome,
};
