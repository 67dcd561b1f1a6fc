//! AC analysis engines.
//!
//! [`AcEngine`] abstracts over whatever actually computes a frequency
//! response. The production implementation shells out to ngspice in batch
//! mode; tests substitute a synthetic engine. Engine absence is a normal,
//! reportable condition, not a panic.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use num_complex::Complex64;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::sweep::SweepConfig;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Simulation engine not available: {0}")]
    NotAvailable(String),
    #[error("Simulation failed: {0}")]
    Execution(String),
    #[error("Simulation timed out after {0}s")]
    Timeout(u64),
    #[error("Failed to stage simulation files: {0}")]
    TempFile(String),
    #[error("Could not parse simulator output: {0}")]
    OutputParse(String),
}

/// One raw transfer-function sample: frequency in Hz and the complex ratio
/// V(output)/V(input).
pub type TransferSample = (f64, Complex64);

/// Something that can run a small-signal AC analysis over a netlist.
pub trait AcEngine: Send + Sync {
    /// Engine name for logs and degrade notes.
    fn name(&self) -> &str;

    /// Cheap availability probe. Callers degrade gracefully when false.
    fn is_available(&self) -> bool;

    /// Run an AC sweep and return the transfer function from `input_node` to
    /// `output_node`, one sample per simulated frequency, ascending.
    fn run_ac(
        &self,
        netlist: &str,
        sweep: &SweepConfig,
        input_node: &str,
        output_node: &str,
    ) -> Result<Vec<TransferSample>, EngineError>;
}

/// ngspice subprocess engine.
///
/// Stages the deck and output file as temp files, runs `ngspice -b`, and
/// parses the `wrdata` ASCII table back into complex samples. The execution
/// budget comes from the sweep config passed to [`AcEngine::run_ac`].
#[derive(Debug, Clone)]
pub struct NgspiceEngine {
    executable: String,
}

impl Default for NgspiceEngine {
    fn default() -> Self {
        Self {
            executable: "ngspice".to_string(),
        }
    }
}

impl NgspiceEngine {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Assemble the batch deck: circuit lines, then a control block that
    /// sweeps and dumps both node voltages, then `.end`.
    fn build_deck(
        netlist: &str,
        sweep: &SweepConfig,
        input_node: &str,
        output_node: &str,
        data_path: &std::path::Path,
    ) -> String {
        let mut deck = String::new();
        let mut has_title = false;
        for line in netlist.lines() {
            let trimmed = line.trim();
            let lower = trimmed.to_lowercase();
            // Strip existing .end/.ac so the control block governs the run.
            if lower == ".end" || lower.starts_with(".ac ") {
                continue;
            }
            if deck.is_empty() && !trimmed.is_empty() {
                has_title = trimmed.starts_with('*');
            }
            deck.push_str(line);
            deck.push('\n');
        }
        if !has_title {
            deck.insert_str(0, "* ac analysis deck\n");
        }
        deck.push_str(&format!(
            ".control\nac dec {} {} {}\nwrdata {} v({}) v({})\nquit\n.endc\n.end\n",
            sweep.points_per_decade,
            sweep.start_hz,
            sweep.stop_hz,
            data_path.display(),
            output_node,
            input_node,
        ));
        deck
    }

    /// Parse a `wrdata` ASCII table. For complex AC vectors ngspice writes
    /// `freq re im` triples per requested vector, so two vectors give six
    /// columns per row.
    fn parse_wrdata(text: &str) -> Result<Vec<TransferSample>, EngineError> {
        let mut samples = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let cols: Vec<f64> = trimmed
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|e| EngineError::OutputParse(format!("bad number in '{}': {}", trimmed, e)))?;
            match cols.len() {
                6 => {
                    let freq = cols[0];
                    let vout = Complex64::new(cols[1], cols[2]);
                    let vin = Complex64::new(cols[4], cols[5]);
                    samples.push((freq, vout / vin));
                }
                3 => {
                    // Single vector: the source was requested as input and
                    // optimized away, treat it as unity.
                    let freq = cols[0];
                    samples.push((freq, Complex64::new(cols[1], cols[2])));
                }
                n => {
                    return Err(EngineError::OutputParse(format!(
                        "unexpected column count {} in '{}'",
                        n, trimmed
                    )))
                }
            }
        }
        if samples.is_empty() {
            return Err(EngineError::OutputParse("empty data file".to_string()));
        }
        Ok(samples)
    }
}

impl AcEngine for NgspiceEngine {
    fn name(&self) -> &str {
        "ngspice"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn run_ac(
        &self,
        netlist: &str,
        sweep: &SweepConfig,
        input_node: &str,
        output_node: &str,
    ) -> Result<Vec<TransferSample>, EngineError> {
        let data_file = NamedTempFile::new().map_err(|e| EngineError::TempFile(e.to_string()))?;
        let deck = Self::build_deck(netlist, sweep, input_node, output_node, data_file.path());

        let mut deck_file = NamedTempFile::new().map_err(|e| EngineError::TempFile(e.to_string()))?;
        deck_file
            .write_all(deck.as_bytes())
            .map_err(|e| EngineError::TempFile(e.to_string()))?;

        tracing::debug!(engine = self.name(), input_node, output_node, "running ac sweep");

        let child = Command::new(&self.executable)
            .arg("-b")
            .arg(deck_file.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::NotAvailable(e.to_string()))?;

        let output = wait_with_timeout(child, sweep.timeout)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Execution(format!(
                "ngspice exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let data = std::fs::read_to_string(data_file.path())
            .map_err(|e| EngineError::OutputParse(e.to_string()))?;
        Self::parse_wrdata(&data)
    }
}

/// Poll a child process until it exits or the timeout lapses, then collect
/// its output. The process is killed on timeout.
fn wait_with_timeout(
    mut child: std::process::Child,
    timeout: Duration,
) -> Result<std::process::Output, EngineError> {
    let start = std::time::Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = child
                    .stdout
                    .take()
                    .map(|mut s| {
                        let mut buf = Vec::new();
                        std::io::Read::read_to_end(&mut s, &mut buf).ok();
                        buf
                    })
                    .unwrap_or_default();
                let stderr = child
                    .stderr
                    .take()
                    .map(|mut s| {
                        let mut buf = Vec::new();
                        std::io::Read::read_to_end(&mut s, &mut buf).ok();
                        buf
                    })
                    .unwrap_or_default();
                return Ok(std::process::Output {
                    status,
                    stdout,
                    stderr,
                });
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    return Err(EngineError::Timeout(timeout.as_secs()));
                }
                std::thread::sleep(poll_interval);
            }
            Err(e) => return Err(EngineError::Execution(e.to_string())),
        }
    }
}
