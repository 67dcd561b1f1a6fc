//! CircuitCheck CLI - SOA compliance and stability analysis from the command line.

use clap::{Parser, Subcommand, ValueEnum};
use circuitcheck::{
    load_operating_conditions, AnalysisOptions, CircuitCheckCore, LimitExtractor, SweepConfig,
    SweepOutcome, Verdict,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "circuitcheck")]
#[command(about = "Circuit safety and stability analysis tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract SOA limits from a datasheet and check operating conditions
    Soa {
        /// Path to datasheet (.pdf, .txt or .md)
        #[arg(value_name = "DATASHEET")]
        datasheet: PathBuf,

        /// Operating conditions file (.yaml or .json), keyed by reference
        #[arg(short, long)]
        operating: Option<PathBuf>,

        /// Component reference to select from the conditions file
        #[arg(short, long, default_value = "Q1")]
        reference: String,

        /// Safety margin applied during compliance checks
        #[arg(long, default_value_t = 0.8)]
        margin: f64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code when any limit is violated
        #[arg(long)]
        fail_on_violation: bool,
    },

    /// Run an AC sweep over a SPICE netlist and grade stability margins
    Stability {
        /// Path to SPICE netlist (.cir, .sp)
        #[arg(value_name = "NETLIST")]
        netlist: PathBuf,

        /// Input node name
        #[arg(long, default_value = "in")]
        input: String,

        /// Output node name
        #[arg(long, default_value = "out")]
        output: String,

        /// Sweep start frequency in Hz
        #[arg(long, default_value_t = 1.0)]
        start: f64,

        /// Sweep stop frequency in Hz
        #[arg(long, default_value_t = 1e6)]
        stop: f64,

        /// Points per decade
        #[arg(long, default_value_t = 50)]
        points: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Full project report: SOA per component plus optional stability
    Report {
        /// Operating conditions file (.yaml or .json), keyed by reference
        #[arg(value_name = "CONDITIONS")]
        conditions: PathBuf,

        /// Directory of datasheets named <reference>.<ext>
        #[arg(short, long)]
        datasheets: PathBuf,

        /// SPICE netlist for stability analysis
        #[arg(long)]
        netlist: Option<PathBuf>,

        /// Input node for stability analysis
        #[arg(long, default_value = "in")]
        input: String,

        /// Output node for stability analysis
        #[arg(long, default_value = "out")]
        output: String,

        /// Project name shown in the report
        #[arg(long, default_value = "project")]
        project: String,

        /// Write the report here instead of stdout
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: ReportFormat,
    },

    /// Fill missing datasheet links in a BOM via part search APIs
    Enrich {
        /// Path to BOM (.csv or .xml)
        #[arg(value_name = "BOM")]
        bom: PathBuf,

        /// Write enriched records here as JSON instead of stdout
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
    },

    /// List the built-in limit patterns
    Patterns {
        /// Show labels and units per pattern
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
}

#[derive(Clone, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Soa {
            datasheet,
            operating,
            reference,
            margin,
            format,
            fail_on_violation,
        } => handle_soa(
            &datasheet,
            operating.as_deref(),
            &reference,
            margin,
            format,
            fail_on_violation,
        ),
        Commands::Stability {
            netlist,
            input,
            output,
            start,
            stop,
            points,
            format,
        } => handle_stability(&netlist, &input, &output, start, stop, points, format),
        Commands::Report {
            conditions,
            datasheets,
            netlist,
            input,
            output,
            project,
            out,
            format,
        } => handle_report(
            &conditions,
            &datasheets,
            netlist.as_deref(),
            &input,
            &output,
            &project,
            out.as_deref(),
            format,
        ),
        Commands::Enrich { bom, out } => handle_enrich(&bom, out.as_deref()),
        Commands::Patterns { verbose } => {
            handle_patterns(verbose);
            0
        }
    };

    process::exit(exit_code);
}

fn handle_soa(
    datasheet: &Path,
    operating: Option<&Path>,
    reference: &str,
    margin: f64,
    format: OutputFormat,
    fail_on_violation: bool,
) -> i32 {
    let options = AnalysisOptions {
        safety_margin: margin,
        ..AnalysisOptions::default()
    };

    let conditions: BTreeMap<String, f64> = match operating {
        Some(path) => match load_operating_conditions(path) {
            Ok(all) => all.get(reference).cloned().unwrap_or_default(),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        None => BTreeMap::new(),
    };

    let component = match CircuitCheckCore::analyze_component(
        reference,
        datasheet
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
        datasheet,
        &conditions,
        &options,
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&component).unwrap());
        }
        OutputFormat::Human => {
            println!("Limits extracted from {}:", datasheet.display());
            if component.limits.is_empty() {
                println!("  (none)");
            }
            for (name, value) in &component.limits {
                println!("  {}: {}", name, value);
            }
            if !component.compliance.is_empty() {
                println!("\nCompliance:");
                for entry in &component.compliance {
                    println!("  [{}] {}", entry.verdict, entry.summary());
                }
            }
            for warning in &component.warnings {
                println!("Warning: {}", warning);
            }
            for note in &component.notes {
                println!("Note: {}", note);
            }
        }
    }

    let violated = component
        .compliance
        .iter()
        .any(|e| e.verdict == Verdict::Violation);
    if fail_on_violation && violated {
        1
    } else {
        0
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_stability(
    netlist: &Path,
    input: &str,
    output: &str,
    start: f64,
    stop: f64,
    points: usize,
    format: OutputFormat,
) -> i32 {
    let options = AnalysisOptions {
        sweep: SweepConfig {
            start_hz: start,
            stop_hz: stop,
            points_per_decade: points,
            ..SweepConfig::default()
        },
        ..AnalysisOptions::default()
    };

    let section = match CircuitCheckCore::analyze_stability(netlist, input, output, &options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&section).unwrap());
        }
        OutputFormat::Human => match (&section.outcome, &section.report) {
            (SweepOutcome::Unavailable { reason }, _) => {
                println!("Stability analysis unavailable: {}", reason);
            }
            (SweepOutcome::Completed(_), Some(report)) => {
                println!("Stability grade: {}", report.grade);
                if let Some(freq) = report.crossover_freq_hz {
                    println!("  Crossover frequency: {:.1} Hz", freq);
                }
                if let Some(pm) = report.phase_margin_deg {
                    println!("  Phase margin: {:.1} deg", pm);
                }
                if let Some(gm) = report.gain_margin_db {
                    println!("  Gain margin: {:.1} dB", gm);
                }
                if let Some(note) = &report.note {
                    println!("  Note: {}", note);
                }
            }
            (SweepOutcome::Completed(_), None) => {
                println!("Sweep completed; no margin analysis");
            }
        },
    }

    0
}

#[allow(clippy::too_many_arguments)]
fn handle_report(
    conditions_path: &Path,
    datasheets_dir: &Path,
    netlist: Option<&Path>,
    input: &str,
    output: &str,
    project: &str,
    out: Option<&Path>,
    format: ReportFormat,
) -> i32 {
    let conditions = match load_operating_conditions(conditions_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let datasheets = match discover_datasheets(datasheets_dir) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let stability_request = netlist.map(|path| (path, input, output));
    let report = match CircuitCheckCore::analyze_project(
        project,
        &datasheets,
        &conditions,
        stability_request,
        &AnalysisOptions::default(),
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let rendered = match format {
        ReportFormat::Markdown => report.to_markdown(),
        ReportFormat::Json => serde_json::to_string_pretty(&report).unwrap(),
    };

    match out {
        Some(path) => {
            if let Err(e) = std::fs::write(path, rendered) {
                eprintln!("Error: failed to write {}: {}", path.display(), e);
                return 1;
            }
            println!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    0
}

/// Map reference designators to datasheet files named `<reference>.<ext>`.
fn discover_datasheets(dir: &Path) -> Result<BTreeMap<String, PathBuf>, String> {
    let mut map = BTreeMap::new();
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("cannot read {}: {}", dir.display(), e))?;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_datasheet = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("pdf") | Some("txt") | Some("md")
        );
        if !is_datasheet {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            map.insert(stem.to_string(), path.clone());
        }
    }
    Ok(map)
}

fn handle_enrich(bom_path: &Path, out: Option<&Path>) -> i32 {
    let mut records = match circuitcheck::read_bom(bom_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut router = circuitcheck::parts::PartsRouter::new();
    if let Ok(token) = std::env::var("OCTOPART_TOKEN") {
        router.set_octopart_token(token);
    }
    if let Ok(key) = std::env::var("MOUSER_API_KEY") {
        router.set_mouser_api_key(key);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return 1;
        }
    };
    let enriched = runtime.block_on(router.enrich_bom(&mut records, None));
    eprintln!("Enriched {} of {} records", enriched, records.len());

    let rendered = serde_json::to_string_pretty(&records).unwrap();
    match out {
        Some(path) => {
            if let Err(e) = std::fs::write(path, rendered) {
                eprintln!("Error: failed to write {}: {}", path.display(), e);
                return 1;
            }
        }
        None => println!("{}", rendered),
    }

    0
}

fn handle_patterns(verbose: bool) {
    let extractor = LimitExtractor::new();
    println!("Built-in limit patterns:\n");
    for pattern in extractor.patterns() {
        println!("  {} - {}", pattern.name, pattern.description);
        if verbose {
            println!("      labels: {}", pattern.labels.join(", "));
            println!("      unit:   {}", pattern.unit);
            println!("      priority: {}", pattern.priority);
        }
    }
}
