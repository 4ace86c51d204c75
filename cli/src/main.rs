//! Closed-form inverse kinematics from the command line.
//!
//! - `solve`: run the solver on a manipulator description and print the
//!   solution listing (or JSON), optionally checking it numerically
//! - `inventory`: print the classified equations after normalization

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use ik_core::config::EngineConfig;
use ik_core::kinematics::{Manipulator, ManipulatorSpec};
use ik_core::solve::{SolveOutcome, SolveReport, Solver};
use ik_core::symbolic::Bindings;
use ik_core::verify::{verify, VerificationReport};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "iksolve", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a manipulator for its joint variables.
    Solve {
        /// Manipulator description (JSON).
        manipulator: PathBuf,

        /// Engine configuration (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// Joint values (JSON object) to check the solutions against.
        #[arg(long)]
        verify: Option<PathBuf>,

        /// Largest acceptable error when verifying.
        #[arg(long, default_value_t = 1e-9)]
        tolerance: f64,
    },

    /// Show the equation inventory after sum-of-angle normalization.
    Inventory {
        manipulator: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a SolveReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<&'a VerificationReport>,
}

fn load_manipulator(path: &Path) -> Result<Manipulator> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let spec: ManipulatorSpec = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Manipulator::try_from(spec)?)
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_sample(path: &Path) -> Result<Bindings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_outcome(report: &SolveReport) {
    println!("{}", report.graph.render());
    match &report.outcome {
        SolveOutcome::Complete => println!("complete after {} iterations", report.iterations),
        SolveOutcome::Incomplete { unsolved } => {
            println!("incomplete after {} iterations", report.iterations);
            for u in unsolved {
                println!("  {}: {:?}", u.symbol, u.reason);
            }
        }
    }
}

fn print_verification(check: &VerificationReport, tolerance: f64) {
    println!("verification:");
    for e in &check.errors {
        println!(
            "  {:<8} expected {:+.9}  got {:+.9}  branch {}  error {:.2e}",
            e.symbol, e.expected, e.actual, e.branch, e.error
        );
    }
    let verdict = if check.passed(tolerance) { "ok" } else { "FAILED" };
    println!("  max error {:.2e} ({})", check.max_error, verdict);
}

fn solve(
    manipulator: &Path,
    config: Option<&Path>,
    json: bool,
    sample: Option<&Path>,
    tolerance: f64,
) -> Result<ExitCode> {
    let manipulator = load_manipulator(manipulator)?;
    let solver = Solver::new(load_config(config)?);
    let report = solver.solve(&manipulator)?;
    info!(name = %report.name, complete = report.is_complete(), "solve finished");

    let verification = match sample {
        Some(path) => Some(verify(&manipulator, &report, &load_sample(path)?)?),
        None => None,
    };

    if json {
        let out = JsonOutput {
            report: &report,
            verification: verification.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_outcome(&report);
        if let Some(check) = &verification {
            print_verification(check, tolerance);
        }
    }

    let verified = verification.as_ref().map_or(true, |c| c.passed(tolerance));
    Ok(if !verified {
        ExitCode::FAILURE
    } else if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn inventory(manipulator: &Path, config: Option<&Path>) -> Result<ExitCode> {
    let manipulator = load_manipulator(manipulator)?;
    let ctx = Solver::new(load_config(config)?).prepare(&manipulator)?;

    for (title, level) in [
        ("one unknown", &ctx.inventory.one),
        ("two unknowns", &ctx.inventory.two),
        ("three or more", &ctx.inventory.many),
    ] {
        println!("{} ({}):", title, level.len());
        for eq in level {
            println!("  {}", eq);
        }
    }
    if !ctx.auxiliary.is_empty() {
        println!("auxiliary:");
        for eq in &ctx.auxiliary {
            println!("  {}", eq);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Solve {
            manipulator,
            config,
            json,
            verify,
            tolerance,
        } => solve(manipulator, config.as_deref(), *json, verify.as_deref(), *tolerance),
        Commands::Inventory {
            manipulator,
            config,
        } => inventory(manipulator, config.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
