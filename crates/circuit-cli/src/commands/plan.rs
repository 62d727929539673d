use std::path::PathBuf;

use circuit_core::timer::format_clock;
use circuit_core::{PlannedPhase, SequenceDefinition};
use clap::Args;
use serde::Serialize;

#[derive(Args)]
pub struct PlanArgs {
    /// Sequence file (.toml or .json)
    pub file: PathBuf,
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanReport {
    name: Option<String>,
    rounds: u32,
    total_secs: u64,
    phases: Vec<PlannedPhase>,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let sequence = SequenceDefinition::load(&args.file)?.normalized();
    let report = PlanReport {
        name: sequence.name.clone(),
        rounds: sequence.rounds,
        total_secs: sequence.total_seconds(),
        phases: sequence.plan(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(name) = &report.name {
        println!("{name}");
    }
    for (i, phase) in report.phases.iter().enumerate() {
        println!(
            "{:>3}. round {} timer {} rep {}  {:<11} {:<16} {}",
            i + 1,
            phase.round,
            phase.timer_index + 1,
            phase.repetition,
            phase.phase.as_str(),
            phase.label,
            format_clock(phase.duration),
        );
    }
    println!(
        "{} phases, total {}",
        report.phases.len(),
        format_clock(u32::try_from(report.total_secs).unwrap_or(u32::MAX))
    );
    Ok(())
}
