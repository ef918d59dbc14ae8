//! # CDC Simulator
//!
//! Runs the crossing scenarios against a config and prints a verdict.
//!
//! Usage:
//!   cdc_sim                                  # plesiochronous preset, all scenarios
//!   cdc_sim --config config/cdc_sim.toml --scenario gray
//!   cdc_sim --threaded --scenario handshake  # one OS thread per domain
//!
//! Exit code is non-zero if any scenario broke its guarantees.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use rtio_sim::{
    min_pulse_gap, random_requests, run_gray_counter, run_handshake, run_pulse_train,
    run_threaded_gray, run_threaded_handshake, spaced_pulses, MetastabilityConfig, SimResult,
    SimulationConfig,
};

/// Percentage of source cycles that raise a handshake request.
const REQUEST_PERCENT: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Scenario {
    Gray,
    Pulse,
    Handshake,
    All,
}

/// RTIO clock domain crossing simulator
#[derive(Parser, Debug)]
#[command(name = "cdc_sim")]
#[command(about = "Exercise RTIO clock domain crossings under independent clocks")]
struct Args {
    /// TOML config; the plesiochronous preset when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which crossing to exercise
    #[arg(short, long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// Run each domain on its own OS thread instead of simulated time
    #[arg(short, long)]
    threaded: bool,

    /// Override the number of source cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Override the metastability seed (switches to the random policy)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "simulation aborted");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> SimResult<bool> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(cycles) = args.cycles {
        config.cycles = cycles;
    }
    if let Some(seed) = args.seed {
        config.metastability = MetastabilityConfig::Random { seed };
    }
    config.validate()?;

    banner(&config, args.threaded);

    let wants = |s: Scenario| args.scenario == s || args.scenario == Scenario::All;
    let mut verdicts = Vec::new();

    if args.threaded {
        if wants(Scenario::Gray) {
            let report = run_threaded_gray(&config)?;
            verdicts.push((
                "gray (threaded)",
                report.transfer.is_clean(),
                format!(
                    "{} src / {} dst ticks, {} invalid, {} regressions",
                    report.source_ticks,
                    report.destination_ticks,
                    report.transfer.invalid,
                    report.transfer.regressions
                ),
            ));
        }
        if wants(Scenario::Pulse) {
            tracing::warn!("pulse scenario has no threaded variant, skipped");
        }
        if wants(Scenario::Handshake) {
            let report = run_threaded_handshake(&config)?;
            verdicts.push((
                "handshake (threaded)",
                report.is_sound(),
                format!(
                    "{} admitted, {} dropped, {} delivered",
                    report.admitted, report.dropped, report.delivered
                ),
            ));
        }
    } else {
        if wants(Scenario::Gray) {
            let report = run_gray_counter(&config)?;
            verdicts.push((
                "gray",
                report.is_clean(),
                format!(
                    "{} invalid, {} regressions, staleness {}/{}",
                    report.transfer.invalid,
                    report.transfer.regressions,
                    report.transfer.max_staleness,
                    report.staleness_bound
                ),
            ));
        }
        if wants(Scenario::Pulse) {
            let gap = min_pulse_gap(&config);
            let pulses = spaced_pulses(config.cycles / gap, gap);
            let report = run_pulse_train(&config, &pulses)?;
            verdicts.push((
                "pulse",
                report.is_faithful(),
                format!(
                    "{}/{} delivered, latency {}/{}",
                    report.delivered,
                    report.sent,
                    report.max_latency(),
                    report.latency_bound
                ),
            ));
        }
        if wants(Scenario::Handshake) {
            let seed = match config.metastability {
                MetastabilityConfig::Random { seed } => seed,
                _ => 0,
            };
            let requests = random_requests(seed, config.cycles, REQUEST_PERCENT);
            let report = run_handshake(&config, &requests)?;
            verdicts.push((
                "handshake",
                report.is_sound(),
                format!(
                    "{} admitted, {} dropped, round trip {}/{}",
                    report.admitted,
                    report.dropped,
                    report.max_round_trip(),
                    report.round_trip_bound
                ),
            ));
        }
    }

    Ok(summary(&verdicts))
}

fn banner(config: &SimulationConfig, threaded: bool) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    row("RTIO CLOCK DOMAIN CROSSING SIMULATOR");
    row("");
    row(&format!(
        "source:      {} (period {}, phase {})",
        config.source.name, config.source.period, config.source.phase
    ));
    row(&format!(
        "destination: {} (period {}, phase {})",
        config.destination.name, config.destination.period, config.destination.phase
    ));
    if threaded {
        row(&format!(
            "threaded:    {} us / {} us for {} ms",
            config.threaded.source_tick_us,
            config.threaded.destination_tick_us,
            config.threaded.duration_ms
        ));
    } else {
        row(&format!(
            "window {}, {} stages, {} cycles, {:?}",
            config.settle_window, config.stages, config.cycles, config.metastability
        ));
    }
    println!("╚══════════════════════════════════════════════════════════════════╝");
}

fn summary(verdicts: &[(&str, bool, String)]) -> bool {
    let passed = verdicts.iter().all(|(_, ok, _)| *ok);
    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    row("RESULTS");
    println!("╠══════════════════════════════════════════════════════════════════╣");
    for (name, ok, detail) in verdicts {
        let mark = if *ok { "✓" } else { "✗" };
        row(&format!("{mark} {name:<22} {detail}"));
    }
    println!("╠══════════════════════════════════════════════════════════════════╣");
    row(if passed { "✓ ALL GUARANTEES HELD" } else { "✗ GUARANTEES BROKEN" });
    println!("╚══════════════════════════════════════════════════════════════════╝");
    passed
}

fn row(text: &str) {
    println!("║  {text:<64}║");
}
