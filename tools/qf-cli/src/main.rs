// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

mod report;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueHint};
use qf_config::DeterminismConfig;
use qf_field::{
    canonical_members, run_ablation_ladder, run_basin_sweep, run_robustness_sweep, Ensemble,
    RunConfig, Scenario, ScenarioSpread, SeparationReport, SimulationConfig, DEFAULT_SEPARATION_MARGIN,
    DEFAULT_TRIALS, PERTURBATION_LEVELS,
};
use tracing::info;

use crate::report::{
    write_json, AblationReport, BasinSweepReport, CompareReport, MemberSummary, RobustnessSweepReport,
    RunReport,
};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Quaternion reaction-diffusion field simulator"
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. `debug`, `qf_field=debug`)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Run ensemble members one after another (same as QF_SEQUENTIAL=1)
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a single scenario and report its collapse-metric series
    Run(RunArgs),

    /// Run healthy, degenerative and treatment side by side
    Compare(CompareArgs),

    /// Sweep the seven drive ablations over the degenerative start
    Ablate(AblateArgs),

    /// Start every scenario from the same uniform unit quaternions
    Basin(BasinArgs),

    /// Jitter D_Q and check the scenario ordering at each perturbation level
    Robustness(RobustnessArgs),
}

#[derive(Args, Clone, Copy)]
struct GridArgs {
    /// Domain extent along x
    #[arg(long, default_value_t = 50.0)]
    lx: f64,

    /// Domain extent along y
    #[arg(long, default_value_t = 50.0)]
    ly: f64,

    /// Cell spacing on both axes
    #[arg(long, default_value_t = 1.0)]
    dx: f64,

    /// Time step
    #[arg(long, default_value_t = 0.02)]
    dt: f64,

    /// Total simulated time
    #[arg(long = "t-total", default_value_t = 40.0)]
    t_total: f64,
}

impl GridArgs {
    fn simulation(&self) -> SimulationConfig {
        SimulationConfig::new(self.lx, self.ly, self.dx, self.dt, self.t_total)
    }
}

#[derive(Args)]
struct RunArgs {
    /// Scenario to simulate (healthy, degenerative, treatment)
    #[arg(long, default_value = "healthy", conflicts_with = "config")]
    scenario: Scenario,

    /// JSON run configuration; replaces the grid and scenario flags
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Seed for the initial field (defaults to QF_SEED or 42)
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    grid: GridArgs,

    /// Record a snapshot every N steps
    #[arg(long, default_value_t = 20)]
    save_interval: usize,

    /// Abort as soon as the field holds a non-finite value
    #[arg(long)]
    divergence_check: bool,

    /// Include every snapshot's arrays in the report
    #[arg(long)]
    full: bool,

    /// Destination for the JSON report
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct CompareArgs {
    /// Seed shared by the three scenarios (defaults to QF_SEED or 42)
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    grid: GridArgs,

    /// Record a snapshot every N steps
    #[arg(long, default_value_t = 20)]
    save_interval: usize,

    /// Relative margin by which degenerative must trail the other two
    #[arg(long, default_value_t = DEFAULT_SEPARATION_MARGIN)]
    margin: f64,

    /// Destination for the JSON report
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AblateArgs {
    /// Seed for the shared degenerative start (defaults to QF_SEED or 42)
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    grid: GridArgs,

    /// Record a snapshot every N steps
    #[arg(long, default_value_t = 10)]
    save_interval: usize,

    /// Destination for the JSON report
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct BasinArgs {
    /// Uniform starting points drawn on the unit 3-sphere
    #[arg(long, default_value_t = 50)]
    samples: usize,

    /// Seed for the starting points (defaults to QF_SEED or 42)
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    grid: GridArgs,

    /// Record a snapshot every N steps
    #[arg(long, default_value_t = 10)]
    save_interval: usize,

    /// Destination for the JSON report
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct RobustnessArgs {
    /// Trials per scenario and level
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Relative D_Q perturbations, comma separated (default 0,0.05,0.1,0.15,0.2,0.3)
    #[arg(long, value_delimiter = ',')]
    levels: Vec<f64>,

    /// Base seed; trial t draws its field with seed + t (defaults to QF_SEED or 42)
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    grid: GridArgs,

    /// Record a snapshot every N steps
    #[arg(long, default_value_t = 10)]
    save_interval: usize,

    /// Destination for the JSON report
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing = qf_config::init_tracing(&cli.log_level).context("failed to initialise logging")?;
    if cli.sequential {
        qf_config::determinism::configure(DeterminismConfig {
            sequential: true,
            ..DeterminismConfig::from_env()
        });
    }
    match cli.command {
        Command::Run(args) => run(args),
        Command::Compare(args) => compare(args),
        Command::Ablate(args) => ablate(args),
        Command::Basin(args) => basin(args),
        Command::Robustness(args) => robustness(args),
    }
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    qf_config::determinism::config().seed_or_base(seed)
}

fn run(args: RunArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => RunConfig::from_path(path)
            .with_context(|| format!("failed to load run configuration {}", path.display()))?,
        None => RunConfig {
            simulation: args.grid.simulation(),
            scenario: args.scenario,
            seed: None,
            save_interval: args.save_interval,
            parameters: None,
            divergence_check: args.divergence_check,
        },
    };
    let seed = args.seed.unwrap_or_else(|| config.resolved_seed());
    let config = RunConfig {
        seed: Some(seed),
        divergence_check: config.divergence_check || args.divergence_check,
        ..config
    };

    let mut sim = config.build()?;
    let history = sim.run(config.save_interval)?;
    let report = RunReport::new(
        config.scenario,
        seed,
        config.simulation,
        config.resolved_parameters(),
        history,
        args.full,
    );

    match report.final_collapse_metric {
        Some(chi) => println!("{} (seed {seed}): final chi = {chi:.6}", config.scenario),
        None => println!("{} (seed {seed}): no snapshots recorded", config.scenario),
    }
    if let Some(path) = &args.output {
        write_json(&report, path)?;
        info!(path = %path.display(), "wrote run report");
    }
    Ok(())
}

fn compare(args: CompareArgs) -> Result<()> {
    if !(args.margin.is_finite() && args.margin >= 0.0) {
        bail!("--margin must be a non-negative number, got {}", args.margin);
    }
    let seed = resolve_seed(args.seed);
    let simulation = args.grid.simulation();
    let outcomes = Ensemble::new(simulation, args.save_interval).run(&canonical_members(seed));

    let members: Vec<MemberSummary> = outcomes
        .iter()
        .map(|o| MemberSummary {
            label: o.label.clone(),
            final_collapse_metric: o.result.as_ref().ok().and_then(|h| h.final_collapse_metric()),
            error: o.result.as_ref().err().map(|e| e.to_string()),
        })
        .collect();
    for member in &members {
        match (member.final_collapse_metric, &member.error) {
            (Some(chi), _) => println!("{:<13} final chi = {chi:.6}", member.label),
            (None, Some(err)) => println!("{:<13} failed: {err}", member.label),
            (None, None) => println!("{:<13} no snapshots recorded", member.label),
        }
    }

    let separation = SeparationReport::from_outcomes(&outcomes).map(|r| r.with_margin(args.margin));
    let separated = separation.map(|r| r.is_separated()).unwrap_or(false);
    println!(
        "degenerative separated by >{:.0}%: {}",
        args.margin * 100.0,
        if separated { "yes" } else { "no" }
    );

    let report = CompareReport {
        seed,
        simulation,
        save_interval: args.save_interval,
        members,
        separation,
        separated,
    };
    if let Some(path) = &args.output {
        write_json(&report, path)?;
        info!(path = %path.display(), "wrote comparison report");
    }

    if let Some(failed) = report.members.iter().find(|m| m.error.is_some()) {
        return Err(anyhow!(
            "scenario {} failed: {}",
            failed.label,
            failed.error.as_deref().unwrap_or_default()
        ));
    }
    Ok(())
}

fn ablate(args: AblateArgs) -> Result<()> {
    let seed = resolve_seed(args.seed);
    let simulation = args.grid.simulation();
    let ladder = run_ablation_ladder(simulation, seed, args.save_interval)?;
    let report = AblationReport::new(seed, simulation, args.save_interval, ladder);

    for outcome in &report.ladder.outcomes {
        println!(
            "{}  chi_final={:.6}  chi_mean={:.6}  chi_std={:.6}  dopamine={:.6}  entropy={:.6}",
            outcome.config.label(),
            outcome.chi_final,
            outcome.chi_mean,
            outcome.chi_std,
            outcome.dopamine_final,
            outcome.entropy_final
        );
    }
    let ranking: Vec<&str> = report.ranking.iter().map(|c| c.label()).collect();
    println!("ranking: {}", ranking.join(" > "));
    println!(
        "A1 highest and A7 lowest: {}",
        if report.ordering_holds { "yes" } else { "no" }
    );

    if let Some(path) = &args.output {
        write_json(&report, path)?;
        info!(path = %path.display(), "wrote ablation report");
    }
    Ok(())
}

fn print_spread(prefix: &str, spread: &ScenarioSpread) {
    for (name, stats) in [
        ("healthy", spread.healthy),
        ("degenerative", spread.degenerative),
        ("treatment", spread.treatment),
    ] {
        println!("{prefix}{name:<13} chi = {:.6} ± {:.6}", stats.mean, stats.std);
    }
}

fn basin(args: BasinArgs) -> Result<()> {
    let seed = resolve_seed(args.seed);
    let simulation = args.grid.simulation();
    let sweep = run_basin_sweep(simulation, args.samples, seed, args.save_interval)?;

    print_spread("", &sweep.spread);
    println!(
        "degenerative lowest: {}",
        if sweep.degenerative_lowest { "yes" } else { "no" }
    );

    let report = BasinSweepReport {
        seed,
        simulation,
        save_interval: args.save_interval,
        sweep,
    };
    if let Some(path) = &args.output {
        write_json(&report, path)?;
        info!(path = %path.display(), "wrote basin report");
    }
    Ok(())
}

fn robustness(args: RobustnessArgs) -> Result<()> {
    let levels = if args.levels.is_empty() {
        PERTURBATION_LEVELS.to_vec()
    } else {
        args.levels
    };
    let seed = resolve_seed(args.seed);
    let simulation = args.grid.simulation();
    let sweep = run_robustness_sweep(simulation, &levels, args.trials, seed, args.save_interval)?;

    for level in &sweep.levels {
        println!(
            "±{:.0}%  ordering preserved: {}",
            level.level * 100.0,
            if level.ordering_preserved { "yes" } else { "no" }
        );
        print_spread("  ", &level.spread);
    }
    println!(
        "ordering preserved at every level: {}",
        if sweep.all_preserved() { "yes" } else { "no" }
    );

    let report = RobustnessSweepReport::new(seed, simulation, args.save_interval, sweep);
    if let Some(path) = &args.output {
        write_json(&report, path)?;
        info!(path = %path.display(), "wrote robustness report");
    }
    Ok(())
}
