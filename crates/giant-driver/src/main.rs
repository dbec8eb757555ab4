use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use giant_core::{constants::DEFAULT_WORKERS, SweepSpec};
use giant_driver::{Driver, Phases};
use ns3_frontend::{FailurePolicy, DEFAULT_PROGRAM, DEFAULT_WRAPPER};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run GIANT load sweeps on ns-3", long_about = None)]
struct Args {
    /// Sweep configuration (JSON or Dhall)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root of the ns-3 tree
    #[arg(long, env = "NS3")]
    ns3_dir: PathBuf,

    /// Do not run the simulations; parse the traces already on disk
    #[arg(long)]
    no_run: bool,

    /// Do not parse the traces
    #[arg(long)]
    no_parse: bool,

    /// Print more about what is going on
    #[arg(short, long)]
    verbose: bool,

    /// Number of simulations run at once
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Directory the plots are written to
    #[arg(long, default_value = ".")]
    plot_dir: PathBuf,

    /// What to do when a simulation fails: ignore, warn or fail
    #[arg(long, default_value_t = FailurePolicy::Warn)]
    on_failure: FailurePolicy,

    /// ns-3 build wrapper, relative to the ns-3 root
    #[arg(long, default_value = DEFAULT_WRAPPER)]
    wrapper: String,

    /// GIANT example program, as passed to the wrapper's `--run`
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    program: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    anyhow::ensure!(args.workers > 0, "there must be at least one worker");

    let spec = match &args.config {
        Some(path) => SweepSpec::from_file(path)
            .with_context(|| format!("failed to read sweep config {}", path.display()))?,
        None => SweepSpec::default(),
    };
    let driver = Driver::builder()
        .spec(spec)
        .ns3_dir(args.ns3_dir)
        .wrapper(args.wrapper)
        .program(args.program)
        .phases(Phases {
            run: !args.no_run,
            parse: !args.no_parse,
            verbose: args.verbose,
        })
        .workers(args.workers)
        .on_failure(args.on_failure)
        .plot_dir(args.plot_dir)
        .build();
    driver.run().with_context(|| "GIANT sweep failed")?;
    Ok(())
}
