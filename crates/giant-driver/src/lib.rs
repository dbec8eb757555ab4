//! Runs GIANT load sweeps on ns-3 and summarises them.
//!
//! A [`Driver`] has two phases, each of which can be switched off through [`Phases`]: the run
//! phase clears the ns-3 data directory and runs one simulation per offered load on a bounded
//! worker pool, and the parse phase extracts per-load delay and loss from the traces and plots
//! them.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

pub mod plot;

use std::fmt::Write;
use std::io;
use std::path::PathBuf;

use giant_core::{constants::DEFAULT_WORKERS, extract_sweep, ExtractError, RunSummary};
use giant_core::{SweepError, SweepSpec};
use itertools::Itertools;
use log::{debug, info};
use ns3_frontend::{
    apply_policy, clear_data_dir, dispatch, FailurePolicy, GiantSimulation, RunOutcome,
    DEFAULT_PROGRAM, DEFAULT_WRAPPER,
};

use crate::plot::{Plot, PlotError};

/// Which phases to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phases {
    /// Run the simulations.
    pub run: bool,
    /// Parse the traces and plot the results.
    pub parse: bool,
    /// Print the derived application parameters too.
    pub verbose: bool,
}

impl Default for Phases {
    fn default() -> Self {
        Self {
            run: true,
            parse: true,
            verbose: false,
        }
    }
}

/// A configured sweep.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct Driver {
    /// The loads and simulation parameters.
    #[builder(default)]
    pub spec: SweepSpec,
    /// The root of the ns-3 tree.
    #[builder(setter(into))]
    pub ns3_dir: PathBuf,
    /// The ns-3 build wrapper.
    #[builder(default = DEFAULT_WRAPPER.to_owned(), setter(into))]
    pub wrapper: String,
    /// The GIANT example program.
    #[builder(default = DEFAULT_PROGRAM.to_owned(), setter(into))]
    pub program: String,
    /// The phases to run.
    #[builder(default)]
    pub phases: Phases,
    /// How many simulations run at once.
    #[builder(default = DEFAULT_WORKERS)]
    pub workers: usize,
    /// What to do about failed simulations.
    #[builder(default)]
    pub on_failure: FailurePolicy,
    /// Where the plots are written.
    #[builder(default = PathBuf::from("."), setter(into))]
    pub plot_dir: PathBuf,
}

/// What a [`Driver`] produced.
#[derive(Debug, Default)]
pub struct Report {
    /// One outcome per launched simulation, if the run phase ran.
    pub outcomes: Option<Vec<RunOutcome>>,
    /// One summary per load, if the parse phase ran.
    pub summaries: Option<Vec<RunSummary>>,
    /// The plots written.
    pub plots: Vec<PathBuf>,
}

impl Driver {
    /// The simulation this driver runs for every load.
    pub fn simulation(&self) -> GiantSimulation {
        GiantSimulation::builder()
            .ns3_dir(self.ns3_dir.clone())
            .wrapper(self.wrapper.clone())
            .program(self.program.clone())
            .params(self.spec.params.clone())
            .build()
    }

    /// Runs the enabled phases.
    pub fn run(&self) -> Result<Report, Error> {
        self.spec.validate()?;
        println!("{}", self.banner());
        let sim = self.simulation();
        let data_dir = sim.data_dir();
        let mut report = Report::default();

        if self.phases.run {
            clear_data_dir(&data_dir)?;
            let results = dispatch(&sim, &self.spec, self.workers)?;
            let outcomes = apply_policy(results, self.on_failure)?;
            info!("Finished running GIANT simulations");
            report.outcomes = Some(outcomes);
        }

        if self.phases.parse {
            info!(
                "Parsing GIANT simulation results. Load: [{}]",
                self.spec.loads.iter().join(", ")
            );
            let summaries = extract_sweep(&data_dir, &self.spec)?;
            println!("{}", summary_table(&summaries));
            report.plots = self.render_plots(&summaries, report.outcomes.as_deref())?;
            report.summaries = Some(summaries);
        }
        Ok(report)
    }

    /// The parameter banner printed before a sweep.
    pub fn banner(&self) -> String {
        let p = &self.spec.params;
        let ip_size = p.ip_packet_size();
        let mut s = String::new();
        writeln!(
            s,
            "Running Parallel Simulations for GIANT Scheduler with {} Processes",
            self.workers
        )
        .unwrap();
        writeln!(s, "Simulation Running with the following parameters:").unwrap();
        writeln!(s, "    Number of ONUs: {}", p.nr_onus).unwrap();
        writeln!(
            s,
            "    Packet Size at IP Level: {} Bytes or analogously: {} Bits",
            ip_size.into_u64(),
            ip_size.into_bits()
        )
        .unwrap();
        writeln!(s, "    Number of Packets to Simulate: {}", p.nr_packets).unwrap();
        writeln!(s, "    Simulated Seconds: {}", p.sim_time.into_u64()).unwrap();
        write!(s, "    Application Run Time: {}", p.app_time.into_u64()).unwrap();
        if self.phases.verbose {
            writeln!(s).unwrap();
            writeln!(s, "Application Parameters:").unwrap();
            write!(
                s,
                "    Maximum amount of bytes transmitted by application: {}",
                p.max_bytes().into_u64()
            )
            .unwrap();
        }
        s
    }

    fn render_plots(
        &self,
        summaries: &[RunSummary],
        outcomes: Option<&[RunOutcome]>,
    ) -> Result<Vec<PathBuf>, Error> {
        std::fs::create_dir_all(&self.plot_dir)?;
        let mut plots = Vec::new();
        let delays = summaries
            .iter()
            .map(|s| (s.load, s.avg_delay_ms))
            .collect::<Vec<_>>();
        match plot::render(Plot::AverageDelay, &self.plot_dir, &delays) {
            Ok(path) => plots.push(path),
            // Every run lost every packet; the loss plot still says something.
            Err(PlotError::NoPoints(name)) => debug!("skipping {name}: no delays"),
            Err(e) => return Err(e.into()),
        }
        let lost = summaries
            .iter()
            .map(|s| (s.load, Some(s.lost as f64)))
            .collect::<Vec<_>>();
        plots.push(plot::render(Plot::LostPackets, &self.plot_dir, &lost)?);
        if let Some(outcomes) = outcomes.filter(|o| !o.is_empty()) {
            let times = outcomes
                .iter()
                .map(|o| (o.load, Some(o.elapsed.as_secs_f64())))
                .collect::<Vec<_>>();
            plots.push(plot::render(Plot::ProcessingTimes, &self.plot_dir, &times)?);
        }
        Ok(plots)
    }
}

/// Formats per-load delay and loss as a table.
pub fn summary_table(summaries: &[RunSummary]) -> String {
    let header = format!("{:<12} {:>14} {:>8}", "Load (Mbps)", "Delay (ms)", "Lost");
    let rows = summaries.iter().map(|s| {
        let delay = s
            .avg_delay_ms
            .map(|d| format!("{d:.6}"))
            .unwrap_or_else(|| "n/a".to_owned());
        format!(
            "{:<12} {:>14} {:>8}",
            format!("{:.1}", s.load.into_mbps()),
            delay,
            s.lost
        )
    });
    std::iter::once(header).chain(rows).join("\n")
}

/// The error type for [`Driver::run`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The sweep is invalid.
    #[error("invalid sweep")]
    Sweep(#[from] SweepError),

    /// Running the simulations failed.
    #[error("failed to run simulations")]
    Ns3(#[from] ns3_frontend::Error),

    /// Extracting delays and losses failed.
    #[error("failed to parse simulation results")]
    Extract(#[from] ExtractError),

    /// Rendering a plot failed.
    #[error("failed to render plots")]
    Plot(#[from] PlotError),

    /// IO error.
    #[error(transparent)]
    Io(#[from] io::Error),
}
