//! An interface to the ns-3 GIANT example.
//!
//! This crate is tightly coupled to the command-line interface of
//! `xgpon-example-multiple-onus-udp-giant-cbr` and the trace files it writes.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

mod dispatch;
mod reset;

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use giant_core::{units::BitsPerSec, DataDir, RunId, SimParams};
use log::{debug, info};

pub use dispatch::{apply_policy, dispatch, FailurePolicy, ParseFailurePolicyError};
pub use reset::{clear_data_dir, ClearOutcome};

/// The default ns-3 build wrapper, relative to the ns-3 root.
pub const DEFAULT_WRAPPER: &str = "./waf";

/// The default GIANT example program, relative to the ns-3 root.
pub const DEFAULT_PROGRAM: &str = "src/xgpon/examples/xgpon-example-multiple-onus-udp-giant-cbr";

/// The GIANT simulation, run once per offered load.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct GiantSimulation {
    /// The root of the ns-3 tree.
    #[builder(setter(into))]
    pub ns3_dir: PathBuf,
    /// The build wrapper used to run the example.
    #[builder(default = DEFAULT_WRAPPER.to_owned(), setter(into))]
    pub wrapper: String,
    /// The example program, as understood by the wrapper's `--run`.
    #[builder(default = DEFAULT_PROGRAM.to_owned(), setter(into))]
    pub program: String,
    /// Parameters shared by every run.
    #[builder(default)]
    pub params: SimParams,
}

impl GiantSimulation {
    /// The directory the example writes its traces to.
    pub fn data_dir(&self) -> DataDir {
        DataDir::from_ns3_root(&self.ns3_dir)
    }

    /// The program invocation handed to the wrapper's `--run`.
    pub fn program_args(&self, run: RunId, load: BitsPerSec) -> String {
        let p = &self.params;
        let bw = &p.bandwidth;
        format!(
            "{} --FilenameSuffix={run} --PacketSize={} --MaxBytes={} --DataRate={} \
            --NumOnus={} --SimTime={} --AppTime={} --FixedBandwidth={} --AssuredBandwidth={} \
            --NonAssuredBandwidth={} --BestEffortBandwidth={} --verbose=0",
            self.program,
            p.packet_size.into_u64(),
            p.max_bytes().into_u64(),
            load.into_u64(),
            p.nr_onus,
            p.sim_time.into_u64(),
            p.app_time.into_u64(),
            bw.fixed.into_u64(),
            bw.assured.into_u64(),
            bw.non_assured.into_u64(),
            bw.best_effort.into_u64(),
        )
    }

    /// The shell command that runs one simulation.
    pub fn shell_command(&self, run: RunId, load: BitsPerSec) -> String {
        let ns3_dir = self.ns3_dir.display();
        let wrapper = &self.wrapper;
        let args = self.program_args(run, load);
        format!("cd {ns3_dir}; {wrapper} --run \"{args}\"")
    }

    /// Runs the simulation of one load, blocking until it exits.
    ///
    /// The simulator's stdout and stderr are written to the run's `Ns3Output<i>` file. A
    /// non-zero exit status is not an error here; it is reported in the [`RunOutcome`].
    pub fn run(&self, run: RunId, load: BitsPerSec) -> Result<RunOutcome, Error> {
        info!("Running GIANT simulation {run}, offered load: {load}");
        let data_dir = self.data_dir();
        fs::create_dir_all(data_dir.path())?;
        let output = File::create(data_dir.ns3_output(run))?;
        let command = self.shell_command(run, load);
        debug!("{command}");

        let start = Instant::now();
        let status = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::from(output.try_clone()?))
            .stderr(Stdio::from(output))
            .status()
            .map_err(|source| Error::Launch { run, source })?;
        let elapsed = start.elapsed();
        info!("Finished GIANT simulation {run} in {:.1}s ({status})", elapsed.as_secs_f64());
        Ok(RunOutcome {
            run,
            load,
            elapsed,
            status,
        })
    }
}

/// The outcome of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// The run.
    pub run: RunId,
    /// The offered load.
    pub load: BitsPerSec,
    /// Wall-clock time taken by the simulator.
    pub elapsed: Duration,
    /// The simulator's exit status.
    pub status: ExitStatus,
}

impl RunOutcome {
    /// Whether the simulator exited successfully.
    pub fn succeeded(&self) -> bool {
        self.status.success()
    }
}

/// The error type for running simulations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The shell running the simulation could not be started.
    #[error("failed to launch simulation {run}")]
    Launch {
        /// The run.
        run: RunId,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The simulator exited unsuccessfully.
    #[error("simulation {run} exited with {status}")]
    Failed {
        /// The run.
        run: RunId,
        /// Its exit status.
        status: ExitStatus,
    },

    /// The worker pool could not be built.
    #[error("failed to build the worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// IO error.
    #[error(transparent)]
    Io(#[from] io::Error),
}
