//! Runs every load of a sweep on a bounded pool of workers. Each worker blocks on one simulator
//! process at a time; workers share nothing.

use std::str::FromStr;

use derivative::Derivative;
use giant_core::SweepSpec;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{Error, GiantSimulation, RunOutcome};

/// What to do about simulations that fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative, serde::Serialize, serde::Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Carry on without a word.
    Ignore,
    /// Log a warning and carry on.
    #[derivative(Default)]
    Warn,
    /// Fail the sweep once every run has finished.
    Fail,
}

impl FailurePolicy {
    fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Ignore => "ignore",
            FailurePolicy::Warn => "warn",
            FailurePolicy::Fail => "fail",
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = ParseFailurePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(FailurePolicy::Ignore),
            "warn" => Ok(FailurePolicy::Warn),
            "fail" => Ok(FailurePolicy::Fail),
            _ => Err(ParseFailurePolicyError(s.to_owned())),
        }
    }
}

/// Error parsing a [`FailurePolicy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown failure policy `{0}` (expected ignore, warn or fail)")]
pub struct ParseFailurePolicyError(String);

/// Runs one simulation per load of `spec`, at most `workers` at a time, and waits for all of
/// them. Results are returned in sweep order, one per run.
///
/// This only fails if the worker pool cannot be built. Per-run failures are left in the
/// returned vector; see [`apply_policy`].
pub fn dispatch(
    sim: &GiantSimulation,
    spec: &SweepSpec,
    workers: usize,
) -> Result<Vec<Result<RunOutcome, Error>>, Error> {
    info!(
        "Running {} GIANT simulations with {workers} workers",
        spec.nr_runs()
    );
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("giant-worker-{i}"))
        .build()?;
    let bar = ProgressBar::new(spec.nr_runs() as u64);
    let runs = spec.runs().collect::<Vec<_>>();
    let results = pool.install(|| {
        runs.par_iter()
            .map(|&(run, load)| {
                let result = sim.run(run, load);
                bar.inc(1);
                result
            })
            .collect::<Vec<_>>()
    });
    bar.finish_and_clear();
    Ok(results)
}

/// Applies `policy` to the results of [`dispatch`], returning the outcome of every simulation
/// that could be launched.
///
/// Under [`FailurePolicy::Fail`], the first failure in sweep order is returned as an error.
pub fn apply_policy(
    results: Vec<Result<RunOutcome, Error>>,
    policy: FailurePolicy,
) -> Result<Vec<RunOutcome>, Error> {
    let mut outcomes = Vec::with_capacity(results.len());
    for result in results {
        let failure = match result {
            Ok(outcome) if outcome.succeeded() => {
                outcomes.push(outcome);
                continue;
            }
            Ok(outcome) => {
                outcomes.push(outcome);
                Error::Failed {
                    run: outcome.run,
                    status: outcome.status,
                }
            }
            Err(e) => e,
        };
        match policy {
            FailurePolicy::Ignore => debug!("ignoring failure: {failure}"),
            FailurePolicy::Warn => warn!("{}", describe(&failure)),
            FailurePolicy::Fail => return Err(failure),
        }
    }
    Ok(outcomes)
}

fn describe(e: &Error) -> String {
    match e {
        Error::Launch { source, .. } => format!("{e}: {source}"),
        Error::Failed { run, .. } => {
            format!("{e}; see {}{run}", giant_core::constants::NS3_OUTPUT_PREFIX)
        }
        _ => e.to_string(),
    }
}
