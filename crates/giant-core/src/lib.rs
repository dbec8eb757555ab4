//! Core types for GIANT load sweeps. This crate defines the [sweep configuration](sweep::SweepSpec),
//! the grammar of the ns-3 [packet traces](trace::TraceRecord), and the
//! [extractor](extract::extract_sweep) that turns pairs of traces into per-run delay and loss
//! summaries.

#![warn(unreachable_pub, missing_debug_implementations)]

#[macro_use]
mod ident;

pub mod constants;
pub mod extract;
pub mod layout;
pub mod stats;
pub mod sweep;
pub mod trace;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use extract::{extract_run, extract_sweep, ExtractError, RunSummary};
pub use ident::{PacketUid, RunId};
pub use layout::DataDir;
pub use sweep::{BandwidthClasses, ConfigError, SimParams, SweepError, SweepSpec};
pub use trace::{parse_trace_line, ParseTraceError, TraceLine, TraceRecord};
