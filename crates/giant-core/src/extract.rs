//! Delay and loss extraction. For every run of a sweep, the sent trace is matched against the
//! received trace by packet UID. Matched packets contribute a delay sample; unmatched packets are
//! copied to the run's diff file, whose line count is the run's loss count.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::layout::DataDir;
use crate::stats::DelaySamples;
use crate::sweep::SweepSpec;
use crate::trace::{ParseTraceError, TraceLine};
use crate::units::{BitsPerSec, Nanosecs};
use crate::{PacketUid, RunId};

/// The delay and loss of one run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunSummary {
    /// The run.
    pub run: RunId,
    /// Its offered load.
    pub load: BitsPerSec,
    /// Mean end-to-end delay in milliseconds. `None` if no packet was received.
    pub avg_delay_ms: Option<f64>,
    /// The number of delay samples behind `avg_delay_ms`.
    pub nr_samples: usize,
    /// The number of sent packets never received.
    pub lost: usize,
}

/// The result of matching a sent trace against a received trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Matching<'a> {
    /// One delay per matched sent record, in sent-trace order.
    pub delays: DelaySamples,
    /// Sent lines with no received counterpart, in sent-trace order.
    pub unmatched: Vec<&'a TraceLine>,
}

/// Matches every sent record with the first received record carrying the same UID, in
/// received-trace order.
///
/// Each sent record is matched independently, so sent records sharing a UID are all matched
/// against the same received record (or are all unmatched). Received records are indexed by UID
/// first, keeping only the earliest line for each UID.
pub fn match_traces<'a>(sent: &'a [TraceLine], received: &[TraceLine]) -> Matching<'a> {
    let mut first_rx: FxHashMap<PacketUid, Nanosecs> = FxHashMap::default();
    for line in received {
        first_rx.entry(line.record.uid).or_insert(line.record.time);
    }
    let mut delays = DelaySamples::new();
    let mut unmatched = Vec::new();
    for line in sent {
        match first_rx.get(&line.record.uid) {
            Some(&rx_time) => delays.push(rx_time - line.record.time),
            None => unmatched.push(line),
        }
    }
    Matching { delays, unmatched }
}

/// Extracts the delay and loss of a single run from the traces in `data_dir`.
///
/// The diff file is truncated before it is written, so extracting the same run twice reports
/// the same loss count.
pub fn extract_run(
    data_dir: &DataDir,
    run: RunId,
    load: BitsPerSec,
) -> Result<RunSummary, ExtractError> {
    info!("Getting delay for load: {load}");
    let sent = read_trace(data_dir.sent(run))?;
    let received = read_trace(data_dir.received(run))?;
    let matching = match_traces(&sent, &received);

    let diff_path = data_dir.diff(run);
    write_diff(&diff_path, &matching.unmatched).map_err(|source| ExtractError::Io {
        path: diff_path.clone(),
        source,
    })?;
    let lost = count_lines(&diff_path)?;

    let avg_delay_ms = matching.delays.mean_ms();
    match avg_delay_ms {
        Some(avg) => info!("Delay for {load} is: {avg} ms"),
        None => warn!("Run {run} ({load}) has no received packets; its average delay is undefined"),
    }
    Ok(RunSummary {
        run,
        load,
        avg_delay_ms,
        nr_samples: matching.delays.len(),
        lost,
    })
}

/// Extracts the delay and loss of every run of `spec`, in sweep order. Stops at the first run
/// whose traces are missing or malformed.
pub fn extract_sweep(
    data_dir: &DataDir,
    spec: &SweepSpec,
) -> Result<Vec<RunSummary>, ExtractError> {
    spec.runs()
        .map(|(run, load)| extract_run(data_dir, run, load))
        .collect()
}

/// Reads and parses a trace file. Blank lines are skipped. Each line keeps its terminator, so
/// lost packets reach the diff file byte for byte.
pub fn read_trace(path: impl AsRef<Path>) -> Result<Vec<TraceLine>, ExtractError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ExtractError::Open {
        path: path.into(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut nr = 0;
    loop {
        let mut raw = String::new();
        let n = reader
            .read_line(&mut raw)
            .map_err(|source| ExtractError::Io {
                path: path.into(),
                source,
            })?;
        if n == 0 {
            break;
        }
        nr += 1;
        if raw.trim().is_empty() {
            continue;
        }
        let line = TraceLine::parse(raw).map_err(|source| ExtractError::Parse {
            path: path.into(),
            line: nr,
            source,
        })?;
        lines.push(line);
    }
    Ok(lines)
}

fn write_diff(path: &Path, unmatched: &[&TraceLine]) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for line in unmatched {
        w.write_all(line.raw.as_bytes())?;
        // A final line without a terminator still counts as a line of the diff.
        if !line.raw.ends_with('\n') {
            w.write_all(b"\n")?;
        }
    }
    w.flush()
}

fn count_lines(path: &Path) -> Result<usize, ExtractError> {
    let file = File::open(path).map_err(|source| ExtractError::Open {
        path: path.into(),
        source,
    })?;
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        line.map_err(|source| ExtractError::Io {
            path: path.into(),
            source,
        })?;
        count += 1;
    }
    Ok(count)
}

/// Error extracting delays and losses.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A trace or diff file could not be opened.
    #[error("could not open file: {}", path.display())]
    Open {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A trace line is malformed.
    #[error("malformed trace line {}:{line}", path.display())]
    Parse {
        /// The trace file.
        path: PathBuf,
        /// The 1-based line number.
        line: usize,
        /// The underlying error.
        #[source]
        source: ParseTraceError,
    },

    /// Error reading or writing an open file.
    #[error("IO error on {}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing;

    fn lines(raw: &[String]) -> anyhow::Result<Vec<TraceLine>> {
        Ok(raw
            .iter()
            .map(|l| TraceLine::parse(l.as_str()))
            .collect::<Result<Vec<_>, _>>()?)
    }

    #[test]
    fn delay_and_loss_of_two_packet_run() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let data_dir = DataDir::new(dir.path());
        let run = RunId::new(0);
        testing::write_trace(&data_dir.sent(run), &[testing::tx(100, 1), testing::tx(200, 2)])?;
        testing::write_trace(&data_dir.received(run), &[testing::rx(150, 1)])?;

        let summary = extract_run(&data_dir, run, BitsPerSec::from_mbps(80))?;
        assert_eq!(summary.nr_samples, 1);
        assert_eq!(summary.avg_delay_ms, Some(0.00005));
        assert_eq!(summary.lost, 1);
        let diff = std::fs::read_to_string(data_dir.diff(run))?;
        assert_eq!(diff, format!("{}\n", testing::tx(200, 2)));
        Ok(())
    }

    #[test]
    fn loss_count_is_set_difference() -> anyhow::Result<()> {
        let sent = lines(&[
            testing::tx(0, 1),
            testing::tx(10, 2),
            testing::tx(20, 3),
            testing::tx(30, 4),
        ])?;
        // Received traces can be out of order and contain packets that were never sent.
        let received = lines(&[testing::rx(45, 4), testing::rx(25, 2), testing::rx(99, 7)])?;
        let matching = match_traces(&sent, &received);
        let lost = matching
            .unmatched
            .iter()
            .map(|l| l.record.uid.inner())
            .collect::<Vec<_>>();
        assert_eq!(lost, vec![1, 3]);
        let delays = matching.delays.iter().map(|d| d.into_i64()).collect::<Vec<_>>();
        assert_eq!(delays, vec![15, 15]);
        Ok(())
    }

    #[test]
    fn duplicate_received_uid_uses_earliest_line() -> anyhow::Result<()> {
        let sent = lines(&[testing::tx(100, 5)])?;
        let received = lines(&[testing::rx(400, 5), testing::rx(130, 5)])?;
        let matching = match_traces(&sent, &received);
        let delays = matching.delays.iter().map(|d| d.into_i64()).collect::<Vec<_>>();
        assert_eq!(delays, vec![300]);
        Ok(())
    }

    #[test]
    fn duplicate_sent_uids_are_matched_independently() -> anyhow::Result<()> {
        let sent = lines(&[
            testing::tx(100, 5),
            testing::tx(120, 5),
            testing::tx(140, 6),
            testing::tx(160, 6),
        ])?;
        let received = lines(&[testing::rx(200, 5)])?;
        let matching = match_traces(&sent, &received);
        let delays = matching.delays.iter().map(|d| d.into_i64()).collect::<Vec<_>>();
        assert_eq!(delays, vec![100, 80]);
        assert_eq!(matching.unmatched.len(), 2);
        Ok(())
    }

    #[test]
    fn re_extracting_does_not_append_to_diff() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let data_dir = DataDir::new(dir.path());
        let run = RunId::new(3);
        testing::write_trace(
            &data_dir.sent(run),
            &[testing::tx(0, 1), testing::tx(5, 2), testing::tx(9, 3)],
        )?;
        testing::write_trace(&data_dir.received(run), &[testing::rx(7, 2)])?;
        let first = extract_run(&data_dir, run, BitsPerSec::from_mbps(100))?;
        let second = extract_run(&data_dir, run, BitsPerSec::from_mbps(100))?;
        assert_eq!(first.lost, 2);
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn nothing_sent_means_no_mean_and_no_loss() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let data_dir = DataDir::new(dir.path());
        let run = RunId::new(0);
        testing::write_trace(&data_dir.sent(run), &[])?;
        testing::write_trace(&data_dir.received(run), &[])?;
        let summary = extract_run(&data_dir, run, BitsPerSec::from_mbps(80))?;
        assert_eq!(summary.avg_delay_ms, None);
        assert_eq!(summary.nr_samples, 0);
        assert_eq!(summary.lost, 0);
        Ok(())
    }

    #[test]
    fn diff_keeps_crlf_terminators() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let data_dir = DataDir::new(dir.path());
        let run = RunId::new(0);
        let lost = testing::tx(200, 2);
        std::fs::write(
            data_dir.sent(run),
            format!("{}\r\n{lost}\r\n{}", testing::tx(100, 1), testing::tx(300, 3)),
        )?;
        testing::write_trace(&data_dir.received(run), &[testing::rx(150, 1)])?;

        let summary = extract_run(&data_dir, run, BitsPerSec::from_mbps(80))?;
        assert_eq!(summary.lost, 2);
        let diff = std::fs::read_to_string(data_dir.diff(run))?;
        assert_eq!(diff, format!("{lost}\r\n{}\n", testing::tx(300, 3)));
        Ok(())
    }

    #[test]
    fn missing_trace_names_the_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let data_dir = DataDir::new(dir.path());
        let run = RunId::new(1);
        testing::write_trace(&data_dir.sent(run), &[testing::tx(0, 1)])?;
        let err = extract_run(&data_dir, run, BitsPerSec::from_mbps(80)).unwrap_err();
        match err {
            ExtractError::Open { path, .. } => assert_eq!(path, data_dir.received(run)),
            e => panic!("unexpected error: {e}"),
        }
        Ok(())
    }

    #[test]
    fn malformed_line_reports_line_number() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("OnOffTx0");
        std::fs::write(&path, format!("{}\n\ngarbage\n", testing::tx(0, 1)))?;
        let err = read_trace(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Parse { line: 3, .. }));
        Ok(())
    }

    #[test]
    fn sweep_is_extracted_in_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let data_dir = DataDir::new(dir.path());
        let spec = SweepSpec::builder()
            .loads(vec![BitsPerSec::from_mbps(80), BitsPerSec::from_mbps(90)])
            .build();
        testing::write_trace(&data_dir.sent(RunId::new(0)), &[testing::tx(0, 1)])?;
        testing::write_trace(&data_dir.received(RunId::new(0)), &[testing::rx(2_500_000, 1)])?;
        testing::write_trace(
            &data_dir.sent(RunId::new(1)),
            &[testing::tx(0, 1), testing::tx(0, 2)],
        )?;
        testing::write_trace(&data_dir.received(RunId::new(1)), &[])?;
        let summaries = extract_sweep(&data_dir, &spec)?;
        insta::assert_yaml_snapshot!(summaries, @r###"
        ---
        - run: 0
          load: 80000000
          avg_delay_ms: 2.5
          nr_samples: 1
          lost: 0
        - run: 1
          load: 90000000
          avg_delay_ms: ~
          nr_samples: 0
          lost: 2
        "###);
        Ok(())
    }
}
