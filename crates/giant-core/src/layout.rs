//! Paths of the per-run files in the ns-3 data directory.

use std::path::{Path, PathBuf};

use crate::constants::{
    DATA_SUBDIR, DIFF_PREFIX, NS3_OUTPUT_PREFIX, RECEIVED_PREFIX, SENT_PREFIX,
};
use crate::RunId;

/// The directory holding the traces of a sweep. Files for run `i` are named `<prefix><i>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Creates a `DataDir` rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data directory of an ns-3 tree, `<ns3>/data/giant-data`.
    pub fn from_ns3_root(ns3_dir: impl AsRef<Path>) -> Self {
        Self::new(ns3_dir.as_ref().join(DATA_SUBDIR))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The sent-packet trace (`OnOffTx<i>`).
    pub fn sent(&self, run: RunId) -> PathBuf {
        self.file(SENT_PREFIX, run)
    }

    /// The received-packet trace (`PktSinkRx<i>`).
    pub fn received(&self, run: RunId) -> PathBuf {
        self.file(RECEIVED_PREFIX, run)
    }

    /// The lost-packet listing (`Diff<i>`).
    pub fn diff(&self, run: RunId) -> PathBuf {
        self.file(DIFF_PREFIX, run)
    }

    /// The simulator's captured console output (`Ns3Output<i>`).
    pub fn ns3_output(&self, run: RunId) -> PathBuf {
        self.file(NS3_OUTPUT_PREFIX, run)
    }

    fn file(&self, prefix: &str, run: RunId) -> PathBuf {
        self.root.join(format!("{prefix}{run}"))
    }
}
