//! Constants shared with the ns-3 GIANT example. File names and the data directory are fixed by
//! the example's trace sinks.

use crate::units::Bytes;

/// The IPv4 header size.
pub const IP_HEADER_SIZE: Bytes = Bytes::new(20);

/// The UDP header size.
pub const UDP_HEADER_SIZE: Bytes = Bytes::new(8);

/// The environment variable holding the root of the ns-3 tree.
pub const NS3_ENV: &str = "NS3";

/// The directory, relative to the ns-3 root, where the example writes its traces.
pub const DATA_SUBDIR: &str = "data/giant-data";

/// Prefix of the sent-packet trace of a run.
pub const SENT_PREFIX: &str = "OnOffTx";

/// Prefix of the received-packet trace of a run.
pub const RECEIVED_PREFIX: &str = "PktSinkRx";

/// Prefix of the file listing sent packets that were never received.
pub const DIFF_PREFIX: &str = "Diff";

/// Prefix of the file capturing the simulator's stdout and stderr.
pub const NS3_OUTPUT_PREFIX: &str = "Ns3Output";

/// The default number of simulations run at once.
pub const DEFAULT_WORKERS: usize = 8;
