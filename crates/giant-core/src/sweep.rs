//! This module defines the [`SweepSpec`], which describes the offered loads to sweep over and the
//! simulation parameters shared by every run. Every field defaults to the values of the GIANT
//! evaluation, so a config file only needs to name what it changes.

use std::path::{Path, PathBuf};

use crate::constants::{IP_HEADER_SIZE, UDP_HEADER_SIZE};
use crate::units::{BitsPerSec, Bytes, Secs};
use crate::RunId;

/// A load sweep.
#[derive(Debug, Clone, PartialEq, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SweepSpec {
    /// Offered loads, one simulation each. Run `i` simulates `loads[i]`.
    #[builder(default = default_loads())]
    pub loads: Vec<BitsPerSec>,
    /// Parameters shared by all runs.
    #[builder(default)]
    pub params: SimParams,
}

impl Default for SweepSpec {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn default_loads() -> Vec<BitsPerSec> {
    [80, 90, 100, 110, 120, 130, 140, 150]
        .into_iter()
        .map(BitsPerSec::from_mbps)
        .collect()
}

impl SweepSpec {
    /// Reads a `SweepSpec` from a file in JSON or Dhall format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let spec: SweepSpec = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("dhall") => serde_dhall::from_str(&contents).parse().map_err(Box::new)?,
            _ => return Err(ConfigError::UnknownFileType(path.into())),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Checks that the sweep can be run.
    ///
    /// Correctness properties:
    ///
    /// - There is at least one load
    /// - Every load is positive
    /// - The packet size is positive
    /// - There is at least one ONU
    /// - The byte cap `packet_size * nr_packets` fits in a `u64`
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.loads.is_empty() {
            return Err(SweepError::NoLoads);
        }
        if let Some(run) = self.loads.iter().position(|&l| l == BitsPerSec::ZERO) {
            return Err(SweepError::ZeroLoad(RunId::new(run)));
        }
        if self.params.packet_size == Bytes::ZERO {
            return Err(SweepError::ZeroPacketSize);
        }
        if self.params.nr_onus == 0 {
            return Err(SweepError::NoOnus);
        }
        if self.params.checked_max_bytes().is_none() {
            return Err(SweepError::ByteCapOverflow {
                packet_size: self.params.packet_size,
                nr_packets: self.params.nr_packets,
            });
        }
        Ok(())
    }

    /// The runs of the sweep, in order.
    pub fn runs(&self) -> impl Iterator<Item = (RunId, BitsPerSec)> + '_ {
        self.loads
            .iter()
            .enumerate()
            .map(|(i, &load)| (RunId::new(i), load))
    }

    pub fn nr_runs(&self) -> usize {
        self.loads.len()
    }
}

/// Simulation parameters shared by every run of a sweep.
#[derive(Debug, Clone, PartialEq, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// The number of ONUs.
    #[builder(default = 16)]
    pub nr_onus: u32,
    /// The application payload size.
    #[builder(default = Bytes::new(1472))]
    pub packet_size: Bytes,
    /// The number of packets each application sends. Zero means no limit.
    #[builder(default = 0)]
    pub nr_packets: u64,
    /// Simulated time.
    #[builder(default = Secs::new(5))]
    pub sim_time: Secs,
    /// How long the applications run.
    #[builder(default = Secs::new(5))]
    pub app_time: Secs,
    /// Bandwidth allocated to each T-CONT class.
    #[builder(default)]
    pub bandwidth: BandwidthClasses,
}

impl Default for SimParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SimParams {
    /// The byte cap handed to the applications (`--MaxBytes`). Only meaningful for parameters
    /// that passed [`SweepSpec::validate`].
    pub fn max_bytes(&self) -> Bytes {
        self.packet_size.scale_by(self.nr_packets)
    }

    /// The byte cap, or `None` if it overflows.
    pub fn checked_max_bytes(&self) -> Option<Bytes> {
        self.packet_size.checked_scale_by(self.nr_packets)
    }

    /// The size of a packet at the IP level, including the IP and UDP headers.
    pub fn ip_packet_size(&self) -> Bytes {
        self.packet_size + IP_HEADER_SIZE + UDP_HEADER_SIZE
    }
}

/// Per-class bandwidth allocations, in bits per second.
#[derive(Debug, Clone, PartialEq, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BandwidthClasses {
    #[builder(default = BitsPerSec::new(128_000))]
    pub fixed: BitsPerSec,
    #[builder(default = BitsPerSec::new(140_928_000))]
    pub assured: BitsPerSec,
    #[builder(default = BitsPerSec::ZERO)]
    pub non_assured: BitsPerSec,
    #[builder(default = BitsPerSec::ZERO)]
    pub best_effort: BitsPerSec,
}

impl Default for BandwidthClasses {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// An invalid sweep.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SweepError {
    /// The sweep has no loads.
    #[error("the sweep has no loads")]
    NoLoads,

    /// A run has a zero offered load.
    #[error("run {0} has a zero offered load")]
    ZeroLoad(RunId),

    /// The packet size is zero.
    #[error("the packet size must be positive")]
    ZeroPacketSize,

    /// There are no ONUs.
    #[error("there must be at least one ONU")]
    NoOnus,

    /// The byte cap does not fit in 64 bits.
    #[error("{nr_packets} packets of {packet_size} overflow the byte cap")]
    ByteCapOverflow {
        /// The packet size.
        packet_size: Bytes,
        /// The packet count.
        nr_packets: u64,
    },
}

/// Error reading a sweep configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Unknown file type.
    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    /// Error deserializing Dhall.
    #[error("Dhall error")]
    Dhall(#[from] Box<serde_dhall::Error>),

    /// Error deserializing JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// The configuration describes an invalid sweep.
    #[error("invalid sweep")]
    Invalid(#[from] SweepError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_giant_evaluation() {
        let spec = SweepSpec::default();
        assert_eq!(spec.nr_runs(), 8);
        assert_eq!(spec.loads[0], BitsPerSec::new(80_000_000));
        assert_eq!(spec.loads[7], BitsPerSec::new(150_000_000));
        assert_eq!(spec.params.nr_onus, 16);
        assert_eq!(spec.params.max_bytes(), Bytes::ZERO);
        assert_eq!(spec.params.ip_packet_size(), Bytes::new(1500));
        assert_eq!(spec.params.bandwidth.assured, BitsPerSec::new(140_928_000));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn max_bytes_scales_with_packet_count() {
        let params = SimParams::builder()
            .packet_size(Bytes::new(1000))
            .nr_packets(25)
            .build();
        assert_eq!(params.max_bytes(), Bytes::new(25_000));
    }

    #[test]
    fn runs_are_numbered_in_order() {
        let spec = SweepSpec::builder()
            .loads(vec![BitsPerSec::from_mbps(10), BitsPerSec::from_mbps(20)])
            .build();
        let runs = spec.runs().collect::<Vec<_>>();
        assert_eq!(
            runs,
            vec![
                (RunId::new(0), BitsPerSec::from_mbps(10)),
                (RunId::new(1), BitsPerSec::from_mbps(20)),
            ]
        );
    }

    #[test]
    fn invalid_sweeps_are_rejected() {
        let empty = SweepSpec::builder().loads(Vec::new()).build();
        assert_eq!(empty.validate(), Err(SweepError::NoLoads));

        let zero = SweepSpec::builder()
            .loads(vec![BitsPerSec::from_mbps(10), BitsPerSec::ZERO])
            .build();
        assert_eq!(zero.validate(), Err(SweepError::ZeroLoad(RunId::new(1))));

        let no_onus = SweepSpec::builder()
            .params(SimParams::builder().nr_onus(0).build())
            .build();
        assert_eq!(no_onus.validate(), Err(SweepError::NoOnus));
    }

    #[test]
    fn overflowing_byte_cap_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sweep.json");
        std::fs::write(&path, r#"{ "params": { "nr_packets": 18446744073709551615 } }"#)?;
        let err = SweepSpec::from_file(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(SweepError::ByteCapOverflow {
                packet_size,
                nr_packets: u64::MAX,
            }) if packet_size == Bytes::new(1472)
        ));

        let at_limit = SweepSpec::builder()
            .params(
                SimParams::builder()
                    .packet_size(Bytes::ONE)
                    .nr_packets(u64::MAX)
                    .build(),
            )
            .build();
        assert!(at_limit.validate().is_ok());
        assert_eq!(at_limit.params.max_bytes(), Bytes::new(u64::MAX));
        Ok(())
    }

    #[test]
    fn partial_json_config_keeps_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sweep.json");
        std::fs::write(
            &path,
            r#"{ "loads": [50000000, 60000000], "params": { "nr_onus": 4 } }"#,
        )?;
        let spec = SweepSpec::from_file(&path)?;
        assert_eq!(spec.loads, vec![BitsPerSec::from_mbps(50), BitsPerSec::from_mbps(60)]);
        assert_eq!(spec.params.nr_onus, 4);
        assert_eq!(spec.params.packet_size, Bytes::new(1472));
        assert_eq!(spec.params.bandwidth, BandwidthClasses::default());
        Ok(())
    }

    #[test]
    fn unknown_config_extension() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sweep.toml");
        std::fs::write(&path, "")?;
        let err = SweepSpec::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFileType(p) if p == path));
        Ok(())
    }
}
