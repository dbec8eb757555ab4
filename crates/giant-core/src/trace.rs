//! The grammar of the packet traces written by the ns-3 GIANT example. Each line records one
//! packet event:
//!
//! ```text
//! Tx Time: +100.0ns Pkt UId *1& Payload (size=1472)
//! Rx Time: +150.0ns Pkt UId *1& Payload (size=1472)
//! ```
//!
//! The timestamp follows the first `+` and ends at the first `.`, the packet UID sits between
//! the first `*` and the next `&`, and the payload size follows `size=` up to `)`.

use std::num::ParseIntError;
use std::str::FromStr;

use crate::units::{Bytes, Nanosecs};
use crate::PacketUid;

/// A parsed trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// When the event happened. Fractional nanoseconds are truncated.
    pub time: Nanosecs,
    /// The ns-3 packet UID.
    pub uid: PacketUid,
    /// The application payload size.
    pub size: Bytes,
}

impl FromStr for TraceRecord {
    type Err = ParseTraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_trace_line(s)
    }
}

/// A trace line together with its parsed record. The raw text is what gets copied to the diff
/// file when the packet is lost.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct TraceLine {
    /// The line as read, including its terminator if it had one.
    pub raw: String,
    /// The parsed fields.
    pub record: TraceRecord,
}

impl TraceLine {
    /// Parses `raw` into a `TraceLine`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ParseTraceError> {
        let raw = raw.into();
        let record = parse_trace_line(&raw)?;
        Ok(Self::new(raw, record))
    }
}

/// Parses a single trace line.
pub fn parse_trace_line(line: &str) -> Result<TraceRecord, ParseTraceError> {
    let time = delimited(line, TraceField::Timestamp, "+", ".")?;
    let uid = delimited(line, TraceField::Uid, "*", "&")?;
    let size = delimited(line, TraceField::Size, "size=", ")")?;
    Ok(TraceRecord {
        time: Nanosecs::new(parse_field(TraceField::Timestamp, time)?),
        uid: PacketUid::new(parse_field(TraceField::Uid, uid)?),
        size: Bytes::new(parse_field(TraceField::Size, size)?),
    })
}

// Returns the text between the first `open` and the first `close` that follows it.
fn delimited<'a>(
    line: &'a str,
    field: TraceField,
    open: &'static str,
    close: &'static str,
) -> Result<&'a str, ParseTraceError> {
    let missing = || ParseTraceError::MissingField { field, open, close };
    let (_, rest) = line.split_once(open).ok_or_else(missing)?;
    let (value, _) = rest.split_once(close).ok_or_else(missing)?;
    Ok(value)
}

fn parse_field<T>(field: TraceField, value: &str) -> Result<T, ParseTraceError>
where
    T: FromStr<Err = ParseIntError>,
{
    value
        .trim()
        .parse()
        .map_err(|source| ParseTraceError::InvalidField {
            field,
            value: value.to_owned(),
            source,
        })
}

/// The fields of a trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TraceField {
    /// The event timestamp.
    #[display(fmt = "timestamp")]
    Timestamp,
    /// The packet UID.
    #[display(fmt = "packet UID")]
    Uid,
    /// The payload size.
    #[display(fmt = "payload size")]
    Size,
}

/// Error parsing a trace line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTraceError {
    /// A field delimiter is missing.
    #[error("missing {field} (expected text between `{open}` and `{close}`)")]
    MissingField {
        /// The missing field.
        field: TraceField,
        /// Opening delimiter.
        open: &'static str,
        /// Closing delimiter.
        close: &'static str,
    },

    /// A field is present but not an integer.
    #[error("invalid {field} `{value}`")]
    InvalidField {
        /// The offending field.
        field: TraceField,
        /// Its text.
        value: String,
        /// The underlying error.
        #[source]
        source: ParseIntError,
    },
}
