macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub fn into_f64(self) -> f64 {
                self.0 as f64
            }

            pub const fn scale_by(self, n: u64) -> Self {
                Self(self.0 * n)
            }

            pub const fn checked_scale_by(self, n: u64) -> Option<Self> {
                match self.0.checked_mul(n) {
                    Some(v) => Some(Self(v)),
                    None => None,
                }
            }
        }
    };
}

unit!(Bytes);

impl Bytes {
    pub const fn into_bits(self) -> u64 {
        self.0 * 8
    }
}

impl std::fmt::Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.0)
    }
}

unit!(BitsPerSec);

impl BitsPerSec {
    pub const fn from_mbps(mbps: u64) -> Self {
        Self(mbps * 1_000_000)
    }

    pub fn into_mbps(self) -> f64 {
        self.0 as f64 * 1e-6
    }
}

impl std::fmt::Display for BitsPerSec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

unit!(Secs);

impl std::fmt::Display for Secs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// A simulation timestamp, or a difference of two, in nanoseconds. ns-3 prints times with an
/// explicit sign, so this is signed.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    derive_more::Add,
    derive_more::Sub,
    derive_more::FromStr,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Nanosecs(i64);

impl Nanosecs {
    pub const ZERO: Nanosecs = Self::new(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn into_i64(self) -> i64 {
        self.0
    }

    pub fn into_f64(self) -> f64 {
        self.0 as f64
    }
}

impl std::fmt::Display for Nanosecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Converts nanoseconds to milliseconds.
pub fn ns_to_ms(ns: f64) -> f64 {
    ns / 1e6
}
