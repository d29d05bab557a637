//! Newtype identifiers: every domain primitive (`SessionId`, `DeviceId`,
//! ...) gets its own tuple struct rather than a raw integer or string
//! passed around by convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// Application-level user identifier ("fid").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fid(pub u64);

impl Fid {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// SyncId's fid slot is 4 bytes big-endian. `encode` is a
    /// total function, so this truncates rather than failing;
    /// real fids are well within `u32::MAX`.
    pub fn to_be_bytes(self) -> [u8; 4] {
        (self.0 as u32).to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes) as u64)
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Fid {
    type Err = HubError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| HubError::parse_failure(format!("invalid fid {s:?}: {e}")))
    }
}

impl From<u64> for Fid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Message-family discriminant ("type", a `u8` enum). Opaque to the
/// core beyond its role in set-postfix derivation (`sync_id::set_postfix`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MsgType(pub u8);

impl MsgType {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for MsgType {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Application-epoch seconds ("timestamp", a `u32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u32);

impl Timestamp {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Timestamp {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Opaque remote-peer handle. The transport that resolves a `PeerId` to an
/// address is out of scope; the core only needs it as a map key
/// and a label for logging/events.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fid_round_trips_through_be_bytes() {
        let fid = Fid::new(42);
        let bytes = fid.to_be_bytes();
        assert_eq!(Fid::from_be_bytes(bytes), fid);
    }

    #[test]
    fn fid_over_u32_range_truncates_rather_than_failing() {
        let fid = Fid::new(u64::from(u32::MAX) + 1);
        assert_eq!(Fid::from_be_bytes(fid.to_be_bytes()), Fid::new(0));
    }

    #[test]
    fn fid_parses_from_str() {
        assert_eq!("123".parse::<Fid>().unwrap(), Fid::new(123));
        assert!("abc".parse::<Fid>().is_err());
    }
}
