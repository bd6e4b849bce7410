//! Format revisions and the layout decisions gated on them.

use std::fmt;

use crate::error::Error;

/// MST format revision carried in the stream header.
///
/// The predicate methods below are the single source of truth for every
/// version-dependent layout difference:
///
/// | field                         | V1    | V2..V3 | V4  | V5  |
/// |-------------------------------|-------|--------|-----|-----|
/// | PBR emissive filler byte      | yes   | —      | —   | —   |
/// | instance feature width        | u32   | u32/u64| u64 | u64 |
/// | `BaseMesh::code`              | —     | —      | yes | yes |
/// | mesh/node/instance properties | —     | —      | —   | yes |
///
/// (feature width switches to u64 at V3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum Version {
    V1 = 1,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
}

impl Version {
    /// Newest revision; what `Mesh::new` defaults to.
    pub const LATEST: Version = Version::V5;

    /// V1 wrote a four-byte emissive; later revisions dropped the filler
    /// byte after the three color components.
    pub fn pbr_filler_byte(self) -> bool {
        self < Version::V2
    }

    /// Instance features are u32 on disk before V3, u64 from V3 on.
    pub fn wide_features(self) -> bool {
        self >= Version::V3
    }

    /// `BaseMesh::code` is persisted from V4 on.
    pub fn has_code(self) -> bool {
        self >= Version::V4
    }

    /// Mesh-, node- and instance-level properties are persisted from V5 on.
    pub fn has_properties(self) -> bool {
        self >= Version::V5
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Version {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self, Error> {
        match raw {
            1 => Ok(Version::V1),
            2 => Ok(Version::V2),
            3 => Ok(Version::V3),
            4 => Ok(Version::V4),
            5 => Ok(Version::V5),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating_table() {
        assert!(Version::V1.pbr_filler_byte());
        assert!(!Version::V2.pbr_filler_byte());

        assert!(!Version::V2.wide_features());
        assert!(Version::V3.wide_features());

        assert!(!Version::V3.has_code());
        assert!(Version::V4.has_code());

        assert!(!Version::V4.has_properties());
        assert!(Version::V5.has_properties());
    }

    #[test]
    fn round_trips_raw_value() {
        for raw in 1..=5u32 {
            assert_eq!(Version::try_from(raw).unwrap().as_u32(), raw);
        }
        assert!(Version::try_from(0).is_err());
        assert!(Version::try_from(6).is_err());
    }
}
