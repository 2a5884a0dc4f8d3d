use crate::error::{IrError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Versions of the IR format the converter can emit.
const SUPPORTED_IR_VERSIONS: &[u32] = &[10, 11];

/// A supported IR format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct IrVersion(u32);

impl IrVersion {
    /// Newest supported version; the default target.
    pub const LATEST: IrVersion = IrVersion(11);

    /// Validate `version` against the supported set.
    pub fn new(version: u32) -> Result<Self> {
        if SUPPORTED_IR_VERSIONS.contains(&version) {
            Ok(Self(version))
        } else {
            Err(IrError::UnsupportedIrVersion {
                version,
                supported: SUPPORTED_IR_VERSIONS,
            })
        }
    }

    /// All versions the converter can emit.
    pub fn supported() -> &'static [u32] {
        SUPPORTED_IR_VERSIONS
    }

    /// Numeric version.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for IrVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl TryFrom<u32> for IrVersion {
    type Error = IrError;

    fn try_from(version: u32) -> Result<Self> {
        Self::new(version)
    }
}

impl From<IrVersion> for u32 {
    fn from(version: IrVersion) -> Self {
        version.0
    }
}

impl FromStr for IrVersion {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self> {
        let version = s
            .trim()
            .parse::<u32>()
            .map_err(|_| IrError::InvalidAttribute {
                name: "ir_version".to_string(),
                reason: format!("'{}' is not a version number", s),
            })?;
        Self::new(version)
    }
}

impl fmt::Display for IrVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_versions() {
        assert_eq!(IrVersion::new(10).unwrap().get(), 10);
        assert_eq!(IrVersion::default(), IrVersion::LATEST);
        assert!(matches!(
            IrVersion::new(7),
            Err(IrError::UnsupportedIrVersion { version: 7, .. })
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!("11".parse::<IrVersion>().unwrap(), IrVersion::LATEST);
        assert!("eleven".parse::<IrVersion>().is_err());
        assert!("12".parse::<IrVersion>().is_err());
    }

    #[test]
    fn test_serde_rejects_unsupported() {
        let version: IrVersion = serde_json::from_str("10").unwrap();
        assert_eq!(version.get(), 10);
        assert!(serde_json::from_str::<IrVersion>("3").is_err());
        assert_eq!(serde_json::to_string(&IrVersion::LATEST).unwrap(), "11");
    }
}
