//! CPU architecture selector.

use crate::error::SchemaError;

/// CPU architecture a device reports (e.g. `armv8`, `armv7`, `x86_64`).
///
/// Unlike a fixed enum, fleets carry arbitrary architectures, so this is an
/// open newtype. The value is trimmed and lower-cased on construction. Any
/// non-empty string is accepted, including names such as `arm64-v8a`.
///
/// # Example
///
/// ```
/// use ota_schema::CpuArch;
///
/// let arch: CpuArch = "ARMv8".parse().unwrap();
/// assert_eq!(arch.as_str(), "armv8");
/// assert_eq!(arch.os_app(), "os_armv8");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CpuArch(String);

/// Prefix of the app id carrying the base OS image for an architecture.
pub const OS_APP_PREFIX: &str = "os_";

impl CpuArch {
    /// Convert to string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// App id of the OS image for this architecture (`os_<arch>`).
    pub fn os_app(&self) -> String {
        format!("{OS_APP_PREFIX}{}", self.0)
    }
}

impl std::fmt::Display for CpuArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CpuArch {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return Err(SchemaError::InvalidArch(s.to_string()));
        }
        Ok(Self(lowered))
    }
}

impl TryFrom<String> for CpuArch {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CpuArch> for String {
    fn from(arch: CpuArch) -> Self {
        arch.0
    }
}
