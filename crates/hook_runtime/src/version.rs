//! Plugin version numbers and minimum-version checks

use std::fmt;
use std::str::FromStr;

/// Three-part plugin version (`major.minor.patch`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionNumber {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parses a version constraint, returning `None` when it is unset or invalid.
    ///
    /// Missing trailing components default to zero (`"1.2"` is `1.2.0`). An
    /// all-zero version is treated as "no constraint".
    pub fn parse_constraint(s: &str) -> Option<Self> {
        let version = s.parse::<Self>().ok()?;
        version.is_valid().then_some(version)
    }

    /// Returns true if this version carries an actual constraint
    pub fn is_valid(&self) -> bool {
        *self != Self::default()
    }

    /// Returns true if `self` satisfies the minimum version `required`
    pub fn satisfies(&self, required: &VersionNumber) -> bool {
        !required.is_valid() || self >= required
    }
}

impl FromStr for VersionNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        if trimmed.is_empty() {
            return Err("empty version string".to_string());
        }

        let mut parts = [0u32; 3];
        for (index, part) in trimmed.split('.').enumerate() {
            if index >= parts.len() {
                return Err(format!("too many version components in '{}'", s));
            }
            parts[index] = part
                .parse::<u32>()
                .map_err(|e| format!("invalid version component '{}' in '{}': {}", part, s, e))?;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
