//! Dot-separated release version comparison.
//!
//! Versions are compared as numeric tuples: `"1.10.0"` ranks above
//! `"1.2.0"` because 10 > 2, which lexicographic string comparison gets
//! wrong. Missing components count as 0, so `"1.2"` equals `"1.2.0"`.

use std::cmp::Ordering;

/// A parsed release version.
///
/// Non-numeric components parse as 0; a garbage version string therefore
/// compares like `0.0.0` instead of failing the update check.
#[derive(Debug, Clone)]
pub struct ReleaseVersion {
    components: Vec<u64>,
}

impl ReleaseVersion {
    pub fn parse(s: &str) -> Self {
        let components = s
            .trim()
            .split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect();
        Self { components }
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Equality must agree with the ordering: "1.2" and "1.2.0" are the same
// version.
impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseVersion {}

/// True when `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    ReleaseVersion::parse(candidate) > ReleaseVersion::parse(current)
}
