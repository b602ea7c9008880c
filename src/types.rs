// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical project name type used throughout the crate.
pub type ProjectName = String;

/// Separator marking a virtual (variant) build of a base project,
/// e.g. `libfoo-virtual-32`.
pub const VIRTUAL_SEPARATOR: &str = "-virtual-";

/// Strip trailing slashes, so `source/libfoo/` style arguments match.
pub fn normalize(name: &str) -> ProjectName {
    name.trim().trim_end_matches('/').to_string()
}

pub fn is_virtual(name: &str) -> bool {
    name.contains(VIRTUAL_SEPARATOR)
}

/// Base project of a virtual project; the name itself otherwise.
pub fn de_virtual(name: &str) -> &str {
    match name.find(VIRTUAL_SEPARATOR) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Traversal direction over the dependency graph.
///
/// - `Forward`: follow what a project depends on.
/// - `Backward`: follow what depends on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Forward
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            other => Err(format!(
                "invalid direction: {other} (expected \"forward\" or \"backward\")"
            )),
        }
    }
}

/// Kind of a declared dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// `[BuildDependent]`: built from the live branch.
    Build,
    /// `[BuildDependent-Tag]`: pinned to a fixed revision.
    BuildTag,
    /// `[ReferenceOnly]`: visible to the build, never built.
    Reference,
    /// `[ReferenceOnly-Tag]`.
    ReferenceTag,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 4] = [
        EdgeKind::Build,
        EdgeKind::BuildTag,
        EdgeKind::Reference,
        EdgeKind::ReferenceTag,
    ];

    /// Section name used in dependency declaration files.
    pub fn section(self) -> &'static str {
        match self {
            EdgeKind::Build => "BuildDependent",
            EdgeKind::BuildTag => "BuildDependent-Tag",
            EdgeKind::Reference => "ReferenceOnly",
            EdgeKind::ReferenceTag => "ReferenceOnly-Tag",
        }
    }
}

/// Word size of a platform set, which selects the dependency section used
/// for traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformArch {
    Bits32,
    Bits64,
    Mixed,
}

impl PlatformArch {
    /// Classify `platforms` against the configured list of 64-bit platforms.
    ///
    /// An empty platform list counts as 32-bit, the generic section.
    pub fn classify(platforms: &[String], arch64: &[String]) -> Self {
        let is64 = |p: &String| arch64.contains(p);
        if platforms.iter().all(|p| !is64(p)) {
            PlatformArch::Bits32
        } else if platforms.iter().all(is64) {
            PlatformArch::Bits64
        } else {
            PlatformArch::Mixed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_names_fall_back_to_base() {
        assert!(is_virtual("libfoo-virtual-32"));
        assert_eq!(de_virtual("libfoo-virtual-32"), "libfoo");
        assert_eq!(de_virtual("libfoo"), "libfoo");
        assert_eq!(normalize("libfoo//"), "libfoo");
    }

    #[test]
    fn classifies_platform_sets() {
        let arch64 = vec!["x64".to_string(), "avoton".to_string()];
        let p = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(PlatformArch::classify(&p(&["x64", "avoton"]), &arch64), PlatformArch::Bits64);
        assert_eq!(PlatformArch::classify(&p(&["armada"]), &arch64), PlatformArch::Bits32);
        assert_eq!(PlatformArch::classify(&p(&["x64", "armada"]), &arch64), PlatformArch::Mixed);
        assert_eq!(PlatformArch::classify(&[], &arch64), PlatformArch::Bits32);
    }
}
