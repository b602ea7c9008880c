// src/depends/substitute.rs

//! Placeholder expansion helpers shared by the store and the resolver.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{Result, SpkError};

static KERNEL_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^linux-.*-virtual-headers$")
        .unwrap_or_else(|e| panic!("invalid kernel header regex: {e}"))
});

/// Suffix that turns a kernel project into its header project.
pub const KERNEL_HEADER_SUFFIX: &str = "-virtual-headers";

pub fn is_kernel_header(name: &str) -> bool {
    KERNEL_HEADER_RE.is_match(name)
}

/// Values of a platform-scoped section (`[${Kernel}]` and friends) for the
/// requested platforms.
///
/// Each platform takes its own entry, else the `default` entry. With no
/// platforms every entry contributes. Order follows first appearance.
pub fn platform_values(
    section_name: &str,
    section: &BTreeMap<String, Vec<String>>,
    platforms: &[String],
) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();

    if platforms.is_empty() {
        for values in section.values() {
            push_unique(&mut out, values);
        }
        return Ok(out);
    }

    for platform in platforms {
        let values = section
            .get(platform)
            .or_else(|| section.get("default"))
            .ok_or_else(|| SpkError::MissingPlatform {
                platform: platform.clone(),
                section: section_name.to_string(),
            })?;
        push_unique(&mut out, values);
    }

    Ok(out)
}

/// Replace every occurrence of `placeholder` in `list` with `values`,
/// keeping the position of the first occurrence.
pub fn expand_in_place(list: &mut Vec<String>, placeholder: &str, values: &[String]) -> bool {
    let Some(pos) = list.iter().position(|p| p == placeholder) else {
        return false;
    };
    list.retain(|p| p != placeholder);
    let insert_at = pos.min(list.len());
    for (offset, value) in values.iter().enumerate() {
        list.insert(insert_at + offset, value.clone());
    }
    true
}

/// Same as [`expand_in_place`] for an unordered category set.
pub fn expand_in_set(set: &mut BTreeSet<String>, placeholder: &str, values: &[String]) -> bool {
    if !set.remove(placeholder) {
        return false;
    }
    set.extend(values.iter().cloned());
    true
}

/// Drop repeated names, keeping the first occurrence.
pub fn dedup_ordered(list: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    list.retain(|p| seen.insert(p.clone()));
}

/// Append the names of `extra` that `list` does not hold yet.
pub fn push_unique(list: &mut Vec<String>, extra: &[String]) {
    for name in extra {
        if !list.contains(name) {
            list.push(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn kernel_section() -> BTreeMap<String, Vec<String>> {
        let mut section = BTreeMap::new();
        section.insert("x64".to_string(), s(&["linux-4.4.x"]));
        section.insert("default".to_string(), s(&["linux-3.10.x"]));
        section
    }

    #[test]
    fn detects_kernel_headers() {
        assert!(is_kernel_header("linux-4.4.x-virtual-headers"));
        assert!(!is_kernel_header("linux-4.4.x"));
        assert!(!is_kernel_header("linux-virtual-headers"));
    }

    #[test]
    fn platform_values_fall_back_to_default() {
        let section = kernel_section();
        assert_eq!(
            platform_values("${Kernel}", &section, &s(&["x64", "armada"])).unwrap(),
            s(&["linux-4.4.x", "linux-3.10.x"])
        );
        assert_eq!(
            platform_values("${Kernel}", &section, &[]).unwrap(),
            s(&["linux-3.10.x", "linux-4.4.x"])
        );
    }

    #[test]
    fn missing_platform_without_default_is_fatal() {
        let mut section = kernel_section();
        section.remove("default");
        let err = platform_values("${Kernel}", &section, &s(&["armada"])).unwrap_err();
        assert!(matches!(err, SpkError::MissingPlatform { platform, .. } if platform == "armada"));
    }

    #[test]
    fn expands_placeholder_at_its_position() {
        let mut list = s(&["a", "${V}", "b", "${V}"]);
        assert!(expand_in_place(&mut list, "${V}", &s(&["x", "y"])));
        assert_eq!(list, s(&["a", "x", "y", "b"]));
        assert!(!expand_in_place(&mut list, "${W}", &s(&["z"])));
    }
}
