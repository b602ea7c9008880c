// src/dag/query.rs

//! The `depends` query: ordered build list for a set of projects.

use std::collections::BTreeSet;

use crate::dag::graph::DependencyGraph;
use crate::depends::DependencyStore;
use crate::errors::{Result, SpkError};
use crate::types::{Direction, PlatformArch, ProjectName};

#[derive(Debug, Clone, Default)]
pub struct DependsRequest {
    pub projects: Vec<String>,
    /// Explicit expansion depth and direction. `None` selects reorder mode:
    /// the inputs come back filtered to themselves, in dependency order.
    pub expand: Option<(usize, Direction)>,
    /// Prepend the active kernels' header projects.
    pub header: bool,
}

/// Compute the ordered project list for `request`.
///
/// The store's platform filter decides the word size: an all-64-bit set
/// reads the 64-bit section, a mixed set traverses both and appends what
/// the second pass adds.
pub fn compute_depends(
    store: &DependencyStore,
    arch64: &[String],
    request: &DependsRequest,
) -> Result<Vec<ProjectName>> {
    if request.projects.is_empty() {
        return platform_kernels(store, request.header);
    }

    let arch = PlatformArch::classify(store.platforms(), arch64);
    let use64 = arch == PlatformArch::Bits64 && store.has_depends64();
    let input = store.normalize_inputs(&request.projects);
    let (max_depth, direction) = request.expand.unwrap_or((0, Direction::Forward));

    let mut out = DependencyGraph::new(store, use64).traverse(&input.projects, max_depth, direction)?;

    if arch == PlatformArch::Mixed && store.has_depends64() {
        let extra = DependencyGraph::new(store, true).traverse(&input.projects, max_depth, direction)?;
        for name in extra {
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }

    if request.expand.is_none() {
        let wanted: BTreeSet<&ProjectName> = input.projects.iter().collect();
        out.retain(|p| wanted.contains(p));
    }

    let explicit_forward = matches!(request.expand, Some((_, Direction::Forward)));
    if input.wants_kernel_header || explicit_forward || request.header {
        let mut with_headers = store.kernel_headers();
        with_headers.extend(out);
        out = with_headers;
    }

    Ok(out)
}

/// With platforms but no projects, the answer is the platforms' kernels.
fn platform_kernels(store: &DependencyStore, header: bool) -> Result<Vec<ProjectName>> {
    if store.platforms().is_empty() {
        return Err(SpkError::ConfigError(
            "nothing to resolve: give projects or platforms".to_string(),
        ));
    }
    if store.kernels().is_empty() {
        return Err(SpkError::NoPlatformAvailable(format!(
            "no matching kernel found for {}",
            store.platforms().join(" ")
        )));
    }
    Ok(if header {
        store.kernel_headers()
    } else {
        store.kernels().to_vec()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DependsFile;
    use crate::depends::LoadOptions;

    const CENTRAL: &str = r#"
[project dependency]
app="libfoo"
libfoo="zlib"
zlib=""

[64bit project dependency]
libfoo="zlib64"

[${Kernel}]
x64="linux-4.4.x"
default="linux-3.10.x"
"#;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn store(platforms: &[&str]) -> DependencyStore {
        let options = LoadOptions {
            platforms: s(platforms),
            ..LoadOptions::default()
        };
        DependencyStore::from_sources(&DependsFile::parse(CENTRAL), vec![], &options).unwrap()
    }

    fn arch64() -> Vec<String> {
        s(&["x64"])
    }

    fn request(projects: &[&str], expand: Option<(usize, Direction)>) -> DependsRequest {
        DependsRequest {
            projects: s(projects),
            expand,
            header: false,
        }
    }

    #[test]
    fn reorder_mode_returns_inputs_in_dependency_order() {
        let store = store(&["armada"]);
        let out = compute_depends(&store, &arch64(), &request(&["app", "zlib"], None)).unwrap();
        assert_eq!(out, s(&["zlib", "app"]));
    }

    #[test]
    fn explicit_forward_depth_adds_kernel_headers() {
        let store = store(&["armada"]);
        let out = compute_depends(
            &store,
            &arch64(),
            &request(&["app"], Some((0, Direction::Forward))),
        )
        .unwrap();
        assert_eq!(
            out,
            s(&["linux-3.10.x-virtual-headers", "zlib", "libfoo", "app"])
        );
    }

    #[test]
    fn all_64bit_platforms_use_64bit_section() {
        let store = store(&["x64"]);
        let out = compute_depends(
            &store,
            &arch64(),
            &request(&["libfoo"], Some((0, Direction::Backward))),
        )
        .unwrap();
        assert_eq!(out, s(&["app", "libfoo"]));

        let out = compute_depends(&store, &arch64(), &request(&["app", "zlib64", "zlib"], None))
            .unwrap();
        assert_eq!(out, s(&["zlib64", "app", "zlib"]));
    }

    #[test]
    fn mixed_platforms_append_64bit_results() {
        let store = store(&["x64", "armada"]);
        let req = request(&["libfoo"], Some((0, Direction::Forward)));
        let out = compute_depends(&store, &arch64(), &req).unwrap();
        assert_eq!(
            out,
            s(&[
                "linux-4.4.x-virtual-headers",
                "linux-3.10.x-virtual-headers",
                "zlib",
                "libfoo",
                "zlib64",
            ])
        );
    }

    #[test]
    fn platforms_without_projects_print_kernels() {
        let x64 = store(&["x64"]);
        assert_eq!(
            compute_depends(&x64, &arch64(), &request(&[], None)).unwrap(),
            s(&["linux-4.4.x"])
        );

        let mut req = request(&[], None);
        req.header = true;
        assert_eq!(
            compute_depends(&x64, &arch64(), &req).unwrap(),
            s(&["linux-4.4.x-virtual-headers"])
        );

        let bare = store(&[]);
        assert!(compute_depends(&bare, &arch64(), &request(&[], None)).is_err());
    }
}
