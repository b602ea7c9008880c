// src/depends/store.rs

//! The merged, substituted view of every dependency declaration.
//!
//! Loading is two-phase: all files are parsed first, then merged into one
//! immutable [`DependencyStore`]. Nothing downstream ever sees an
//! unexpanded variable.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::config::depends_file::{DependsFile, SectionFlavor, SectionHeader, SectionKind};
use crate::depends::substitute::{
    KERNEL_HEADER_SUFFIX, dedup_ordered, expand_in_place, expand_in_set, is_kernel_header,
    platform_values, push_unique,
};
use crate::errors::{Result, SpkError};
use crate::fs::FileSystem;
use crate::types::{EdgeKind, ProjectName, VIRTUAL_SEPARATOR, de_virtual, is_virtual, normalize};

pub const SECTION_VARIABLES: &str = "variables";
pub const SECTION_DEPENDS: &str = "project dependency";
pub const SECTION_DEPENDS64: &str = "64bit project dependency";
pub const SECTION_KERNEL: &str = "${Kernel}";
pub const SECTION_KERNEL_LEGACY: &str = "platform kernel";
pub const SECTION_DYNAMIC: &str = "dynamic variable list";
/// Placeholder expanded from `[platform kernel]` in files that predate
/// `[dynamic variable list]`.
pub const LEGACY_KERNEL_VARIABLE: &str = "${KernelProjs}";

const CONF_DIR: &str = "SynoBuildConf";
const DEPENDS_FILE: &str = "depends";

/// Options that shape a load: the platform filter and the project that is
/// never built.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub platforms: Vec<String>,
    pub libc_project: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            platforms: Vec::new(),
            libc_project: "uclibc0929".to_string(),
        }
    }
}

/// Dependencies declared by one project's own `depends*` file, already
/// narrowed to the platform filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDeclaration {
    pub build: Vec<ProjectName>,
    pub build_tag: Vec<ProjectName>,
    pub reference: Vec<ProjectName>,
    pub reference_tag: Vec<ProjectName>,
    pub build64: Vec<ProjectName>,
    pub build_tag64: Vec<ProjectName>,
    /// `[BuildDependent-Bug]`: replacement dependency lists for other
    /// projects' central entries.
    pub bug_overrides: BTreeMap<ProjectName, Vec<ProjectName>>,
    pub bug_overrides64: BTreeMap<ProjectName, Vec<ProjectName>>,
}

impl ProjectDeclaration {
    /// Collect the sections of `file` that apply to `platforms`.
    ///
    /// For each section kind a platform uses its platform-scoped section when
    /// one names it, else the unscoped one. Platforms are unioned. An empty
    /// filter reads only the unscoped sections.
    pub fn from_file(file: &DependsFile, platforms: &[String]) -> Self {
        let mut decl = ProjectDeclaration::default();

        let headers: Vec<(SectionHeader, &crate::config::Section)> = file
            .sections()
            .filter_map(|s| SectionHeader::parse(&s.name).map(|h| (h, s)))
            .collect();

        let wanted: Vec<Option<&String>> = if platforms.is_empty() {
            vec![None]
        } else {
            platforms.iter().map(Some).collect()
        };

        for platform in wanted {
            let mut chosen: BTreeMap<(SectionKind, SectionFlavor, bool), &crate::config::Section> =
                BTreeMap::new();
            for (header, section) in headers.iter() {
                let key = (header.kind, header.flavor, header.is64);
                let scoped = platform.is_some_and(|p| header.platforms.contains(p));
                if scoped {
                    chosen.insert(key, section);
                } else if header.applies_to_all() {
                    chosen.entry(key).or_insert(section);
                }
            }

            for ((kind, flavor, is64), section) in chosen {
                match (kind, flavor, is64) {
                    (SectionKind::Build, SectionFlavor::Bug, false) => {
                        decl.bug_overrides.extend(section.key_values())
                    }
                    (SectionKind::Build, SectionFlavor::Bug, true) => {
                        decl.bug_overrides64.extend(section.key_values())
                    }
                    _ => {
                        let target = decl.list_mut(kind, flavor, is64);
                        push_unique(target, &section.entries());
                    }
                }
            }
        }

        decl
    }

    fn list_mut(&mut self, kind: SectionKind, flavor: SectionFlavor, is64: bool) -> &mut Vec<ProjectName> {
        match (kind, flavor, is64) {
            (SectionKind::Build, SectionFlavor::Tag, false) => &mut self.build_tag,
            (SectionKind::Build, SectionFlavor::Tag, true) => &mut self.build_tag64,
            (SectionKind::Build, _, true) => &mut self.build64,
            (SectionKind::Build, _, false) => &mut self.build,
            (SectionKind::Reference, SectionFlavor::Tag, _) => &mut self.reference_tag,
            (SectionKind::Reference, _, _) => &mut self.reference,
        }
    }

    pub fn edges(&self, kind: EdgeKind) -> &[ProjectName] {
        match kind {
            EdgeKind::Build => &self.build,
            EdgeKind::BuildTag => &self.build_tag,
            EdgeKind::Reference => &self.reference,
            EdgeKind::ReferenceTag => &self.reference_tag,
        }
    }
}

/// Input project list after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedInput {
    pub projects: Vec<ProjectName>,
    /// A kernel header project was requested and dropped from `projects`.
    pub wants_kernel_header: bool,
}

#[derive(Debug, Clone)]
pub struct DependencyStore {
    platforms: Vec<String>,
    libc_project: String,
    variables: BTreeMap<String, Vec<String>>,
    /// Dynamic variable -> its platform-scoped section.
    dynamic: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    kernel_section: BTreeMap<String, Vec<String>>,
    /// Kernel projects of the active platforms.
    kernels: Vec<ProjectName>,
    /// Every kernel project named anywhere in the kernel section.
    all_kernels: BTreeSet<ProjectName>,
    depends: BTreeMap<ProjectName, Vec<ProjectName>>,
    depends64: Option<BTreeMap<ProjectName, Vec<ProjectName>>>,
    /// `[project dependency]` exactly as declared centrally.
    central: BTreeMap<ProjectName, Vec<ProjectName>>,
    declarations: BTreeMap<ProjectName, ProjectDeclaration>,
}

impl DependencyStore {
    /// Read the central file and every `<source_dir>/*/SynoBuildConf/depends*`.
    pub fn load(
        fs: &dyn FileSystem,
        project_depends: &Path,
        source_dir: &Path,
        options: &LoadOptions,
    ) -> Result<Self> {
        let text = fs
            .read_to_string(project_depends)
            .with_context(|| format!("loading central dependency file {}", project_depends.display()))?;
        let central = DependsFile::parse(&text);

        let mut project_files = Vec::new();
        if fs.is_dir(source_dir) {
            for project_dir in fs.read_dir(source_dir)? {
                let conf_dir = project_dir.join(CONF_DIR);
                if !fs.is_dir(&conf_dir) {
                    continue;
                }
                let Some(project) = project_dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                for path in fs.read_dir(&conf_dir)? {
                    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    let Some(name) = declared_project(project, file_name) else {
                        continue;
                    };
                    if !fs.is_file(&path) {
                        continue;
                    }
                    let text = fs.read_to_string(&path)?;
                    tracing::debug!(project = %name, path = %path.display(), "loaded depends file");
                    project_files.push((name, DependsFile::parse(&text)));
                }
            }
        } else {
            tracing::warn!(dir = %source_dir.display(), "source directory not found, using central declarations only");
        }

        Self::from_sources(&central, project_files, options)
    }

    /// Merge already parsed files into a store.
    pub fn from_sources(
        central: &DependsFile,
        project_files: Vec<(ProjectName, DependsFile)>,
        options: &LoadOptions,
    ) -> Result<Self> {
        let platforms = options.platforms.clone();

        let declarations: BTreeMap<ProjectName, ProjectDeclaration> = project_files
            .into_iter()
            .map(|(name, file)| {
                let decl = ProjectDeclaration::from_file(&file, &platforms);
                (normalize(&name), decl)
            })
            .collect();

        let central_depends = central.key_values(SECTION_DEPENDS);
        let mut depends = central_depends.clone();
        let mut depends64 = central
            .has_section(SECTION_DEPENDS64)
            .then(|| central.key_values(SECTION_DEPENDS64));

        // Phase one: union every project's own build edges into its entry.
        for (name, decl) in declarations.iter() {
            let entry = depends.entry(name.clone()).or_default();
            push_unique(entry, &decl.build);
            push_unique(entry, &decl.build_tag);
            if let Some(d64) = depends64.as_mut() {
                let entry = d64.entry(name.clone()).or_default();
                push_unique(entry, &decl.build64);
                push_unique(entry, &decl.build_tag64);
            }
        }

        // Phase two: bug overrides replace existing entries outright.
        for (name, decl) in declarations.iter() {
            apply_overrides(&mut depends, &decl.bug_overrides, name);
            if let Some(d64) = depends64.as_mut() {
                apply_overrides(d64, &decl.bug_overrides64, name);
            }
        }

        let kernel_section = if central.has_section(SECTION_KERNEL) {
            central.key_values(SECTION_KERNEL)
        } else {
            central.key_values(SECTION_KERNEL_LEGACY)
        };
        let all_kernels = kernel_section.values().flatten().cloned().collect();
        let kernels = if kernel_section.is_empty() {
            Vec::new()
        } else {
            platform_values(SECTION_KERNEL, &kernel_section, &platforms)?
        };

        let mut dynamic = BTreeMap::new();
        if central.has_section(SECTION_DYNAMIC) {
            let list = central
                .key_values(SECTION_DYNAMIC)
                .remove("list")
                .unwrap_or_default();
            for var in list {
                if !central.has_section(&var) {
                    return Err(SpkError::ConfigError(format!(
                        "[{var}] not in project.depends"
                    )));
                }
                let section = central.key_values(&var);
                dynamic.insert(var, section);
            }
        } else if !kernel_section.is_empty() {
            dynamic.insert(LEGACY_KERNEL_VARIABLE.to_string(), kernel_section.clone());
        }
        if !kernel_section.is_empty() {
            dynamic
                .entry(SECTION_KERNEL.to_string())
                .or_insert_with(|| kernel_section.clone());
        }

        let mut store = Self {
            platforms,
            libc_project: options.libc_project.clone(),
            variables: central.key_values(SECTION_VARIABLES),
            dynamic,
            kernel_section,
            kernels,
            all_kernels,
            depends: BTreeMap::new(),
            depends64: None,
            central: central_depends,
            declarations,
        };

        store.depends = store.substitute_map(depends)?;
        store.depends64 = match depends64 {
            Some(d64) => Some(store.substitute_map(d64)?),
            None => None,
        };

        tracing::debug!(
            projects = store.depends.len(),
            declarations = store.declarations.len(),
            kernels = ?store.kernels,
            "dependency store loaded"
        );

        Ok(store)
    }

    /// Expand variables in keys and values of an edge map.
    fn substitute_map(
        &self,
        mut map: BTreeMap<ProjectName, Vec<ProjectName>>,
    ) -> Result<BTreeMap<ProjectName, Vec<ProjectName>>> {
        // A variable used as a key declares the same edges for every value.
        for (var, values) in self.variables.iter() {
            if let Some(edges) = map.remove(var) {
                for value in values {
                    push_unique(map.entry(value.clone()).or_default(), &edges);
                }
            }
        }

        let mut out = BTreeMap::new();
        for (name, mut list) in map {
            self.substitute_list(&mut list)?;
            if name == self.libc_project {
                continue;
            }
            out.insert(name, list);
        }
        Ok(out)
    }

    /// Expand variables, dynamic variables and kernel projects in an
    /// ordered dependency list and drop the libc project.
    pub fn substitute_list(&self, list: &mut Vec<ProjectName>) -> Result<()> {
        for (var, values) in self.variables.iter() {
            expand_in_place(list, var, values);
        }
        for (var, section) in self.dynamic.iter() {
            if list.contains(var) {
                let values = platform_values(var, section, &self.platforms)?;
                expand_in_place(list, var, &values);
            }
        }
        let mut expanded = Vec::with_capacity(list.len());
        for name in list.drain(..) {
            if self.all_kernels.contains(&name) && !self.kernels.contains(&name) {
                push_unique(&mut expanded, &self.kernels);
            } else {
                expanded.push(name);
            }
        }
        *list = expanded;
        list.retain(|p| *p != self.libc_project && !p.is_empty());
        dedup_ordered(list);
        Ok(())
    }

    /// Expansion for an unordered resolver category. Plain variables also
    /// pull in the active kernels.
    pub fn substitute_category(&self, set: &mut BTreeSet<ProjectName>) -> Result<()> {
        for (var, section) in self.dynamic.iter() {
            if set.contains(var) {
                let values = platform_values(var, section, &self.platforms)?;
                expand_in_set(set, var, &values);
            }
        }
        for (var, values) in self.variables.iter() {
            if set.contains(var) {
                let mut values = values.clone();
                push_unique(&mut values, &self.kernels);
                expand_in_set(set, var, &values);
            }
        }
        set.remove(&self.libc_project);
        Ok(())
    }

    /// Normalize caller-supplied project names.
    ///
    /// Kernel header projects are dropped and flagged, configured kernel
    /// projects become the active kernels, the libc project is dropped.
    pub fn normalize_inputs(&self, inputs: &[String]) -> NormalizedInput {
        let mut out = NormalizedInput::default();
        for raw in inputs {
            let name = normalize(raw);
            if name.is_empty() {
                continue;
            }
            if is_kernel_header(&name) {
                out.wants_kernel_header = true;
                continue;
            }
            if self.all_kernels.contains(&name) {
                push_unique(&mut out.projects, &self.kernels);
                continue;
            }
            if name == self.libc_project {
                continue;
            }
            push_unique(&mut out.projects, std::slice::from_ref(&name));
        }
        out
    }

    /// Forward edges of `name`. The 64-bit entry wins when requested and
    /// non-empty; a virtual project without an entry uses its base project's.
    pub fn forward_edges(&self, name: &str, use64: bool) -> &[ProjectName] {
        match self.lookup_edges(name, use64) {
            Some(edges) => edges,
            None if is_virtual(name) => self.lookup_edges(de_virtual(name), use64).unwrap_or(&[]),
            None => &[],
        }
    }

    fn lookup_edges(&self, name: &str, use64: bool) -> Option<&[ProjectName]> {
        if use64 {
            if let Some(edges) = self.depends64.as_ref().and_then(|d| d.get(name)) {
                if !edges.is_empty() {
                    return Some(edges);
                }
            }
        }
        self.depends.get(name).map(Vec::as_slice)
    }

    /// Projects whose forward edges name `name`, by a full scan.
    pub fn scan_dependents(&self, name: &str, use64: bool) -> Vec<ProjectName> {
        let scan = |map: &BTreeMap<ProjectName, Vec<ProjectName>>| -> Vec<ProjectName> {
            map.iter()
                .filter(|(_, deps)| deps.iter().any(|d| d == name))
                .map(|(k, _)| k.clone())
                .collect()
        };

        if use64 {
            if let Some(d64) = self.depends64.as_ref() {
                let found = scan(d64);
                if !found.is_empty() {
                    return found;
                }
            }
        }
        scan(&self.depends)
    }

    /// Every project with an edge entry.
    pub fn projects(&self) -> BTreeSet<ProjectName> {
        let mut all: BTreeSet<ProjectName> = self.depends.keys().cloned().collect();
        if let Some(d64) = self.depends64.as_ref() {
            all.extend(d64.keys().cloned());
        }
        all
    }

    /// The project's own declaration file, falling back to the base project
    /// for virtual names.
    pub fn declaration(&self, name: &str) -> Option<&ProjectDeclaration> {
        self.declarations.get(name).or_else(|| {
            if is_virtual(name) {
                self.declarations.get(de_virtual(name))
            } else {
                None
            }
        })
    }

    /// Raw `[project dependency]` entry, before per-project merges and
    /// substitution.
    pub fn central_entry(&self, name: &str) -> Option<&[ProjectName]> {
        self.central.get(name).map(Vec::as_slice)
    }

    pub fn has_depends64(&self) -> bool {
        self.depends64.is_some()
    }

    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    pub fn kernels(&self) -> &[ProjectName] {
        &self.kernels
    }

    pub fn kernel_section(&self) -> &BTreeMap<String, Vec<String>> {
        &self.kernel_section
    }

    pub fn kernel_headers(&self) -> Vec<ProjectName> {
        self.kernels
            .iter()
            .map(|k| format!("{k}{KERNEL_HEADER_SUFFIX}"))
            .collect()
    }

    /// Every dependency cycle among the declared edges: strongly connected
    /// components with more than one project, plus self loops.
    pub fn cycles(&self, use64: bool) -> Vec<Vec<ProjectName>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        let names = self.projects();
        for name in names.iter() {
            graph.add_node(name.as_str());
            for dep in self.forward_edges(name, use64) {
                graph.add_edge(name.as_str(), dep.as_str(), ());
            }
        }

        let mut cycles: Vec<Vec<ProjectName>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<ProjectName> = scc.into_iter().map(str::to_string).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }
}

/// Project declared by a file in `<project>/SynoBuildConf/`.
fn declared_project(project: &str, file_name: &str) -> Option<ProjectName> {
    if file_name == DEPENDS_FILE {
        return Some(project.to_string());
    }
    let variant = file_name
        .strip_prefix(DEPENDS_FILE)?
        .strip_prefix(VIRTUAL_SEPARATOR)?;
    if variant.is_empty() {
        return None;
    }
    Some(format!("{project}{VIRTUAL_SEPARATOR}{variant}"))
}

fn apply_overrides(
    depends: &mut BTreeMap<ProjectName, Vec<ProjectName>>,
    overrides: &BTreeMap<ProjectName, Vec<ProjectName>>,
    declared_by: &str,
) {
    for (target, list) in overrides {
        match depends.get_mut(target) {
            Some(entry) => {
                tracing::debug!(project = %target, by = %declared_by, "dependency list overridden");
                *entry = list.clone();
            }
            None => {
                tracing::warn!(project = %target, by = %declared_by, "override for unknown project ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::path::PathBuf;

    const CENTRAL: &str = r#"
[variables]
${KernelPacks}="synobios"

[project dependency]
app="libfoo ${KernelPacks}"
libfoo="zlib uclibc0929"
synobios="${Kernel}"
zlib=""

[${Kernel}]
x64="linux-4.4.x"
default="linux-3.10.x"

[dynamic variable list]
list="${Kernel}"
"#;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn options(platforms: &[&str]) -> LoadOptions {
        LoadOptions {
            platforms: s(platforms),
            ..LoadOptions::default()
        }
    }

    fn store(platforms: &[&str], files: Vec<(&str, &str)>) -> DependencyStore {
        let files = files
            .into_iter()
            .map(|(n, t)| (n.to_string(), DependsFile::parse(t)))
            .collect();
        DependencyStore::from_sources(&DependsFile::parse(CENTRAL), files, &options(platforms))
            .unwrap()
    }

    #[test]
    fn substitutes_variables_kernel_and_libc() {
        let store = store(&["x64"], vec![]);

        assert_eq!(store.forward_edges("app", false), s(&["libfoo", "synobios"]));
        assert_eq!(store.forward_edges("libfoo", false), s(&["zlib"]));
        assert_eq!(store.forward_edges("synobios", false), s(&["linux-4.4.x"]));
        assert_eq!(store.kernels(), s(&["linux-4.4.x"]));
        assert_eq!(store.kernel_headers(), s(&["linux-4.4.x-virtual-headers"]));
    }

    #[test]
    fn no_platform_filter_unions_kernels() {
        let store = store(&[], vec![]);
        assert_eq!(
            store.forward_edges("synobios", false),
            s(&["linux-3.10.x", "linux-4.4.x"])
        );
    }

    #[test]
    fn per_project_files_union_into_central() {
        let store = store(
            &[],
            vec![("libfoo", "[BuildDependent]\nopenssl\nzlib\n[BuildDependent-Tag]\ncurl\n")],
        );
        assert_eq!(
            store.forward_edges("libfoo", false),
            s(&["zlib", "openssl", "curl"])
        );
        let decl = store.declaration("libfoo").unwrap();
        assert_eq!(decl.build, s(&["openssl", "zlib"]));
        assert_eq!(decl.build_tag, s(&["curl"]));
    }

    #[test]
    fn platform_scoped_sections_replace_unscoped() {
        let text = "[BuildDependent]\nzlib\n[BuildDependent:x64]\nzlib64\n";
        let x64 = store(&["x64"], vec![("libfoo", text)]);
        assert_eq!(x64.declaration("libfoo").unwrap().build, s(&["zlib64"]));

        let armada = store(&["armada"], vec![("libfoo", text)]);
        assert_eq!(armada.declaration("libfoo").unwrap().build, s(&["zlib"]));

        let both = store(&["x64", "armada"], vec![("libfoo", text)]);
        assert_eq!(both.declaration("libfoo").unwrap().build, s(&["zlib64", "zlib"]));
    }

    #[test]
    fn bug_override_replaces_central_entry() {
        let store = store(
            &[],
            vec![("app", "[BuildDependent-Bug]\nlibfoo=\"openssl\"\nghost=\"x\"\n")],
        );
        assert_eq!(store.forward_edges("libfoo", false), s(&["openssl"]));
        assert!(store.forward_edges("ghost", false).is_empty());
    }

    #[test]
    fn virtual_projects_fall_back_to_base() {
        let store = store(&[], vec![("libfoo", "[BuildDependent]\nzlib\n")]);
        assert_eq!(
            store.forward_edges("libfoo-virtual-32", false),
            store.forward_edges("libfoo", false)
        );
        assert!(store.declaration("libfoo-virtual-32").is_some());
    }

    #[test]
    fn missing_platform_is_fatal_at_load() {
        let central = DependsFile::parse("[${Kernel}]\nx64=\"linux-4.4.x\"\n");
        let err = DependencyStore::from_sources(&central, vec![], &options(&["armada"]))
            .unwrap_err();
        assert!(matches!(err, SpkError::MissingPlatform { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn normalizes_inputs() {
        let store = store(&["x64"], vec![]);
        let input = store.normalize_inputs(&s(&[
            "app/",
            "linux-3.10.x",
            "linux-4.4.x-virtual-headers",
            "uclibc0929",
        ]));
        assert_eq!(input.projects, s(&["app", "linux-4.4.x"]));
        assert!(input.wants_kernel_header);
    }

    #[test]
    fn reverse_scan_and_cycles() {
        let central = DependsFile::parse(
            "[project dependency]\na=\"b\"\nb=\"a\"\nc=\"c\"\nd=\"a\"\n",
        );
        let store = DependencyStore::from_sources(&central, vec![], &options(&[])).unwrap();

        assert_eq!(store.scan_dependents("a", false), s(&["b", "d"]));
        assert_eq!(store.cycles(false), vec![s(&["a", "b"]), s(&["c"])]);
    }

    #[test]
    fn loads_from_source_tree() {
        let fs = MockFileSystem::new();
        fs.add_file("/tree/include/project.depends", CENTRAL);
        fs.add_file("/tree/source/libfoo/SynoBuildConf/depends", "[BuildDependent]\nopenssl\n");
        fs.add_file(
            "/tree/source/libfoo/SynoBuildConf/depends-virtual-32",
            "[BuildDependent]\nzlib32\n",
        );
        fs.add_file("/tree/source/libfoo/SynoBuildConf/depends.orig", "[BuildDependent]\nx\n");
        fs.add_file("/tree/source/readme/README", "");

        let store = DependencyStore::load(
            &fs,
            &PathBuf::from("/tree/include/project.depends"),
            &PathBuf::from("/tree/source"),
            &options(&["x64"]),
        )
        .unwrap();

        assert_eq!(store.forward_edges("libfoo", false), s(&["zlib", "openssl"]));
        assert_eq!(store.forward_edges("libfoo-virtual-32", false), s(&["zlib32"]));
        assert!(store.declaration("readme").is_none());
    }

    #[test]
    fn declared_project_names() {
        assert_eq!(declared_project("libfoo", "depends").as_deref(), Some("libfoo"));
        assert_eq!(
            declared_project("libfoo", "depends-virtual-32").as_deref(),
            Some("libfoo-virtual-32")
        );
        assert_eq!(declared_project("libfoo", "depends.orig"), None);
        assert_eq!(declared_project("libfoo", "depends-virtual-"), None);
    }
}
