// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Stage names accepted under `[stage.<name>]`, in execution order.
pub const STAGE_ORDER: [&str; 4] = ["prepare", "build", "install", "collect"];

/// Top-level configuration as read from `Spkforge.toml`.
///
/// ```toml
/// [config]
/// jobs = 4
/// check_conflict = true
///
/// [paths]
/// project_depends = "include/project.depends"
/// source_dir = "source"
///
/// [platforms]
/// arch64 = ["x64", "avoton"]
///
/// [env]
/// chroot = "build_env/ds.{platform}-{version}"
/// [env.versions]
/// all = "7.2-64570"
///
/// [stage.build]
/// cmd = "chroot {chroot} /pkgscripts-ng/SynoBuild --{platform} -c {projects}"
/// log = "logs.build"
/// ```
///
/// Every section is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub platforms: PlatformsSection,

    #[serde(default)]
    pub env: EnvSection,

    /// All stages from `[stage.<name>]`.
    #[serde(default)]
    pub stage: BTreeMap<String, StageConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub platforms: PlatformsSection,
    pub env: EnvSection,
    /// Configured stages, already sorted into execution order.
    pub stages: Vec<(String, StageConfig)>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        let mut stage = raw.stage;
        let stages = STAGE_ORDER
            .iter()
            .filter_map(|name| stage.remove(*name).map(|cfg| (name.to_string(), cfg)))
            .collect();

        Self {
            config: raw.config,
            paths: raw.paths,
            platforms: raw.platforms,
            env: raw.env,
            stages,
        }
    }

    /// Number of concurrent platform jobs; `0` means the available CPU count.
    pub fn effective_jobs(&self) -> usize {
        match self.config.jobs {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Parallel platform jobs; `0` selects the CPU count.
    #[serde(default)]
    pub jobs: usize,

    /// Abort resolution when a project lands in two exclusive categories.
    #[serde(default = "default_check_conflict")]
    pub check_conflict: bool,

    /// Project that is never a build target.
    #[serde(default = "default_libc_project")]
    pub libc_project: String,

    /// Directory holding traversal snapshots; system temp dir when unset.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

fn default_check_conflict() -> bool {
    true
}

fn default_libc_project() -> String {
    "uclibc0929".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            jobs: 0,
            check_conflict: default_check_conflict(),
            libc_project: default_libc_project(),
            snapshot_dir: None,
        }
    }
}

/// `[paths]` section. Relative paths are resolved against the directory
/// holding the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_project_depends")]
    pub project_depends: PathBuf,

    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
}

fn default_project_depends() -> PathBuf {
    PathBuf::from("include/project.depends")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("source")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            project_depends: default_project_depends(),
            source_dir: default_source_dir(),
        }
    }
}

/// `[platforms]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformsSection {
    /// Platforms whose builds use the 64-bit dependency section.
    #[serde(default = "default_arch64")]
    pub arch64: Vec<String>,
}

fn default_arch64() -> Vec<String> {
    ["x64", "bromolow", "cedarview", "avoton", "braswell"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for PlatformsSection {
    fn default() -> Self {
        Self {
            arch64: default_arch64(),
        }
    }
}

/// `[env]` section: where the per-platform build environments live.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvSection {
    /// Chroot path template; `{platform}` and `{version}` are expanded.
    #[serde(default = "default_chroot")]
    pub chroot: String,

    /// Toolkit version per platform; the `all` key applies to every platform
    /// without its own entry.
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
}

fn default_chroot() -> String {
    "build_env/ds.{platform}-{version}".to_string()
}

impl Default for EnvSection {
    fn default() -> Self {
        Self {
            chroot: default_chroot(),
            versions: BTreeMap::new(),
        }
    }
}

impl EnvSection {
    /// Toolkit version configured for `platform`, falling back to `all`.
    pub fn version_for(&self, platform: &str) -> Option<&str> {
        self.versions
            .get(platform)
            .or_else(|| self.versions.get("all"))
            .map(String::as_str)
    }

    pub fn chroot_for(&self, platform: &str, version: &str) -> PathBuf {
        PathBuf::from(
            self.chroot
                .replace("{platform}", platform)
                .replace("{version}", version),
        )
    }
}

/// `[stage.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Shell command template. Placeholders: `{chroot}`, `{platform}`,
    /// `{package}`, `{projects}`, `{version}`.
    pub cmd: String,

    /// Log file name inside the chroot; `logs.<stage>` when unset.
    #[serde(default)]
    pub log: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let raw: RawConfigFile = toml::from_str("").unwrap();
        let cfg = ConfigFile::new_unchecked(raw);

        assert!(cfg.config.check_conflict);
        assert_eq!(cfg.config.libc_project, "uclibc0929");
        assert_eq!(cfg.paths.source_dir, PathBuf::from("source"));
        assert!(cfg.platforms.arch64.contains(&"x64".to_string()));
        assert!(cfg.stages.is_empty());
    }

    #[test]
    fn stages_sorted_into_execution_order() {
        let raw: RawConfigFile = toml::from_str(
            r#"
            [stage.collect]
            cmd = "collect {platform}"

            [stage.prepare]
            cmd = "prepare {platform}"

            [stage.build]
            cmd = "build {projects}"
            "#,
        )
        .unwrap();
        let cfg = ConfigFile::new_unchecked(raw);
        let names: Vec<&str> = cfg.stages.iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(names, vec!["prepare", "build", "collect"]);
    }

    #[test]
    fn version_falls_back_to_all() {
        let mut env = EnvSection::default();
        env.versions.insert("all".into(), "7.2".into());
        env.versions.insert("x64".into(), "7.1".into());

        assert_eq!(env.version_for("x64"), Some("7.1"));
        assert_eq!(env.version_for("armada"), Some("7.2"));
        assert_eq!(
            env.chroot_for("armada", "7.2"),
            PathBuf::from("build_env/ds.armada-7.2")
        );
    }
}
