#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use spkforge::config::{ConfigFile, DependsFile, RawConfigFile, StageConfig};
use spkforge::depends::{DependencyStore, LoadOptions};

/// Builder for `DependencyStore` to simplify test setup.
///
/// Central `[project dependency]` entries and per-project `depends` files
/// are kept as text, so the same fixture can be parsed in memory
/// ([`StoreBuilder::build`]) or written to disk
/// ([`StoreBuilder::write_workspace`]).
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    central: BTreeMap<String, Vec<String>>,
    extra_sections: Vec<String>,
    project_files: BTreeMap<String, String>,
    platforms: Vec<String>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Central `[project dependency]` entry.
    pub fn depends(mut self, project: &str, deps: &[&str]) -> Self {
        self.central.insert(
            project.to_string(),
            deps.iter().map(|d| d.to_string()).collect(),
        );
        self
    }

    /// A chain `a -> b -> c ...` (each depends on the next).
    pub fn chain(mut self, names: &[&str]) -> Self {
        for pair in names.windows(2) {
            self = self.depends(pair[0], &[pair[1]]);
        }
        if let Some(last) = names.last() {
            self.central.entry(last.to_string()).or_default();
        }
        self
    }

    /// Raw text appended to the central file (e.g. `[${Kernel}]` sections).
    pub fn central_section(mut self, text: &str) -> Self {
        self.extra_sections.push(text.to_string());
        self
    }

    /// Contents of `source/<project>/SynoBuildConf/depends`.
    pub fn project_file(mut self, project: &str, text: &str) -> Self {
        self.project_files.insert(project.to_string(), text.to_string());
        self
    }

    pub fn platforms(mut self, platforms: &[&str]) -> Self {
        self.platforms = platforms.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn central_text(&self) -> String {
        let mut text = String::from("[project dependency]\n");
        for (project, deps) in self.central.iter() {
            text.push_str(&format!("{project}=\"{}\"\n", deps.join(" ")));
        }
        for section in self.extra_sections.iter() {
            text.push('\n');
            text.push_str(section);
            text.push('\n');
        }
        text
    }

    pub fn options(&self) -> LoadOptions {
        LoadOptions {
            platforms: self.platforms.clone(),
            ..LoadOptions::default()
        }
    }

    pub fn build(self) -> DependencyStore {
        let central = DependsFile::parse(&self.central_text());
        let files = self
            .project_files
            .iter()
            .map(|(name, text)| (name.clone(), DependsFile::parse(text)))
            .collect();
        DependencyStore::from_sources(&central, files, &self.options())
            .expect("Failed to build store from builder")
    }

    /// Write `include/project.depends` and the per-project files under
    /// `root`, and return a config pointing at them with `stages`.
    pub fn write_workspace(&self, root: &Path, stages: &[(&str, &str)]) -> ConfigFile {
        let include = root.join("include");
        fs::create_dir_all(&include).expect("create include dir");
        fs::write(include.join("project.depends"), self.central_text()).expect("write central file");

        for (project, text) in self.project_files.iter() {
            let conf = root.join("source").join(project).join("SynoBuildConf");
            fs::create_dir_all(&conf).expect("create SynoBuildConf");
            fs::write(conf.join("depends"), text).expect("write depends file");
        }

        let mut raw = RawConfigFile::default();
        raw.paths.project_depends = include.join("project.depends");
        raw.paths.source_dir = root.join("source");
        raw.env.chroot = root.join("build_env/ds.{platform}-{version}").display().to_string();
        raw.env.versions.insert("all".to_string(), "7.2-64570".to_string());
        for (name, cmd) in stages {
            raw.stage.insert(
                name.to_string(),
                StageConfig {
                    cmd: cmd.to_string(),
                    log: None,
                },
            );
        }
        ConfigFile::try_from(raw).expect("Failed to build valid config from builder")
    }
}

/// Create the chroot directory of each platform as `cfg` resolves it.
pub fn create_chroots(cfg: &ConfigFile, platforms: &[&str]) {
    for platform in platforms {
        let version = cfg
            .env
            .version_for(platform)
            .unwrap_or_else(|| panic!("no toolkit version for {platform}"));
        fs::create_dir_all(cfg.env.chroot_for(platform, version)).expect("create chroot");
    }
}
