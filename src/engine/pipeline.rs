// src/engine/pipeline.rs

//! Package pipeline: resolve, then run the configured stages per toolkit
//! version through the coordinator.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::dag::{BuildSet, BuildSetResolver, DependencyGraph, DependsCache, SourceUpdater};
use crate::depends::{DependencyStore, LoadOptions};
use crate::errors::{ActionFailures, Result, SpkError};
use crate::exec::{ActionOptions, BuildAction, CommandAction, ParallelCoordinator};
use crate::fs::FileSystem;
use crate::types::{PlatformArch, ProjectName};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRequest {
    pub package: String,
    pub platforms: Vec<String>,
    /// Resolution depth, `0` = unlimited.
    pub max_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: String,
    pub version: String,
    pub elapsed: Duration,
}

/// First stage that failed; later stages and versions were not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: String,
    pub version: String,
    pub failures: ActionFailures,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub build_sets: BTreeMap<String, BuildSet>,
    pub build_orders: BTreeMap<String, Vec<ProjectName>>,
    pub timings: Vec<StageTiming>,
    pub failure: Option<StageFailure>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// The stage failure as an error, if there was one.
    pub fn into_result(self) -> Result<Self> {
        match self.failure {
            Some(ref f) => Err(SpkError::BuildActionFailed(f.failures.clone())),
            None => Ok(self),
        }
    }
}

pub struct Pipeline<'a> {
    config: &'a ConfigFile,
    fs: &'a dyn FileSystem,
    updater: &'a dyn SourceUpdater,
    coordinator: ParallelCoordinator,
    actions: Vec<(String, Arc<dyn BuildAction>)>,
}

impl<'a> Pipeline<'a> {
    /// One [`CommandAction`] per configured stage, in stage order.
    pub fn new(config: &'a ConfigFile, fs: &'a dyn FileSystem, updater: &'a dyn SourceUpdater) -> Self {
        let actions = config
            .stages
            .iter()
            .map(|(name, stage)| {
                let action: Arc<dyn BuildAction> = Arc::new(CommandAction::new(stage.cmd.clone(), stage.log.clone()));
                (name.clone(), action)
            })
            .collect();

        Self {
            config,
            fs,
            updater,
            coordinator: ParallelCoordinator::new(config.effective_jobs()),
            actions,
        }
    }

    pub fn with_coordinator(mut self, coordinator: ParallelCoordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Replace the action of `stage`, or append the stage if it is not
    /// configured.
    pub fn with_action(mut self, stage: &str, action: Arc<dyn BuildAction>) -> Self {
        match self.actions.iter_mut().find(|(name, _)| name == stage) {
            Some(slot) => slot.1 = action,
            None => self.actions.push((stage.to_string(), action)),
        }
        self
    }

    pub fn coordinator(&self) -> &ParallelCoordinator {
        &self.coordinator
    }

    /// Platforms grouped by toolkit version.
    pub fn group_by_version(&self, platforms: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
        if platforms.is_empty() {
            return Err(SpkError::NoPlatformAvailable("no platform given".to_string()));
        }
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for platform in platforms {
            let version = self.config.env.version_for(platform).ok_or_else(|| {
                SpkError::NoPlatformAvailable(format!("no toolkit version configured for {platform}"))
            })?;
            let group = groups.entry(version.to_string()).or_default();
            if !group.contains(platform) {
                group.push(platform.clone());
            }
        }
        Ok(groups)
    }

    /// Version groups restricted to platforms whose chroot exists.
    ///
    /// Missing chroots are logged and dropped. Fails when nothing is left.
    pub fn available_platforms(&self, platforms: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
        let mut groups = self.group_by_version(platforms)?;
        for (version, group) in groups.iter_mut() {
            group.retain(|platform| {
                let chroot = self.config.env.chroot_for(platform, version);
                let found = self.fs.is_dir(&chroot);
                if !found {
                    warn!(platform = %platform, "Chroot `{}' not found.", chroot.display());
                }
                found
            });
        }
        groups.retain(|_, group| !group.is_empty());

        if groups.is_empty() {
            return Err(SpkError::NoPlatformAvailable(
                "All platform chroot not exists.".to_string(),
            ));
        }
        Ok(groups)
    }

    pub async fn run(&self, request: &PackageRequest) -> Result<PipelineReport> {
        let groups = self.available_platforms(&request.platforms)?;
        let mut cache = DependsCache::new();
        let mut report = PipelineReport::default();

        for (version, platforms) in groups {
            info!(version = %version, platforms = %platforms.join(" "), "processing toolkit version");

            let store = DependencyStore::load(
                self.fs,
                &self.config.paths.project_depends,
                &self.config.paths.source_dir,
                &LoadOptions {
                    platforms: platforms.clone(),
                    libc_project: self.config.config.libc_project.clone(),
                },
            )?;
            let set = BuildSetResolver::new(&store, self.updater)
                .with_conflict_check(self.config.config.check_conflict)
                .resolve(std::slice::from_ref(&request.package), request.max_depth, &mut cache)?;

            let arch = PlatformArch::classify(&platforms, &self.config.platforms.arch64);
            let use64 = arch == PlatformArch::Bits64 && store.has_depends64();
            let order = set.build_order(&mut DependencyGraph::new(&store, use64))?;
            info!(version = %version, projects = %order.join(" "), "build order resolved");

            report.build_sets.insert(version.clone(), set);
            report.build_orders.insert(version.clone(), order.clone());

            for (stage, action) in self.actions.iter() {
                let started = Instant::now();
                let result = self
                    .run_stage(stage, action, &request.package, &version, &platforms, &order)
                    .await;
                report.timings.push(StageTiming {
                    stage: stage.clone(),
                    version: version.clone(),
                    elapsed: started.elapsed(),
                });

                match result {
                    Ok(()) => {}
                    Err(SpkError::BuildActionFailed(failures)) => {
                        warn!(stage = %stage, version = %version, "stage failed; later stages skipped");
                        report.failure = Some(StageFailure {
                            stage: stage.clone(),
                            version,
                            failures,
                        });
                        return Ok(report);
                    }
                    Err(other) => return Err(other),
                }
            }
        }

        Ok(report)
    }

    async fn run_stage(
        &self,
        stage: &str,
        action: &Arc<dyn BuildAction>,
        package: &str,
        version: &str,
        platforms: &[String],
        projects: &[ProjectName],
    ) -> Result<()> {
        info!(stage = %stage, version = %version, "starting stage");

        let projects: Arc<Vec<ProjectName>> = Arc::new(projects.to_vec());
        self.coordinator
            .run_for_each(platforms.to_vec(), |platform| {
                let action = Arc::clone(action);
                let projects = Arc::clone(&projects);
                let options = ActionOptions {
                    stage: stage.to_string(),
                    package: package.to_string(),
                    version: version.to_string(),
                    chroot: self.config.env.chroot_for(&platform, version),
                };
                async move {
                    let outcome = action.execute(&platform, &projects, &options).await?;
                    if outcome.success {
                        return Ok(());
                    }
                    let failed = if outcome.failed_projects.is_empty() {
                        projects.join(" ")
                    } else {
                        outcome.failed_projects.join(" ")
                    };
                    Err(SpkError::Other(anyhow!(
                        "Failed to {stage} package. [{platform}] : {failed}",
                        stage = options.stage
                    )))
                }
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::path::{Path, PathBuf};
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;
    use crate::config::{RawConfigFile, StageConfig};
    use crate::dag::NullUpdater;
    use crate::exec::ActionOutcome;
    use crate::fs::MockFileSystem;

    /// Records calls and fails on the listed platforms.
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, String, Vec<ProjectName>)>>,
        fail_on: Vec<String>,
    }

    impl BuildAction for Recording {
        fn execute<'a>(
            &'a self,
            platform: &'a str,
            projects: &'a [ProjectName],
            options: &'a ActionOptions,
        ) -> Pin<Box<dyn Future<Output = Result<ActionOutcome>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push((
                    options.stage.clone(),
                    platform.to_string(),
                    projects.to_vec(),
                ));
                if self.fail_on.iter().any(|p| p == platform) {
                    Ok(ActionOutcome::failed(vec!["libfoo".into()]))
                } else {
                    Ok(ActionOutcome::ok())
                }
            })
        }
    }

    fn config() -> ConfigFile {
        let mut raw = RawConfigFile::default();
        raw.paths.project_depends = PathBuf::from("/ws/include/project.depends");
        raw.paths.source_dir = PathBuf::from("/ws/source");
        raw.env.versions.insert("all".into(), "7.2-64570".into());
        raw.env.versions.insert("armada".into(), "6.2-25556".into());
        raw.env.chroot = "/ws/build_env/ds.{platform}-{version}".into();
        for stage in ["build", "install"] {
            raw.stage.insert(
                stage.into(),
                StageConfig {
                    cmd: "true".into(),
                    log: None,
                },
            );
        }
        ConfigFile::try_from(raw).unwrap()
    }

    fn fs() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.write(
            Path::new("/ws/include/project.depends"),
            b"[project dependency]\ndemo=\"libfoo\"\nlibfoo=\"\"\n",
        )
        .unwrap();
        fs.write(
            Path::new("/ws/source/demo/SynoBuildConf/depends"),
            b"[BuildDependent]\nlibfoo\n",
        )
        .unwrap();
        for chroot in ["ds.x64-7.2-64570", "ds.avoton-7.2-64570", "ds.armada-6.2-25556"] {
            fs.add_file(format!("/ws/build_env/{chroot}/etc/hostname"), "builder");
        }
        fs
    }

    fn request(platforms: &[&str]) -> PackageRequest {
        PackageRequest {
            package: "demo".into(),
            platforms: platforms.iter().map(|p| p.to_string()).collect(),
            max_depth: 0,
        }
    }

    #[test]
    fn groups_platforms_by_version() {
        let cfg = config();
        let fs = fs();
        let pipeline = Pipeline::new(&cfg, &fs, &NullUpdater);
        let groups = pipeline
            .group_by_version(&["x64".into(), "armada".into(), "avoton".into()])
            .unwrap();
        assert_eq!(groups["7.2-64570"], vec!["x64", "avoton"]);
        assert_eq!(groups["6.2-25556"], vec!["armada"]);
        assert!(pipeline.group_by_version(&[]).is_err());
    }

    #[test]
    fn platforms_without_chroot_are_dropped() {
        let cfg = config();
        let fs = fs();
        let pipeline = Pipeline::new(&cfg, &fs, &NullUpdater);

        let groups = pipeline
            .available_platforms(&["x64".into(), "bromolow".into(), "armada".into()])
            .unwrap();
        assert_eq!(groups["7.2-64570"], vec!["x64"]);
        assert_eq!(groups["6.2-25556"], vec!["armada"]);

        let err = pipeline
            .available_platforms(&["bromolow".into(), "cedarview".into()])
            .unwrap_err();
        assert!(matches!(err, SpkError::NoPlatformAvailable(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn runs_stages_in_order_for_each_version() {
        let cfg = config();
        let fs = fs();
        let action = Arc::new(Recording::default());
        let pipeline = Pipeline::new(&cfg, &fs, &NullUpdater)
            .with_action("build", action.clone())
            .with_action("install", action.clone());

        let report = pipeline.run(&request(&["x64", "armada"])).await.unwrap();
        assert!(report.succeeded());
        assert_eq!(report.build_orders["7.2-64570"], vec!["libfoo", "demo"]);
        assert_eq!(report.timings.len(), 4);

        let calls = action.calls.lock().unwrap();
        let stages: Vec<&str> = calls.iter().map(|(s, _, _)| s.as_str()).collect();
        // Versions run in key order, stages in configured order.
        assert_eq!(stages, vec!["build", "install", "build", "install"]);
        assert_eq!(calls[0].1, "armada");
    }

    #[tokio::test]
    async fn failing_stage_stops_later_stages() {
        let cfg = config();
        let fs = fs();
        let action = Arc::new(Recording {
            fail_on: vec!["avoton".into()],
            ..Recording::default()
        });
        let pipeline = Pipeline::new(&cfg, &fs, &NullUpdater)
            .with_action("build", action.clone())
            .with_action("install", action.clone());

        let report = pipeline.run(&request(&["x64", "avoton"])).await.unwrap();
        let failure = report.failure.clone().unwrap();
        assert_eq!(failure.stage, "build");
        assert_eq!(failure.failures.succeeded, vec!["x64"]);
        assert!(failure.failures.failures["avoton"].contains("libfoo"));

        // Both platforms ran build, nobody ran install.
        let calls = action.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(s, _, _)| s == "build"));
        assert!(matches!(report.into_result(), Err(SpkError::BuildActionFailed(_))));
    }
}
