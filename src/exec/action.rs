// src/exec/action.rs

//! Per-platform build actions.
//!
//! The coordinator only knows about contexts and results; what actually runs
//! for a platform is a [`BuildAction`]. Production uses [`CommandAction`],
//! tests plug in fakes.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Instant;

use anyhow::Context;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::types::ProjectName;

/// Line the in-chroot build script prints for every project it gave up on.
static PROJECT_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Error\(s\) occurred on project "([^"]+)""#)
        .unwrap_or_else(|e| panic!("invalid project error regex: {e}"))
});

/// Everything about one stage run that is shared by all platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOptions {
    pub stage: String,
    pub package: String,
    pub version: String,
    pub chroot: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    /// Projects the action reported as failed. May be empty on failure when
    /// the action could not tell which project broke.
    pub failed_projects: Vec<ProjectName>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            failed_projects: Vec::new(),
        }
    }

    pub fn failed(projects: Vec<ProjectName>) -> Self {
        Self {
            success: false,
            failed_projects: projects,
        }
    }
}

/// Work performed for one platform of one stage.
///
/// `Err` is reserved for the action being unable to run at all (spawn
/// failure, IO); a build that ran and failed is an `Ok` outcome with
/// `success == false`.
pub trait BuildAction: Send + Sync {
    fn execute<'a>(
        &'a self,
        platform: &'a str,
        projects: &'a [ProjectName],
        options: &'a ActionOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ActionOutcome>> + Send + 'a>>;
}

/// Runs a shell command template through `sh -c`.
///
/// Placeholders: `{chroot}`, `{platform}`, `{package}`, `{projects}`,
/// `{version}`, `{stage}`.
#[derive(Debug, Clone)]
pub struct CommandAction {
    template: String,
    /// Log file, relative to the chroot.
    log: Option<String>,
}

impl CommandAction {
    pub fn new(template: impl Into<String>, log: Option<String>) -> Self {
        Self {
            template: template.into(),
            log,
        }
    }

    pub fn render(&self, platform: &str, projects: &[ProjectName], options: &ActionOptions) -> String {
        self.template
            .replace("{chroot}", &options.chroot.display().to_string())
            .replace("{platform}", platform)
            .replace("{package}", &options.package)
            .replace("{projects}", &projects.join(" "))
            .replace("{version}", &options.version)
            .replace("{stage}", &options.stage)
    }

    async fn run(
        &self,
        platform: &str,
        projects: &[ProjectName],
        options: &ActionOptions,
    ) -> Result<ActionOutcome> {
        let command_line = self.render(platform, projects, options);
        info!(
            platform = %platform,
            stage = %options.stage,
            cmd = %command_line,
            "starting build action"
        );
        let started = Instant::now();

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {} action for platform '{platform}'", options.stage))?;

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(collect_lines(out, platform.to_string(), "stdout")));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(collect_lines(err, platform.to_string(), "stderr")));

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for {} action of platform '{platform}'", options.stage))?;

        let mut output = Vec::new();
        for reader in [stdout, stderr].into_iter().flatten() {
            match reader.await {
                Ok(lines) => output.extend(lines),
                Err(e) => warn!(platform = %platform, error = %e, "output reader task failed"),
            }
        }

        if let Some(log) = &self.log {
            let path = options.chroot.join(log);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
            let mut text = output.join("\n");
            text.push('\n');
            tokio::fs::write(&path, text)
                .await
                .with_context(|| format!("writing log {}", path.display()))?;
        }

        let failed = scrape_failed_projects(output.iter().map(String::as_str));
        let success = status.success() && failed.is_empty();

        info!(
            platform = %platform,
            stage = %options.stage,
            exit_code = status.code().unwrap_or(-1),
            success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "build action finished"
        );

        Ok(if success {
            ActionOutcome::ok()
        } else {
            ActionOutcome::failed(failed)
        })
    }
}

impl BuildAction for CommandAction {
    fn execute<'a>(
        &'a self,
        platform: &'a str,
        projects: &'a [ProjectName],
        options: &'a ActionOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ActionOutcome>> + Send + 'a>> {
        Box::pin(self.run(platform, projects, options))
    }
}

async fn collect_lines<R>(reader: R, platform: String, stream: &'static str) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut out = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(platform = %platform, stream, "{}", line);
        out.push(line);
    }
    out
}

/// Project names from `Error(s) occurred on project "X"` lines, in order of
/// first appearance.
pub fn scrape_failed_projects<'a, I>(lines: I) -> Vec<ProjectName>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<ProjectName> = Vec::new();
    for line in lines {
        for caps in PROJECT_ERROR_RE.captures_iter(line) {
            let name = caps[1].to_string();
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }
    out
}
