use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spkforge::errors::Result;
use spkforge::exec::{ActionOptions, ActionOutcome, BuildAction};

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub stage: String,
    pub platform: String,
    pub projects: Vec<String>,
}

/// A fake build action that:
/// - records every call
/// - fails on configured platforms with the configured project names
/// - optionally sleeps to simulate work.
#[derive(Debug, Clone, Default)]
pub struct FakeBuildAction {
    calls: Arc<Mutex<Vec<ActionCall>>>,
    failures: BTreeMap<String, Vec<String>>,
    delay: Option<Duration>,
}

impl FakeBuildAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, platform: &str, projects: &[&str]) -> Self {
        self.failures.insert(
            platform.to_string(),
            projects.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ActionCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl BuildAction for FakeBuildAction {
    fn execute<'a>(
        &'a self,
        platform: &'a str,
        projects: &'a [String],
        options: &'a ActionOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ActionOutcome>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            {
                let mut guard = self.calls.lock().unwrap();
                guard.push(ActionCall {
                    stage: options.stage.clone(),
                    platform: platform.to_string(),
                    projects: projects.to_vec(),
                });
            }
            Ok(match self.failures.get(platform) {
                Some(failed) => ActionOutcome::failed(failed.clone()),
                None => ActionOutcome::ok(),
            })
        })
    }
}
