// src/exec/coordinator.rs

//! Fan-out/fan-in over independent contexts (platforms).

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{ActionFailures, Result, SpkError};

/// Shared cancellation flag.
///
/// Cloned handles observe the same flag. Once triggered it stays triggered.
#[derive(Debug, Clone)]
pub struct Interrupt {
    tx: Arc<watch::Sender<bool>>,
}

impl Interrupt {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Trigger on Ctrl-C. Spawns a listener task; needs a running runtime.
    pub fn listen_ctrl_c(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            warn!("Ctrl+C received; aborting running actions");
            handle.trigger();
        });
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one unit of work per context with bounded concurrency.
#[derive(Debug, Clone)]
pub struct ParallelCoordinator {
    max_concurrency: usize,
    interrupt: Interrupt,
}

impl ParallelCoordinator {
    /// `max_concurrency == 0` means the available CPU count.
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = if max_concurrency == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            max_concurrency
        };
        Self {
            max_concurrency,
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Run `job` once per distinct context and return every outcome.
    ///
    /// Every unit runs to completion; a unit that panicked maps to an error.
    /// The only top-level error is [`SpkError::Interrupted`], after everything
    /// still running has been aborted.
    pub async fn run_all<T, F, Fut>(
        &self,
        contexts: Vec<String>,
        job: F,
    ) -> Result<BTreeMap<String, Result<T>>>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let contexts: BTreeSet<String> = contexts.into_iter().collect();
        if self.interrupt.is_triggered() {
            return Err(SpkError::Interrupted);
        }

        info!(
            contexts = contexts.len(),
            max_concurrency = self.max_concurrency,
            "dispatching parallel actions"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency.max(1)));
        let mut set = JoinSet::new();
        for ctx in contexts.iter() {
            let unit = job(ctx.clone());
            let semaphore = Arc::clone(&semaphore);
            let ctx = ctx.clone();
            set.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => unit.await,
                    Err(e) => Err(SpkError::Other(e.into())),
                };
                (ctx, result)
            });
        }

        let mut interrupted = self.interrupt.subscribe();
        let mut pending = contexts;
        let mut outcomes = BTreeMap::new();

        loop {
            tokio::select! {
                true = async { interrupted.wait_for(|flag| *flag).await.is_ok() } => {
                    set.abort_all();
                    // Drain so aborted children are killed on drop.
                    while set.join_next().await.is_some() {}
                    warn!(pending = pending.len(), "parallel actions interrupted");
                    return Err(SpkError::Interrupted);
                }
                joined = set.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((ctx, result)) => {
                            match &result {
                                Ok(_) => debug!(context = %ctx, "action succeeded"),
                                Err(err) => error!(context = %ctx, error = %err, "action failed"),
                            }
                            pending.remove(&ctx);
                            outcomes.insert(ctx, result);
                        }
                        Err(join_err) => {
                            // The context is recovered from `pending` below.
                            error!(error = %join_err, "action task panicked");
                        }
                    }
                }
            }
        }

        for ctx in pending {
            outcomes.insert(ctx, Err(SpkError::Other(anyhow!("action task panicked"))));
        }
        Ok(outcomes)
    }

    /// Like [`run_all`](Self::run_all), but all-or-nothing.
    ///
    /// If any unit failed the result is a single
    /// [`SpkError::BuildActionFailed`] naming each failing context, with the
    /// successful contexts listed in it too.
    pub async fn run_for_each<T, F, Fut>(
        &self,
        contexts: Vec<String>,
        job: F,
    ) -> Result<BTreeMap<String, T>>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut values = BTreeMap::new();
        let mut failures = ActionFailures::default();
        for (ctx, result) in self.run_all(contexts, job).await? {
            match result {
                Ok(value) => {
                    failures.succeeded.push(ctx.clone());
                    values.insert(ctx, value);
                }
                Err(err) => {
                    failures.failures.insert(ctx, err.to_string());
                }
            }
        }

        if failures.failures.is_empty() {
            info!(succeeded = values.len(), "all parallel actions succeeded");
            Ok(values)
        } else {
            Err(SpkError::BuildActionFailed(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ctx(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[tokio::test]
    async fn collects_every_result() {
        let coordinator = ParallelCoordinator::new(2);
        let out = coordinator
            .run_for_each(ctx(&["x64", "armada", "x64"]), |p| async move { Ok(p.len()) })
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out["x64"], 3);
        assert_eq!(out["armada"], 6);
    }

    #[tokio::test]
    async fn failures_are_reported_after_all_units_finish() {
        let finished = Arc::new(AtomicUsize::new(0));
        let coordinator = ParallelCoordinator::new(3);

        let counter = Arc::clone(&finished);
        let err = coordinator
            .run_for_each(ctx(&["a", "b", "c"]), move |p| {
                let counter = Arc::clone(&counter);
                async move {
                    if p != "b" {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    if p == "b" {
                        Err(SpkError::ConfigError("boom".into()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap_err();

        assert_eq!(finished.load(Ordering::SeqCst), 3);
        match err {
            SpkError::BuildActionFailed(f) => {
                assert_eq!(f.succeeded, ctx(&["a", "c"]));
                assert_eq!(f.failures.len(), 1);
                assert!(f.failures["b"].contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn run_all_keeps_successful_values_next_to_failures() {
        let coordinator = ParallelCoordinator::new(3);
        let out = coordinator
            .run_all(ctx(&["p1", "p2", "p3"]), |p| async move {
                if p == "p2" {
                    Err(SpkError::ConfigError("no toolkit".into()))
                } else {
                    Ok(format!("artifact-{p}"))
                }
            })
            .await
            .unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out["p1"].as_ref().unwrap(), "artifact-p1");
        assert_eq!(out["p3"].as_ref().unwrap(), "artifact-p3");
        assert!(matches!(&out["p2"], Err(SpkError::ConfigError(msg)) if msg == "no toolkit"));
    }

    #[tokio::test]
    async fn panicking_unit_maps_to_an_error() {
        let coordinator = ParallelCoordinator::new(2);
        let out = coordinator
            .run_all(ctx(&["ok", "boom"]), |p| async move {
                if p == "boom" {
                    panic!("unit exploded");
                }
                Ok(p)
            })
            .await
            .unwrap();

        assert_eq!(out["ok"].as_ref().unwrap(), "ok");
        let err = out["boom"].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "action task panicked");
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let coordinator = ParallelCoordinator::new(2);

        let (r, pk) = (Arc::clone(&running), Arc::clone(&peak));
        coordinator
            .run_for_each(ctx(&["1", "2", "3", "4", "5"]), move |_| {
                let (running, peak) = (Arc::clone(&r), Arc::clone(&pk));
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn interrupt_aborts_in_flight_units() {
        let coordinator = ParallelCoordinator::new(4);
        let interrupt = coordinator.interrupt().clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            interrupt.trigger();
        });

        let err = coordinator
            .run_for_each(ctx(&["a", "b"]), |_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SpkError::Interrupted));
    }

    #[tokio::test]
    async fn triggered_interrupt_refuses_new_work() {
        let coordinator = ParallelCoordinator::new(1);
        coordinator.interrupt().trigger();
        let err = coordinator
            .run_for_each(ctx(&["a"]), |_| async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, SpkError::Interrupted));
    }
}
