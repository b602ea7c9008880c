// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`action`] defines the per-platform [`BuildAction`] and the
//!   shell-command implementation used in production.
//! - [`coordinator`] fans actions out over platforms with bounded
//!   concurrency and collects their results.

pub mod action;
pub mod coordinator;

pub use action::{ActionOptions, ActionOutcome, BuildAction, CommandAction, scrape_failed_projects};
pub use coordinator::{Interrupt, ParallelCoordinator};
