// src/engine/mod.rs

//! Package build orchestration.
//!
//! [`pipeline`] drives resolution and the configured stages; [`report`]
//! renders what happened.

pub mod pipeline;
pub mod report;

pub use pipeline::{PackageRequest, Pipeline, PipelineReport, StageFailure, StageTiming};
