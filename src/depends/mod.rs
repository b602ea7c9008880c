// src/depends/mod.rs

//! Dependency declarations: loading, merging and placeholder expansion.

pub mod store;
pub mod substitute;

pub use store::{DependencyStore, LoadOptions, NormalizedInput, ProjectDeclaration};
pub use substitute::is_kernel_header;
