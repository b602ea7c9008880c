#![allow(dead_code)]

pub use spkforge_test_utils::{FakeBuildAction, StoreBuilder, create_chroots, init_tracing, with_timeout};

pub fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|x| x.to_string()).collect()
}

/// Index of `name` in `order`; panics when missing.
pub fn position(order: &[String], name: &str) -> usize {
    order
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("{name} missing from {order:?}"))
}
