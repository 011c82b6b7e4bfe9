//! # Pantry Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Sample recipe fixtures
//! - Property-based testing strategies
//! - Tracing setup for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Re-export proptest for convenience.
pub use proptest;

static INIT_TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(EnvFilter::from_default_env())
            .try_init();
    });
}
