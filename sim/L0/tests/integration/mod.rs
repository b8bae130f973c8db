//! Integration tests for the sim-* contact dynamics stack.
//!
//! These tests drive the full pipeline across crates:
//! - Narrow phase → rigid contact assembly → PGS step
//! - Narrow phase → PBD collision assembly → collision sweeps
//!
//! Set `RUST_LOG=sim_rigid=trace` (or similar) to see solver traces.

pub mod pbd_pipeline;
pub mod rigid_contact;

use tracing_subscriber::{fmt, EnvFilter};

/// Route solver traces to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
