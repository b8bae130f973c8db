//! Core types shared by the contact dynamics crates.
//!
//! This crate provides the small vocabulary every other crate speaks:
//!
//! - [`SimError`] - The error enum used across solvers and assemblers
//! - [`BodyHandle`] - Generation-checked handle into a body arena
//! - [`tolerance`] - Numeric tolerances used by degenerate-geometry guards
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//!
//! - Headless training loops
//! - Hardware control code
//! - Analysis tools
//! - Other engines
//!
//! # Example
//!
//! ```
//! use sim_types::{BodyHandle, SimError};
//!
//! let handle = BodyHandle::new(3, 1);
//! let err = SimError::invalid_handle(handle);
//! assert!(err.is_handle_error());
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod error;
mod handle;
pub mod tolerance;

pub use error::SimError;
pub use handle::BodyHandle;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
