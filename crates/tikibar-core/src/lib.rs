//! Tikibar core: runtime-free pieces of the request-profiling toolbar.
//!
//! This crate holds the per-request metrics container and its size policy,
//! the rolling request history, SQL formatting, signed values, and the panel
//! reconstruction that turns a stored blob into proportional timing bars. It
//! carries no web framework or async runtime dependencies.
//!
//! # Lints
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod history;
pub mod html;
pub mod metrics;
pub mod panel;
pub mod signing;
pub mod sql;
pub mod timing;

/// Shared result type.
pub use error::{Result, TikibarError};
