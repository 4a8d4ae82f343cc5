//! Tikibar gateway: the axum side of the request-profiling toolbar.
//!
//! This crate wires config, the cache backend, access control, the
//! profiling middleware and the toolbar views into routers a host
//! application mounts. The binary (`main.rs`) is a small demo host.

pub mod access;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod obs;
pub mod profile;
pub mod router;
pub mod toolbar;
pub mod views;

pub use app_state::AppState;
pub use middleware::CorrelationId;
pub use toolbar::{current_toolbar, Toolbar};
