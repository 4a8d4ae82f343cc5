//! Top-level facade crate for Tikibar.
//!
//! Re-exports the core types and the axum integration so host applications can depend on a single crate.

pub mod core {
    pub use tikibar_core::*;
}

pub mod gateway {
    pub use tikibar_gateway::*;
}
