//! Request profiling primitives: resource usage snapshots and the frame
//! sampler.

pub mod rusage;
pub mod sampler;

pub use rusage::ResourceUsage;
pub use sampler::{FrameGuard, FrameStack, Sampler};
