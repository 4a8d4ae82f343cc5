//! Observability glue: routes `tracing` events into the active toolbar.

pub mod log_capture;

pub use log_capture::LogCaptureLayer;
