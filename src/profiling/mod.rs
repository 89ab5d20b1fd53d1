//! Feature-gated tick profiling.
//!
//! Enable with `cargo bench --features profiling`. Traces load in
//! `chrome://tracing` or <https://ui.perfetto.dev>.

pub mod profiler;
