//! telemetry/mod.rs
//! Batch telemetry: per-file stage timers, byte counters, and an immutable
//! snapshot attached to every `ExecutionResult`.
//!
//! Notes:
//! - Each file task owns its own `StageTimes` and `FileCounters`; the executor
//!   merges them after collection, so workers never share telemetry state.
//! - Snapshots are plain data (serde) and safe to hand across the FFI boundary.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
