//! executor/mod.rs
//! Bounded worker pool applying one `FileTransform` to many `FileTask`s.
//!
//! Notes:
//! - Tasks share nothing but the job queue and the read-only transform.
//! - Results are assembled in submission order, whatever the completion order.
//! - A per-task failure or panic becomes a failure `FileResult`; only an
//!   external interrupt aborts the whole batch.

pub mod context;
pub mod pool;

pub use context::*;
pub use pool::*;
