//! transform/mod.rs
//! One file, one direction: the per-file encrypt/decrypt state machines.
//!
//! Notes:
//! - Memory use is one transfer buffer plus key/IV material, independent of
//!   file size.
//! - Any failure removes the partially written destination file.
//! - The cancel token is polled between buffer transfers.

pub mod types;
pub mod encrypt;
pub mod decrypt;
pub mod logged;

pub use types::*;
pub use encrypt::*;
pub use decrypt::*;
pub use logged::*;
