//! envelope/mod.rs
//! Per-file envelope framing the ciphertext body.
//!
//! Layout (big-endian lengths):
//! `[iv_len u32][iv][wrapped_key_len u32][wrapped_key][ciphertext ...]`
//!
//! Notes:
//! - The envelope is the only parser of untrusted bytes in the crate. Length
//!   fields are checked against fixed bounds before any buffer is sized.
//! - Nothing in the envelope is secret: the IV is public and the key is wrapped.

pub mod types;
pub mod encode;
pub mod decode;

pub use types::*;
pub use encode::*;
pub use decode::*;
