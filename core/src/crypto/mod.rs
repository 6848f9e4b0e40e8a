//! Cipher primitives: fresh key/IV generation, RSA key wrapping,
//! AES-256-CBC streaming.

pub mod types;
pub mod random;
pub mod wrap;
pub mod stream;

pub use types::*;
pub use random::*;
pub use wrap::*;
pub use stream::*;
