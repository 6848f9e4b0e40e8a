use std::time::Duration;

/// Suffix appended to every encrypted file name.
/// Decryption requires and strips exactly this suffix.
pub const LOCKED_SUFFIX: &str = ".rslocked";

/// Fixed transfer buffer used by both transform directions.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;
/// Sanity bounds for a caller-tuned transfer buffer.
pub const MIN_BUFFER_SIZE: usize = 16;
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

/// AES-256 key material, generated fresh per file.
pub const SYMMETRIC_KEY_LEN: usize = 32;
/// CBC initialization vector, generated fresh per file.
pub const IV_LEN: usize = 16;
/// AES block size; CBC ciphertext is always a positive multiple of it.
pub const CIPHER_BLOCK_LEN: usize = 16;

/// Envelope bounds (inclusive upper bounds, zero is always rejected).
pub const MAX_IV_LEN: u32 = 64;
pub const MAX_WRAPPED_KEY_LEN: u32 = 8192;

/// Executor defaults.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(60 * 60); // 1 hour
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Key-store defaults.
pub const DEFAULT_KEY_ALIAS: &str = "rslock-key";
pub const PUBLIC_KEY_PEM_SUFFIX: &str = ".pub.pem";
pub const PRIVATE_KEY_PEM_SUFFIX: &str = ".pem";

/// Journal defaults.
pub const DEFAULT_JOURNAL_ROTATION: usize = 10_000;
pub const JOURNAL_ZSTD_LEVEL: i32 = 3;
