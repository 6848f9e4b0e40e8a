//! telemetry/counters.rs
//! Byte counters for one file, merged into batch totals after collection.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCounters {
    /// Bytes read from the source file (plaintext or ciphertext body).
    pub bytes_in: u64,
    /// Bytes written to the destination file.
    pub bytes_out: u64,
    /// Envelope header bytes (written on encrypt, consumed on decrypt).
    pub bytes_overhead: u64,
}

impl FileCounters {
    pub fn add_header(&mut self, header_len: usize) {
        self.bytes_overhead += header_len as u64;
    }

    pub fn add_transfer(&mut self, n: usize) {
        self.bytes_in += n as u64;
    }

    pub fn merge(&mut self, other: &FileCounters) {
        self.bytes_in += other.bytes_in;
        self.bytes_out += other.bytes_out;
        self.bytes_overhead += other.bytes_overhead;
    }
}

impl AddAssign for FileCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
