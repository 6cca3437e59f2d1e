//! Deterministic model and document digests.
//!
//! - algorithm: FNV-1a 64-bit
//! - input: raw bytes, or a [`ModelSnapshot`] streamed as canonical JSON
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! Not a security primitive; it identifies inputs and outputs across runs.

use std::io;

use crate::model::ModelSnapshot;

/// Prefix used in serialized digests.
pub const DIGEST_PREFIX: &str = "fnv1a64:";

/// Incremental FNV-1a state. Implements [`io::Write`] so serializers can
/// feed it directly without buffering the whole document.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.state = bytes
            .iter()
            .fold(self.state, |h, b| (h ^ u64::from(*b)).wrapping_mul(Self::PRIME));
    }

    /// Prefixed hex rendering of the current state.
    pub fn digest(&self) -> String {
        format!("{DIGEST_PREFIX}{:016x}", self.state)
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

impl io::Write for Fnv1a64 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Digest of an emitted document or any other byte string.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Fnv1a64::new();
    hasher.update(bytes);
    hasher.digest()
}

/// Digest of the snapshot's canonical JSON. Arena vectors serialize in id
/// order, so equal snapshots always hash equally.
pub fn snapshot_digest(snapshot: &ModelSnapshot) -> Result<String, serde_json::Error> {
    let mut hasher = Fnv1a64::new();
    serde_json::to_writer(&mut hasher, snapshot)?;
    Ok(hasher.digest())
}
