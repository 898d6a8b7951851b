// src/snapshot/hash.rs

use std::fmt;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;

/// A 32-byte blake3 digest.
///
/// Rendered and serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(blake3::Hash);

impl ContentHash {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    pub fn from_hex(hex: &str) -> Result<Self, blake3::HexError> {
        blake3::Hash::from_hex(hex).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl From<blake3::Hash> for ContentHash {
    fn from(h: blake3::Hash) -> Self {
        Self(h)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s).map_err(|e| format!("invalid content hash {s:?}: {e}"))
    }
}

impl From<ContentHash> for String {
    fn from(h: ContentHash) -> Self {
        h.to_hex()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps diagnostics readable.
        write!(f, "ContentHash({})", &self.to_hex()[..12])
    }
}

/// Incremental hasher with unambiguous framing.
///
/// Every variable-length field is prefixed by its length so that
/// `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Debug, Default, Clone)]
pub struct StableHasher {
    inner: Hasher,
}

impl StableHasher {
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
        }
    }

    pub fn tag(&mut self, tag: u8) -> &mut Self {
        self.inner.update(&[tag]);
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.inner.update(&value.to_le_bytes());
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.u64(bytes.len() as u64);
        self.inner.update(bytes);
        self
    }

    pub fn str(&mut self, s: &str) -> &mut Self {
        self.bytes(s.as_bytes())
    }

    pub fn hash(&mut self, h: &ContentHash) -> &mut Self {
        self.inner.update(h.as_bytes());
        self
    }

    pub fn finish(&self) -> ContentHash {
        ContentHash(self.inner.finalize())
    }
}

/// Hash the contents of a single file, returning the digest and the number
/// of bytes read.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<(ContentHash, u64)> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    let mut length = 0u64;
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        length += n as u64;
        hasher.update(&buf[..n]);
    }
    Ok((ContentHash(hasher.finalize()), length))
}
