//! Content-addressed captured data (buffer/image contents, shader code,
//! push-constant and update-buffer payloads).

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 of a captured blob.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlobHash(pub [u8; 32]);

impl BlobHash {
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }
}

impl fmt::Display for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHash({})", &hex::encode(self.0)[..12])
    }
}

/// A byte range inside a captured blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub hash: BlobHash,
    pub offset: u64,
    pub size: u64,
}

impl BlobRef {
    pub fn whole(hash: BlobHash, size: u64) -> Self {
        Self {
            hash,
            offset: 0,
            size,
        }
    }

    /// Sub-slice relative to this one, clamped to its bounds.
    pub fn slice(&self, offset: u64, size: u64) -> BlobRef {
        let offset = offset.min(self.size);
        BlobRef {
            hash: self.hash,
            offset: self.offset + offset,
            size: size.min(self.size - offset),
        }
    }
}

/// Read access to the captured blob corpus.
pub trait BlobStore: Send + Sync {
    fn get(&self, hash: &BlobHash) -> Option<Arc<[u8]>>;

    /// Copy out the bytes a `BlobRef` names. `None` if the blob is unknown
    /// or shorter than the reference.
    fn read(&self, blob: &BlobRef) -> Option<Vec<u8>> {
        let data = self.get(&blob.hash)?;
        let start = usize::try_from(blob.offset).ok()?;
        let end = start.checked_add(usize::try_from(blob.size).ok()?)?;
        data.get(start..end).map(|s| s.to_vec())
    }
}

/// In-memory blob store keyed by content hash.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<BlobHash, Arc<[u8]>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` and return a reference to all of it.
    pub fn insert(&self, data: impl Into<Vec<u8>>) -> BlobRef {
        let data: Vec<u8> = data.into();
        let hash = BlobHash::of(&data);
        let size = data.len() as u64;
        self.blobs.entry(hash).or_insert_with(|| Arc::from(data));
        BlobRef::whole(hash, size)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, hash: &BlobHash) -> Option<Arc<[u8]>> {
        self.blobs.get(hash).map(|v| Arc::clone(v.value()))
    }
}
