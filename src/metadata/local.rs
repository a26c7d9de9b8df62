//! Local content store
//!
//! Pointer-to-document cache backing both the upload fallback and the fetch
//! path. Always held in memory; optionally mirrored to a directory of JSON
//! files so fallback pointers survive restarts. Best-effort: the store is
//! never the source of truth and can be rebuilt from providers at any time.

use cid::Cid;
use dashmap::DashMap;
use multihash_codetable::{Code, MultihashDigest};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::document::MetadataDocument;
use crate::types::{CertificateError, Result};

/// Multicodec code for raw binary content.
const RAW_CODEC: u64 = 0x55;

pub const IPFS_SCHEME: &str = "ipfs://";

/// Content-addressed pointer for canonical document bytes (CIDv1, raw, sha2-256).
pub fn content_pointer(bytes: &[u8]) -> String {
    let hash = Code::Sha2_256.digest(bytes);
    format!("{IPFS_SCHEME}{}", Cid::new_v1(RAW_CODEC, hash))
}

/// Strip the `ipfs://` scheme, leaving the CID and optional sub-path that
/// gateways and the cache are keyed by.
pub fn content_path(pointer: &str) -> Result<String> {
    let trimmed = pointer.trim();
    let path = trimmed
        .strip_prefix(IPFS_SCHEME)
        .unwrap_or(trimmed)
        .trim_start_matches('/');

    if path.is_empty() {
        return Err(CertificateError::InvalidPointer(pointer.to_string()));
    }
    if path.chars().any(char::is_whitespace) {
        return Err(CertificateError::InvalidPointer(format!(
            "whitespace in pointer: {pointer}"
        )));
    }
    Ok(path.to_string())
}

pub struct LocalContentStore {
    documents: DashMap<String, MetadataDocument>,
    root_dir: Option<PathBuf>,
}

impl LocalContentStore {
    pub fn in_memory() -> Self {
        Self {
            documents: DashMap::new(),
            root_dir: None,
        }
    }

    /// Open a store mirrored to `root_dir`, creating it if needed.
    pub async fn open<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir).await?;
        info!(path = %root_dir.display(), "Initialized metadata content store");
        Ok(Self {
            documents: DashMap::new(),
            root_dir: Some(root_dir),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.root_dir.is_some()
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        self.root_dir.as_ref().map(|root| {
            let digest = Sha256::digest(key.as_bytes());
            root.join(format!("{}.json", hex::encode(digest)))
        })
    }

    /// Store `document` under `pointer`. Returns true when the pointer was
    /// already present. Concurrent writers to one key: last writer wins.
    pub async fn put(&self, pointer: &str, document: &MetadataDocument) -> Result<bool> {
        let key = content_path(pointer)?;
        let existed = self.documents.contains_key(&key);

        if let Some(path) = self.file_path(&key) {
            let bytes = serde_json::to_vec_pretty(document)?;
            fs::write(&path, bytes).await?;
            debug!(pointer, path = %path.display(), "Persisted metadata document");
        }

        self.documents.insert(key, document.clone());
        Ok(existed)
    }

    /// Look a pointer up in memory, then on disk.
    pub async fn get(&self, pointer: &str) -> Result<Option<MetadataDocument>> {
        let key = content_path(pointer)?;
        if let Some(doc) = self.documents.get(&key) {
            return Ok(Some(doc.value().clone()));
        }

        let Some(path) = self.file_path(&key) else {
            return Ok(None);
        };

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<MetadataDocument>(&bytes) {
            Ok(doc) => {
                self.documents.insert(key, doc.clone());
                Ok(Some(doc))
            }
            Err(e) => {
                warn!(pointer, error = %e, "Discarding unreadable cached document");
                Ok(None)
            }
        }
    }

    /// Number of documents held in memory.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
