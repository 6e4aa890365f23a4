use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::ContentError;

/// Metadata derived from a body write: its length and SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyMetadata {
    pub content_length: u64,
    pub sha256: String,
}

/// Stores document bodies as files under a per-collection directory
/// (§4.2). Bodies live at
/// `<documents_directory>/<first-2-chars-of-id>/<id>.json` to bound
/// directory fan-out.
pub struct ContentStore {
    documents_directory: PathBuf,
}

impl ContentStore {
    pub fn new(documents_directory: impl Into<PathBuf>) -> Self {
        ContentStore {
            documents_directory: documents_directory.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.documents_directory
    }

    fn shard_dir(&self, document_id: &str) -> PathBuf {
        let prefix: String = document_id.chars().take(2).collect();
        let prefix = if prefix.is_empty() { "__".to_string() } else { prefix };
        self.documents_directory.join(prefix)
    }

    fn path_for(&self, document_id: &str) -> PathBuf {
        self.shard_dir(document_id).join(format!("{document_id}.json"))
    }

    /// Writes `bytes` atomically (write-to-temp then rename) and returns
    /// the content length and SHA-256 of the exact bytes written.
    pub fn put(&self, document_id: &str, bytes: &[u8]) -> Result<BodyMetadata, ContentError> {
        let dir = self.shard_dir(document_id);
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        std::io::Write::write_all(&mut tmp, bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(document_id))
            .map_err(|e| ContentError::Io(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = hex::encode(hasher.finalize());

        Ok(BodyMetadata {
            content_length: bytes.len() as u64,
            sha256,
        })
    }

    pub fn get(&self, document_id: &str) -> Result<Vec<u8>, ContentError> {
        let path = self.path_for(document_id);
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContentError::MissingBody(document_id.to_string())
            } else {
                ContentError::Io(e.to_string())
            }
        })
    }

    pub fn delete(&self, document_id: &str) -> Result<(), ContentError> {
        let path = self.path_for(document_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ContentError::Io(e.to_string())),
        }
    }

    pub fn exists(&self, document_id: &str) -> bool {
        self.path_for(document_id).is_file()
    }

    /// A maintenance pass: bodies present on disk with no corresponding
    /// live document id in `known_ids` are orphans (§4.2).
    pub fn find_orphans(&self, known_ids: &[String]) -> Result<Vec<PathBuf>, ContentError> {
        let mut orphans = Vec::new();
        if !self.documents_directory.is_dir() {
            return Ok(orphans);
        }
        for shard in fs::read_dir(&self.documents_directory)? {
            let shard = shard?;
            if !shard.path().is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let path = entry.path();
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if !known_ids.iter().any(|id| id == stem) {
                    orphans.push(path);
                }
            }
        }
        Ok(orphans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let meta = store.put("abcdef", b"{\"a\":1}").unwrap();
        assert_eq!(meta.content_length, 7);
        assert_eq!(store.get("abcdef").unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn sha256_matches_written_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let meta = store.put("doc1", b"hello").unwrap();
        let mut hasher = Sha256::new();
        hasher.update(b"hello");
        assert_eq!(meta.sha256, hex::encode(hasher.finalize()));
    }

    #[test]
    fn shards_by_first_two_chars() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        store.put("ab1234", b"x").unwrap();
        assert!(dir.path().join("ab").join("ab1234.json").is_file());
    }

    #[test]
    fn missing_body_is_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let err = store.get("nope").unwrap_err();
        assert!(matches!(err, ContentError::MissingBody(_)));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        store.put("doc1", b"x").unwrap();
        store.delete("doc1").unwrap();
        store.delete("doc1").unwrap();
        assert!(!store.exists("doc1"));
    }

    #[test]
    fn find_orphans_detects_bodies_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        store.put("doc1", b"x").unwrap();
        store.put("doc2", b"y").unwrap();
        let orphans = store.find_orphans(&["doc1".to_string()]).unwrap();
        assert_eq!(orphans.len(), 1);
        assert!(orphans[0].ends_with("doc2.json"));
    }
}
