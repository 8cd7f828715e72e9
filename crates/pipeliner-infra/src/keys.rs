//! Public key store for request signature verification.
//!
//! The CI server publishes its Ed25519 public key as a PEM-encoded
//! SubjectPublicKeyInfo (`GET /api/signature/public-key`). The key is loaded
//! once at startup and cached; requests only ever read the cached copy. A
//! reload (triggered by the operator) replaces the key only when the new file
//! parses, so a broken file never takes the service down.

use std::path::{Path, PathBuf};

use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::VerifyingKey;
use tokio::sync::RwLock;

/// Errors loading the public key file.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("failed to read public key file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse public key file {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
}

/// Parse a PEM-encoded Ed25519 SubjectPublicKeyInfo.
pub fn parse_public_key_pem(pem: &str) -> Result<VerifyingKey, String> {
    VerifyingKey::from_public_key_pem(pem.trim()).map_err(|e| e.to_string())
}

/// Cached Ed25519 public key backed by a PEM file.
#[derive(Debug)]
pub struct PublicKeyStore {
    path: PathBuf,
    cached: RwLock<Option<VerifyingKey>>,
}

impl PublicKeyStore {
    /// Create a store with an empty cache. The first [`current`](Self::current)
    /// call loads the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Load the key eagerly. Used at startup so that a bad key file is fatal
    /// before the server starts accepting requests.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, KeyError> {
        let path = path.into();
        let key = read_key(&path).await?;
        tracing::info!(path = %path.display(), "loaded signature public key");
        Ok(Self {
            path,
            cached: RwLock::new(Some(key)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached key, loading it from disk if nothing is cached yet.
    pub async fn current(&self) -> Result<VerifyingKey, KeyError> {
        if let Some(key) = *self.cached.read().await {
            return Ok(key);
        }

        let mut cached = self.cached.write().await;
        // Another request may have loaded it while we waited for the lock.
        if let Some(key) = *cached {
            return Ok(key);
        }
        let key = read_key(&self.path).await?;
        *cached = Some(key);
        tracing::info!(path = %self.path.display(), "loaded signature public key");
        Ok(key)
    }

    /// Re-read the key file. On failure the previously cached key stays in use.
    pub async fn reload(&self) -> Result<(), KeyError> {
        match read_key(&self.path).await {
            Ok(key) => {
                *self.cached.write().await = Some(key);
                tracing::info!(path = %self.path.display(), "reloaded signature public key");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "public key reload failed, keeping previous key");
                Err(e)
            }
        }
    }
}

async fn read_key(path: &Path) -> Result<VerifyingKey, KeyError> {
    let pem = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| KeyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_public_key_pem(&pem).map_err(|reason| KeyError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
    use ed25519_dalek::pkcs8::EncodePublicKey;
    use ed25519_dalek::SigningKey;

    fn pem_for(seed: u8) -> (VerifyingKey, String) {
        let key = SigningKey::from_bytes(&[seed; 32]).verifying_key();
        let pem = key.to_public_key_pem(LineEnding::LF).unwrap();
        (key, pem)
    }

    #[test]
    fn test_parse_valid_pem() {
        let (key, pem) = pem_for(1);
        assert_eq!(parse_public_key_pem(&pem).unwrap(), key);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_public_key_pem("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----").is_err());
        assert!(parse_public_key_pem("").is_err());
    }

    #[tokio::test]
    async fn test_load_reads_and_caches_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key.pem");
        let (key, pem) = pem_for(2);
        tokio::fs::write(&path, pem).await.unwrap();

        let store = PublicKeyStore::load(&path).await.unwrap();
        // Removing the file does not affect the cached key.
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(store.current().await.unwrap(), key);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = PublicKeyStore::load(tmp.path().join("missing.pem"))
            .await
            .unwrap_err();
        assert!(matches!(err, KeyError::Read { .. }));
    }

    #[tokio::test]
    async fn test_load_invalid_file_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key.pem");
        tokio::fs::write(&path, "not a key").await.unwrap();

        let err = PublicKeyStore::load(&path).await.unwrap_err();
        assert!(matches!(err, KeyError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_lazy_store_retries_until_file_appears() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key.pem");
        let store = PublicKeyStore::new(&path);

        assert!(store.current().await.is_err());

        let (key, pem) = pem_for(3);
        tokio::fs::write(&path, pem).await.unwrap();
        assert_eq!(store.current().await.unwrap(), key);
    }

    #[tokio::test]
    async fn test_reload_replaces_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key.pem");
        let (_, old_pem) = pem_for(4);
        tokio::fs::write(&path, old_pem).await.unwrap();
        let store = PublicKeyStore::load(&path).await.unwrap();

        let (new_key, new_pem) = pem_for(5);
        tokio::fs::write(&path, new_pem).await.unwrap();
        store.reload().await.unwrap();
        assert_eq!(store.current().await.unwrap(), new_key);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key.pem");
        let (key, pem) = pem_for(6);
        tokio::fs::write(&path, pem).await.unwrap();
        let store = PublicKeyStore::load(&path).await.unwrap();

        tokio::fs::write(&path, "corrupted").await.unwrap();
        assert!(store.reload().await.is_err());
        assert_eq!(store.current().await.unwrap(), key);
    }
}
