//! Filesystem public key source.

use super::PublicKeyLoader;
use crate::error::KeyFetchError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads public keys from `<directory>/<key_id>.pem`.
///
/// Key ids containing `/` map to nested directories, so `svc-a/key1` is read
/// from `<directory>/svc-a/key1.pem`. Key ids reach this loader only after
/// issuer/key id validation has rejected `.` and `..` segments.
#[derive(Debug, Clone)]
pub struct FileKeyLoader {
    directory: PathBuf,
}

impl FileKeyLoader {
    /// Create a loader rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, key_id: &str) -> PathBuf {
        self.directory.join(format!("{key_id}.pem"))
    }
}

#[async_trait]
impl PublicKeyLoader for FileKeyLoader {
    async fn load(&self, key_id: &str) -> Result<String, KeyFetchError> {
        let path = self.path_for(key_id);

        match tokio::fs::read_to_string(&path).await {
            Ok(pem) => Ok(pem),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(target: "asap.keys.file", path = %path.display(), "Public key file not found");
                Err(KeyFetchError::NotFound {
                    key_id: key_id.to_string(),
                    location: path.display().to_string(),
                })
            }
            Err(source) => Err(KeyFetchError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}
