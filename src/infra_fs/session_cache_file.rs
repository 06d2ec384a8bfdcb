use crate::domain_model::CachedSession;
use crate::domain_port::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Keeps the session artifact as a JSON document on disk.
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SessionCache for FileSessionCache {
    async fn load(&self) -> Result<Option<CachedSession>, SessionCacheError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_slice::<CachedSession>(&bytes)
            .map_err(|e| SessionCacheError::Corrupt(e.to_string()))?;
        Ok(Some(session))
    }

    async fn save(&self, session: &CachedSession) -> Result<(), SessionCacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(session)
            .map_err(|e| SessionCacheError::Corrupt(e.to_string()))?;
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionCacheError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
