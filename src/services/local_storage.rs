//! Device-local key/value storage.
//!
//! Each key is one file under the storage directory, holding a string value.
//! Nothing here is shared between machines: two deployments pointing at
//! different directories see different data.

use super::atomic_file::write_atomic;
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum LocalStorageError {
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type LocalStorageResult<T> = Result<T, LocalStorageError>;

const MAX_KEY_LEN: usize = 128;

#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open (creating if needed) the storage directory.
    pub async fn open(root: impl Into<PathBuf>) -> LocalStorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Keys become file names, so only a conservative character set passes.
    fn key_path(&self, key: &str) -> LocalStorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key.len() <= MAX_KEY_LEN
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(LocalStorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    /// Read the value under `key`; `None` when it was never set or was removed.
    pub async fn get_item(&self, key: &str) -> LocalStorageResult<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn set_item(&self, key: &str, value: &str) -> LocalStorageResult<()> {
        let path = self.key_path(key)?;
        write_atomic(&path, value.as_bytes()).await?;
        Ok(())
    }

    /// Remove `key`. Removing a missing key is not an error.
    pub async fn remove_item(&self, key: &str) -> LocalStorageResult<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
