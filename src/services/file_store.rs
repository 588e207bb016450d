//! FileStore - uploaded print files kept flat on local disk.
//!
//! Uploads are renamed to `<epoch-ms>_<base><ext>` under `base_path`, and the
//! public location handed back to clients is `/uploads/<name>`. Orders only
//! copy file metadata, so nothing here knows or cares which order a file
//! belongs to.

use crate::models::stored_file::StoredFile;
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut, stream};
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Largest accepted upload, inclusive.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// URL prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const MAX_RELATIVE_PATH_LEN: usize = 1024;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("invalid file path `{0}`")]
    InvalidPath(String),
    #[error("file exceeds the {limit} byte upload limit")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type FileStoreResult<T> = Result<T, FileStoreError>;

#[derive(Clone, Debug)]
pub struct FileStore {
    /// Directory holding the uploaded bytes.
    pub base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Store an in-memory payload. See [`FileStore::save_stream`].
    pub async fn save_file(
        &self,
        bytes: Bytes,
        original_name: &str,
        content_type: Option<String>,
    ) -> FileStoreResult<StoredFile> {
        let body = stream::once(async move { Ok::<_, io::Error>(bytes) });
        self.save_stream(body, original_name, content_type).await
    }

    /// Stream an upload to disk under a fresh unique name.
    ///
    /// - Writes chunks to a temp file, counting bytes as they arrive.
    /// - Aborts with `TooLarge` as soon as the count passes [`MAX_UPLOAD_BYTES`].
    /// - Syncs, then renames into its final name.
    ///
    /// The returned `name` is the client's original file name; `path` and
    /// `url` point at the stored copy.
    pub async fn save_stream<S>(
        &self,
        body: S,
        original_name: &str,
        content_type: Option<String>,
    ) -> FileStoreResult<StoredFile>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size: u64 = 0;
        pin_mut!(body);
        while let Some(chunk_res) = body.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(FileStoreError::Io(err));
                }
            };
            size += chunk.len() as u64;
            if size > MAX_UPLOAD_BYTES {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(FileStoreError::TooLarge {
                    limit: MAX_UPLOAD_BYTES,
                });
            }
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(FileStoreError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FileStoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FileStoreError::Io(err));
        }
        drop(file);

        let original_name = if original_name.is_empty() {
            "unknown"
        } else {
            original_name
        };
        let stored_name = unique_name(Utc::now().timestamp_millis(), original_name);
        let file_path = self.base_path.join(&stored_name);
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FileStoreError::Io(err));
        }
        debug!("stored upload {} ({} bytes)", file_path.display(), size);

        let public = public_path(&stored_name);
        Ok(StoredFile {
            name: original_name.to_string(),
            size,
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into()),
            path: public.clone(),
            url: Some(public),
        })
    }

    /// Every stored file, sorted by name. A missing root is an empty listing.
    pub async fn list_files(&self) -> FileStoreResult<Vec<StoredFile>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // temp files and probes
            if name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            files.push(describe(&name, &name, meta.len()));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Metadata for one stored file.
    ///
    /// `relative_path` may be the bare stored name or its public form
    /// (`/uploads/<name>`).
    pub async fn get_file(&self, relative_path: &str) -> FileStoreResult<Option<StoredFile>> {
        let relative = normalize_relative(relative_path)?;
        match fs::metadata(self.base_path.join(relative)).await {
            Ok(meta) if meta.is_file() => {
                let name = relative.rsplit('/').next().unwrap_or(relative);
                Ok(Some(describe(name, relative, meta.len())))
            }
            Ok(_) => Ok(None),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Open a stored file for streaming back to a client.
    pub async fn open_file(
        &self,
        relative_path: &str,
    ) -> FileStoreResult<Option<(StoredFile, File)>> {
        let Some(meta) = self.get_file(relative_path).await? else {
            return Ok(None);
        };
        let relative = normalize_relative(relative_path)?;
        match File::open(self.base_path.join(relative)).await {
            Ok(file) => Ok(Some((meta, file))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove every entry under the storage root. Returns how many were removed.
    pub async fn delete_all_files(&self) -> FileStoreResult<usize> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                fs::remove_dir_all(&path).await?;
            } else {
                fs::remove_file(&path).await?;
            }
            removed += 1;
        }
        debug!("removed {} entries from {}", removed, self.base_path.display());
        Ok(removed)
    }
}

/// `<millis>_<base><ext>`, where base and extension come from the last path
/// component of the client's file name.
fn unique_name(millis: i64, original_name: &str) -> String {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("unknown");

    let (base, ext) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    };
    format!("{millis}_{base}{ext}")
}

fn public_path(relative: &str) -> String {
    format!("{PUBLIC_PREFIX}/{relative}")
}

fn describe(name: &str, relative: &str, size: u64) -> StoredFile {
    let public = public_path(relative);
    StoredFile {
        name: name.to_string(),
        size,
        content_type: DEFAULT_CONTENT_TYPE.into(),
        path: public.clone(),
        url: Some(public),
    }
}

/// Strip the public prefix and reject anything that could leave the root.
fn normalize_relative(path: &str) -> FileStoreResult<&str> {
    let relative = path
        .strip_prefix(PUBLIC_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
        .trim_start_matches('/');

    let invalid = relative.is_empty()
        || relative.len() > MAX_RELATIVE_PATH_LEN
        || relative.split('/').any(|seg| seg.is_empty() || seg == "..")
        || relative
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
    if invalid {
        return Err(FileStoreError::InvalidPath(path.to_string()));
    }
    Ok(relative)
}
