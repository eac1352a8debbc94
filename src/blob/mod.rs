/// Chunked blob storage for attachments
///
/// Objects live under the store root as one directory per object: numbered
/// chunk files of at most `chunk_size` bytes plus a `meta.json` manifest
/// written last. An object with no manifest was never committed and is
/// invisible to readers, so a crashed upload leaves nothing observable.
///
/// Object names are `{unix millis}-{sequence}-{original name}`: time-ordered,
/// with a per-store sequence so concurrent writers cannot collide.
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

const MANIFEST_FILE: &str = "meta.json";

/// Per-object manifest, the commit record of a write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMeta {
    pub content_type: String,
    pub original_name: String,
    pub length: u64,
    pub chunk_count: u32,
    pub chunk_size: usize,
}

/// Handle to the store root; cheap to clone and share across requests
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
    chunk_size: usize,
    seq: Arc<AtomicU64>,
}

impl BlobStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>, chunk_size: usize) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            AppError::Storage(format!(
                "failed to create blob root {}: {e}",
                root.display()
            ))
        })?;

        Ok(Self {
            root,
            chunk_size: chunk_size.max(1),
            seq: Arc::new(AtomicU64::new(0)),
        })
    }

    fn object_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Time-ordered unique name for a new object
    fn next_name(&self, original_name: &str) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            seq,
            sanitize_name(original_name)
        )
    }

    /// Begin writing a new object
    ///
    /// Nothing is observable until [`BlobWriter::finish`] commits the
    /// manifest; dropping or aborting the writer discards the partial object.
    pub async fn create(&self, content_type: &str, original_name: &str) -> Result<BlobWriter> {
        let name = self.next_name(original_name);
        let dir = self.object_dir(&name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::UploadFailed(format!("failed to create object dir: {e}")))?;

        Ok(BlobWriter {
            name,
            dir,
            chunk_size: self.chunk_size,
            content_type: content_type.to_string(),
            original_name: original_name.to_string(),
            buf: Vec::with_capacity(self.chunk_size),
            chunk_count: 0,
            length: 0,
            committed: false,
        })
    }

    /// Open a committed object for reading
    ///
    /// Unknown or uncommitted names report [`AppError::NotFound`], distinct
    /// from operational read failures.
    pub async fn get(&self, name: &str) -> Result<BlobObject> {
        if !is_valid_name(name) {
            return Err(AppError::NotFound(format!("blob {name:?}")));
        }

        let dir = self.object_dir(name);
        let raw = match fs::read(dir.join(MANIFEST_FILE)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!("blob {name:?}")));
            }
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "failed to read manifest for blob {name:?}: {e}"
                )));
            }
        };

        let meta: BlobMeta = serde_json::from_slice(&raw).map_err(|e| {
            AppError::Storage(format!("corrupt manifest for blob {name:?}: {e}"))
        })?;

        Ok(BlobObject { dir, meta })
    }

    /// Remove an object, committed or partial; a missing name is not an error
    pub async fn delete(&self, name: &str) -> Result<()> {
        if !is_valid_name(name) {
            return Ok(());
        }
        match fs::remove_dir_all(self.object_dir(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "failed to delete blob {name:?}: {e}"
            ))),
        }
    }

    /// List every object directory name, committed or not
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| AppError::Storage(format!("failed to list blob root: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Storage(format!("failed to list blob root: {e}")))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }
}

/// Streaming writer for a single object
///
/// Bytes are appended in arbitrary pieces; full chunks spill to disk as they
/// accumulate, so only one chunk is ever resident in memory.
pub struct BlobWriter {
    name: String,
    dir: PathBuf,
    chunk_size: usize,
    content_type: String,
    original_name: String,
    buf: Vec<u8>,
    chunk_count: u32,
    length: u64,
    committed: bool,
}

impl BlobWriter {
    /// Append bytes to the object
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.length += data.len() as u64;
        self.buf.extend_from_slice(data);

        while self.buf.len() >= self.chunk_size {
            let rest = self.buf.split_off(self.chunk_size);
            let chunk = std::mem::replace(&mut self.buf, rest);
            self.flush_chunk(chunk).await?;
        }

        Ok(())
    }

    async fn flush_chunk(&mut self, chunk: Vec<u8>) -> Result<()> {
        let path = self.dir.join(chunk_file_name(self.chunk_count));
        let mut file = File::create(&path)
            .await
            .map_err(|e| AppError::UploadFailed(format!("failed to write chunk: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::UploadFailed(format!("failed to write chunk: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| AppError::UploadFailed(format!("failed to sync chunk: {e}")))?;

        self.chunk_count += 1;
        Ok(())
    }

    /// Flush the tail and commit the manifest
    ///
    /// Returns the object name once the write is durable; only after this
    /// may the name be referenced from a record.
    pub async fn finish(mut self) -> Result<String> {
        if !self.buf.is_empty() {
            let tail = std::mem::take(&mut self.buf);
            self.flush_chunk(tail).await?;
        }

        let meta = BlobMeta {
            content_type: self.content_type.clone(),
            original_name: self.original_name.clone(),
            length: self.length,
            chunk_count: self.chunk_count,
            chunk_size: self.chunk_size,
        };
        let raw = serde_json::to_vec(&meta)
            .map_err(|e| AppError::Internal(format!("failed to encode manifest: {e}")))?;

        let mut file = File::create(self.dir.join(MANIFEST_FILE))
            .await
            .map_err(|e| AppError::UploadFailed(format!("failed to write manifest: {e}")))?;
        file.write_all(&raw)
            .await
            .map_err(|e| AppError::UploadFailed(format!("failed to write manifest: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| AppError::UploadFailed(format!("failed to sync manifest: {e}")))?;

        self.committed = true;
        Ok(std::mem::take(&mut self.name))
    }

    /// Discard the partial object
    pub async fn abort(mut self) {
        self.committed = true;
        let _ = fs::remove_dir_all(&self.dir).await;
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if !self.committed {
            // Best-effort cleanup of an uncommitted object.
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}

/// A committed object opened for reading
pub struct BlobObject {
    dir: PathBuf,
    meta: BlobMeta,
}

impl BlobObject {
    pub fn meta(&self) -> &BlobMeta {
        &self.meta
    }

    pub fn content_type(&self) -> &str {
        &self.meta.content_type
    }

    pub fn len(&self) -> u64 {
        self.meta.length
    }

    pub fn is_empty(&self) -> bool {
        self.meta.length == 0
    }

    /// Stream the object as chunk-sized frames
    ///
    /// Only one chunk is resident at a time, so objects larger than memory
    /// pipe straight through to their destination.
    pub fn into_stream(self) -> impl Stream<Item = std::io::Result<Bytes>> {
        futures::stream::try_unfold((self, 0u32), |(obj, idx)| async move {
            if idx >= obj.meta.chunk_count {
                return Ok(None);
            }
            let data = fs::read(obj.dir.join(chunk_file_name(idx))).await?;
            Ok(Some((Bytes::from(data), (obj, idx + 1))))
        })
    }

    /// Read the whole object into memory; intended for small objects
    pub async fn read_to_vec(self) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.meta.length as usize);
        for idx in 0..self.meta.chunk_count {
            let data = fs::read(self.dir.join(chunk_file_name(idx))).await?;
            out.extend_from_slice(&data);
        }
        Ok(out)
    }
}

fn chunk_file_name(idx: u32) -> String {
    format!("{idx:06}.bin")
}

/// Strip anything path-like from a client-supplied filename
fn sanitize_name(original: &str) -> String {
    let cleaned: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();

    if cleaned.chars().all(|c| c == '.' || c == '_') {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.chars().all(|c| c == '.')
}
