//! Upload staging: stream the multipart file part into a scoped temp file.
//!
//! The uploaded document is written to disk rather than buffered whole in
//! the request future so that large uploads do not pin memory while the
//! multipart body is still arriving. The file lives in a [`TempPath`]: it is
//! deleted when [`UploadedDocument`] is dropped, on every exit path of the
//! request, including early returns and panics. [`UploadedDocument::cleanup`]
//! deletes it eagerly and reports failures so the pipeline can log them.

use crate::error::ExplainError;
use axum::extract::multipart::{Field, Multipart, MultipartError};
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Name of the multipart part that carries the document.
pub const FILE_FIELD: &str = "file";

/// Filename used when the client did not send one.
const DEFAULT_FILENAME: &str = "upload.pdf";

/// A request-scoped uploaded file on local disk.
///
/// Owned by exactly one request. Dropping it removes the file.
#[derive(Debug)]
pub struct UploadedDocument {
    file_name: String,
    path: TempPath,
    size: u64,
}

impl UploadedDocument {
    /// Original filename as sent by the client.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the whole file into memory.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, ExplainError> {
        tokio::fs::read(self.path())
            .await
            .map_err(|source| ExplainError::TempFile {
                path: self.path().to_path_buf(),
                source,
            })
    }

    /// Delete the staged file now.
    ///
    /// Fails if the file was already removed or cannot be unlinked; in both
    /// cases the path is gone from our ownership afterwards.
    pub fn cleanup(self) -> Result<(), ExplainError> {
        let path = self.path.to_path_buf();
        self.path
            .close()
            .map_err(|source| ExplainError::TempFile { path, source })
    }

    /// Stage an in-memory buffer as an uploaded document.
    ///
    /// Used when the bytes did not come through multipart (tests, embedding
    /// the pipeline in another service).
    pub async fn from_bytes(
        dir: &Path,
        file_name: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, ExplainError> {
        let file_name = file_name.into();
        let (mut file, path) = create_temp_file(dir)?;
        file.write_all(bytes)
            .await
            .map_err(|source| temp_err(&path, source))?;
        file.flush().await.map_err(|source| temp_err(&path, source))?;
        Ok(Self {
            file_name,
            path,
            size: bytes.len() as u64,
        })
    }
}

/// Pull the document out of a multipart body and stage it in `dir`.
///
/// The first part named [`FILE_FIELD`] wins; every other part is drained and
/// ignored. A missing or zero-byte file is a client error.
pub async fn receive_upload(
    mut multipart: Multipart,
    dir: &Path,
) -> Result<UploadedDocument, ExplainError> {
    let mut document: Option<UploadedDocument> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(upload_err)? {
        if document.is_none() && field.name() == Some(FILE_FIELD) {
            let file_name = field
                .file_name()
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_FILENAME)
                .to_string();
            document = Some(stage_field(&mut field, file_name, dir).await?);
        } else {
            debug!("Ignoring multipart part {:?}", field.name());
            while field.chunk().await.map_err(upload_err)?.is_some() {}
        }
    }

    let document = document.ok_or_else(|| ExplainError::MissingFile {
        field: FILE_FIELD.to_string(),
    })?;

    if document.size() == 0 {
        return Err(ExplainError::EmptyFile {
            filename: document.file_name,
        });
    }

    debug!(
        "Staged upload '{}' ({} bytes) at {}",
        document.file_name(),
        document.size(),
        document.path().display()
    );
    Ok(document)
}

/// Copy one multipart field to a fresh temp file chunk by chunk.
async fn stage_field(
    field: &mut Field<'_>,
    file_name: String,
    dir: &Path,
) -> Result<UploadedDocument, ExplainError> {
    let (mut file, path) = create_temp_file(dir)?;
    let mut size = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(upload_err)? {
        file.write_all(&chunk)
            .await
            .map_err(|source| temp_err(&path, source))?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(|source| temp_err(&path, source))?;

    Ok(UploadedDocument {
        file_name,
        path,
        size,
    })
}

fn create_temp_file(dir: &Path) -> Result<(tokio::fs::File, TempPath), ExplainError> {
    let named = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(dir)
        .map_err(|source| ExplainError::TempFile {
            path: dir.to_path_buf(),
            source,
        })?;
    let (file, path) = named.into_parts();
    Ok((tokio::fs::File::from_std(file), path))
}

fn temp_err(path: &TempPath, source: std::io::Error) -> ExplainError {
    ExplainError::TempFile {
        path: path.to_path_buf(),
        source,
    }
}

fn upload_err(e: MultipartError) -> ExplainError {
    ExplainError::Upload {
        reason: e.body_text(),
    }
}
