//! Upload acceptor: reads the multipart form, gates the resume on type and
//! size, and streams it to a uniquely named temp file.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use chrono::Utc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::intake::models::{IntakeForm, StoredResume};

/// Largest resume accepted, in bytes.
pub const MAX_RESUME_BYTES: u64 = 5 * 1024 * 1024;

/// Room left in the request body for the text fields and multipart framing.
pub const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub const RESUME_FIELD: &str = "resume";

pub const ALLOWED_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const MAX_STORED_NAME_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file type '{0}' is not accepted")]
    UnsupportedType(String),

    #[error("file exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("unexpected file field '{0}'")]
    UnexpectedFile(String),

    #[error("malformed multipart body: {0}")]
    Malformed(String),

    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
}

impl UploadError {
    /// Client-facing text. `Storage` never reaches a client as a 400.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::UnsupportedType(_) => {
                "Invalid file type. Only PDF, DOC and DOCX files are allowed.".to_string()
            }
            UploadError::TooLarge { limit } => format!(
                "File too large. Maximum size is {}MB.",
                limit / (1024 * 1024)
            ),
            UploadError::UnexpectedFile(_) => {
                format!("Only a single file in the '{RESUME_FIELD}' field is accepted.")
            }
            UploadError::Malformed(_) => "The form submission could not be read.".to_string(),
            UploadError::Storage(_) => "The uploaded file could not be stored.".to_string(),
        }
    }
}

/// The per-process temp upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: u64,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: MAX_RESUME_BYTES,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Creates the directory and removes uploads left behind by a previous
    /// process that died mid-request. Returns how many files were removed.
    pub async fn prepare(&self) -> std::io::Result<usize> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_file = entry.file_type().await?.is_file();
            let name = entry.file_name();
            if is_file && is_stored_upload_name(&name.to_string_lossy()) {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drains the multipart body into an `IntakeForm`.
    ///
    /// Text fields are collected as-is; presence is the validator's job. The
    /// resume is type-checked before any byte hits disk and size-checked
    /// while streaming.
    pub async fn accept(&self, mut multipart: Multipart) -> Result<IntakeForm, UploadError> {
        let mut form = IntakeForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| self.multipart_error(e))?
        {
            let field_name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                if field_name != RESUME_FIELD || form.resume.is_some() {
                    return Err(UploadError::UnexpectedFile(field_name));
                }
                // An untouched file input arrives with an empty file name.
                if file_name.is_empty() {
                    continue;
                }
                form.resume = Some(self.store(field, file_name).await?);
                continue;
            }

            let slot = match field_name.as_str() {
                "name" => &mut form.name,
                "email" => &mut form.email,
                "position" => &mut form.position,
                other => {
                    debug!(field = other, "ignoring unknown form field");
                    continue;
                }
            };
            *slot = Some(field.text().await.map_err(|e| self.multipart_error(e))?);
        }

        Ok(form)
    }

    async fn store(
        &self,
        mut field: Field<'_>,
        file_name: String,
    ) -> Result<StoredResume, UploadError> {
        let original_name = base_name(&file_name);
        let mime_type = resolve_mime(field.content_type(), &original_name);
        if !ALLOWED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(UploadError::UnsupportedType(mime_type));
        }

        let prefix = format!("{}-", Utc::now().timestamp_millis());
        let suffix = format!("-{}", sanitize_file_name(&original_name));
        let (file, path) = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(8)
            .tempfile_in(&self.dir)?
            .into_parts();

        // `path` deletes the partial file if anything below bails out.
        let mut file = tokio::fs::File::from_std(file);
        let mut size_bytes: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(|e| self.multipart_error(e))? {
            size_bytes += chunk.len() as u64;
            if size_bytes > self.max_bytes {
                return Err(UploadError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        info!(
            file = %original_name,
            mime = %mime_type,
            size_bytes,
            "resume stored"
        );
        Ok(StoredResume::new(original_name, mime_type, size_bytes, path))
    }

    fn multipart_error(&self, err: MultipartError) -> UploadError {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge {
                limit: self.max_bytes,
            }
        } else {
            UploadError::Malformed(err.body_text())
        }
    }
}

/// Uses the declared content type unless the client left it blank or generic,
/// in which case the extension decides.
fn resolve_mime(declared: Option<&str>, file_name: &str) -> String {
    let declared = declared
        .and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    declared.unwrap_or_else(|| {
        mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    })
}

/// Strips any client-side directory components.
fn base_name(file_name: &str) -> String {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .to_string()
}

fn sanitize_file_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        return "resume".to_string();
    }

    // Keep the tail so the extension survives truncation.
    let skip = trimmed.chars().count().saturating_sub(MAX_STORED_NAME_CHARS);
    trimmed.chars().skip(skip).collect()
}

/// Matches the `<millis>-<random>-<name>` layout produced by `store`.
fn is_stored_upload_name(name: &str) -> bool {
    match name.split_once('-') {
        Some((millis, rest)) => {
            !millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit()) && rest.contains('-')
        }
        None => false,
    }
}
