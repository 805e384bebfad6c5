use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::provider::AudioFile;

/// Multipart field that carries the recording.
pub const AUDIO_FIELD: &str = "audio";

pub const NO_AUDIO_FILE: &str = "No audio file provided";

/// An uploaded recording staged on local disk.
///
/// The guard owns the file: it is removed when the guard is dropped, whatever
/// path the request took to get there.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    file_name: String,
    content_type: Option<String>,
    size: u64,
}

impl StagedUpload {
    /// Reserve a fresh, randomly named file in `dir`.
    pub async fn create(
        dir: &Path,
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<(Self, tokio::fs::File), GatewayError> {
        let path = dir.join(Uuid::new_v4().simple().to_string());
        let file = tokio::fs::File::create(&path).await.map_err(|e| {
            GatewayError::Storage(format!("Failed to stage upload in {}: {}", dir.display(), e))
        })?;

        let upload = Self {
            path,
            file_name: client_file_name(file_name, content_type),
            content_type: content_type.map(str::to_string),
            size: 0,
        };
        Ok((upload, file))
    }

    /// Stream one multipart field to disk chunk by chunk.
    pub async fn from_field(dir: &Path, limit: usize, mut field: Field<'_>) -> Result<Self, GatewayError> {
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let (mut upload, mut file) =
            Self::create(dir, file_name.as_deref(), content_type.as_deref()).await?;

        while let Some(chunk) = field.chunk().await.map_err(|e| read_error(e, limit))? {
            file.write_all(&chunk).await.map_err(|e| upload.storage_error(e))?;
            upload.size += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| upload.storage_error(e))?;

        debug!(
            "Staged upload {} ({} bytes) at {}",
            upload.file_name,
            upload.size,
            upload.path.display()
        );
        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn audio_file(&self) -> AudioFile<'_> {
        AudioFile {
            path: &self.path,
            file_name: &self.file_name,
            content_type: self.content_type.as_deref(),
        }
    }

    fn storage_error(&self, err: std::io::Error) -> GatewayError {
        GatewayError::Storage(format!("Failed to write {}: {}", self.path.display(), err))
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        // Blocking on purpose: `Drop` cannot await, and skipping this leaks the file.
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged upload {}: {}", self.path.display(), e),
        }
    }
}

/// Pull the single `audio` file out of a multipart body and stage it.
///
/// Fields without a file name are form values, not files, and are skipped
/// along with any other field. `limit` is the body limit in force, used only
/// to report an oversized upload.
pub async fn stage_audio(
    dir: &Path,
    limit: usize,
    mut multipart: Multipart,
) -> Result<StagedUpload, GatewayError> {
    let mut staged: Option<StagedUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| read_error(e, limit))? {
        if field.name() != Some(AUDIO_FIELD) || field.file_name().is_none() {
            continue;
        }
        if staged.is_some() {
            return Err(GatewayError::validation(format!("Unexpected field: {AUDIO_FIELD}")));
        }
        staged = Some(StagedUpload::from_field(dir, limit, field).await?);
    }

    staged.ok_or_else(|| GatewayError::validation(NO_AUDIO_FILE))
}

fn read_error(err: MultipartError, limit: usize) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return GatewayError::validation(too_large(limit));
    }
    GatewayError::validation(format!("Failed to read audio upload: {}", err.body_text()))
}

fn too_large(limit: usize) -> String {
    format!("Audio file is too large (limit {limit} bytes)")
}

/// Name reported upstream: the client's base name, or one derived from the
/// content type so the provider can still tell the format.
fn client_file_name(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let base = file_name
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty());
    if let Some(name) = base {
        return name.to_string();
    }

    let ext = match content_type.unwrap_or_default() {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/ogg" => "ogg",
        "audio/flac" => "flac",
        _ => "webm",
    };
    format!("audio.{ext}")
}
