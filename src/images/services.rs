use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::extract::multipart::Field;
use temp_dir::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{multipart_error, AppError};
use crate::state::AppState;

/// Poster spooled to a private temporary directory. The directory, and the
/// file in it, are removed when this value is dropped.
pub struct PosterUpload {
    dir: TempDir,
    path: PathBuf,
    pub content_type: String,
    pub ext: &'static str,
    pub size: u64,
}

impl PosterUpload {
    pub fn dir_path(&self) -> &Path {
        self.dir.path()
    }

    /// Streams a multipart file field to disk chunk by chunk.
    pub async fn spool(mut field: Field<'_>, max_upload_mb: usize) -> Result<Self, AppError> {
        let content_type = field
            .content_type()
            .map(str::to_owned)
            .unwrap_or_else(|| "application/octet-stream".into());
        let ext = ext_from_mime(&content_type).ok_or_else(|| {
            AppError::validation(format!("Unsupported poster type: {}", content_type))
        })?;

        let dir = TempDir::new().context("create upload temp dir")?;
        let path = dir.path().join(format!("poster.{}", ext));
        let mut file = tokio::fs::File::create(&path)
            .await
            .context("create upload temp file")?;

        let mut size = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_upload_mb))?
        {
            size += chunk.len() as u64;
            file.write_all(&chunk).await.context("write upload temp file")?;
        }
        file.flush().await.context("flush upload temp file")?;

        if size == 0 {
            return Err(AppError::validation("Poster file is empty"));
        }

        Ok(Self {
            dir,
            path,
            content_type,
            ext,
            size,
        })
    }

    #[cfg(test)]
    pub async fn from_bytes(content_type: &str, body: &[u8]) -> Self {
        let ext = ext_from_mime(content_type).unwrap_or("bin");
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("poster.{}", ext));
        tokio::fs::write(&path, body).await.unwrap();
        Self {
            dir,
            path,
            content_type: content_type.to_owned(),
            ext,
            size: body.len() as u64,
        }
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Uploads the poster and returns its public URL. The spooled file is
/// consumed, so its temporary directory is gone when this returns.
#[instrument(skip(st, poster), fields(size = poster.size))]
pub async fn upload_poster(
    st: &AppState,
    organizer_id: Uuid,
    poster: PosterUpload,
) -> Result<String, AppError> {
    let key = format!("event_posters/{}/{}.{}", organizer_id, Uuid::new_v4(), poster.ext);
    debug!(%key, spool = %poster.dir_path().display(), "uploading poster");

    if let Err(e) = st
        .storage
        .put_file(&key, &poster.path, &poster.content_type)
        .await
    {
        error!(error = ?e, %key, "poster upload failed");
        return Err(AppError::ExternalService("Image upload failed".into()));
    }

    info!(%key, "poster uploaded");
    Ok(st.storage.public_url(&key))
}

/// Best-effort removal of a poster we stored earlier.
pub async fn discard_poster(st: &AppState, url: &str) {
    let Some(key) = st.storage.key_from_url(url) else {
        return;
    };
    if let Err(e) = st.storage.delete_object(&key).await {
        warn!(error = ?e, %key, "poster cleanup failed");
    }
}
