//! Product image upload.
//!
//! Accepts a single multipart field named `image`, stores it in the upload
//! directory as `image-<unix millis>.<ext>` and answers with the public path
//! under `/uploads`.

use std::path::Path;

use axum::extract::{Multipart, State};
use chrono::Utc;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Multipart field carrying the file.
pub const IMAGE_FIELD: &str = "image";

/// Public prefix the upload directory is served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// The normalized extension of an acceptable image upload.
///
/// Both the file name and, when present, the declared content type must
/// name a JPEG or PNG.
#[must_use]
pub fn image_extension(file_name: &str, content_type: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }

    match content_type {
        Some(mime) => {
            let subtype = mime.strip_prefix("image/")?.to_ascii_lowercase();
            IMAGE_EXTENSIONS
                .contains(&subtype.as_str())
                .then_some(ext)
        }
        None => Some(ext),
    }
}

/// `POST /api/upload`
///
/// # Errors
///
/// Returns 400 when the `image` field is missing or is not a JPEG/PNG, and
/// 500 when the file cannot be written.
#[instrument(skip_all)]
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<String> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let ext = image_extension(field.file_name().unwrap_or_default(), field.content_type())
            .ok_or_else(|| AppError::BadRequest("Images only!".to_string()))?;
        let bytes = field.bytes().await?;

        let dir = &state.config().upload_dir;
        let file_name = format!("{IMAGE_FIELD}-{}.{ext}", Utc::now().timestamp_millis());

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Internal(format!("create upload dir: {e}")))?;
        tokio::fs::write(dir.join(&file_name), &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("write upload: {e}")))?;

        info!(file = %file_name, size = bytes.len(), "Image uploaded");
        return Ok(format!("{UPLOADS_PREFIX}/{file_name}"));
    }

    Err(AppError::BadRequest("No image uploaded".to_string()))
}
