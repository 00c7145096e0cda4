use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::MessageKind;
use crate::services::attachment_validator;
use crate::state::AppState;
use crate::storage;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    /// Message kind the upload classifies as; the client echoes it on append.
    pub kind: MessageKind,
    /// Opaque id for later deletion.
    pub storage_key: String,
}

/// POST /attachments
/// Validate and store one uploaded file. Validation runs on the declared MIME
/// type and actual byte count before anything is handed to the object store.
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: User,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|n| n.to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "upload".to_string());
        if file_name.len() > 255 {
            return Err(AppError::BadRequest("file name too long".into()));
        }

        let file_type = field
            .content_type()
            .map(|c| c.to_string())
            .ok_or_else(|| AppError::BadRequest("file part needs a content type".into()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;
        let file_size = bytes.len() as i64;
        if file_size == 0 {
            return Err(AppError::BadRequest("empty upload".into()));
        }

        let kind = attachment_validator::classify(&file_type, file_size)?;

        let key = storage::object_key(user.id, &file_name);
        let stored = state
            .attachments
            .put(&key, bytes.to_vec(), &file_type)
            .await?;

        tracing::info!(%key, file_size, kind = kind.as_str(), "attachment stored");

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url: stored.url,
                file_name,
                file_type,
                file_size,
                kind,
                storage_key: stored.key,
            }),
        ));
    }

    Err(AppError::BadRequest("missing 'file' part".into()))
}
