use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::error::ApiError;

/// Accepted image MIME types; everything else is rejected before any call
/// to the store.
const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Inclusive upload ceiling: a body of exactly 5 MiB is accepted.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub filename: Option<String>,
}

/// Uploads raw image bytes to the content store and returns the asset
/// reference. The asset is embedded into a document by a later, independent
/// save step; an orphaned asset on save failure is accepted.
pub async fn upload_asset(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or("").trim().to_string())
        .unwrap_or_default();

    if !ALLOWED_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "unsupported file type {:?}; accepted: jpeg, png, gif, webp",
            content_type,
        )));
    }

    if body.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::Validation(format!(
            "file exceeds the {} byte limit",
            MAX_UPLOAD_BYTES,
        )));
    }

    if body.is_empty() {
        return Err(ApiError::Validation("empty upload".to_string()));
    }

    let filename = query.filename.unwrap_or_else(|| "upload.bin".to_string());

    let asset = state
        .content
        .upload_asset(body, &filename, &content_type)
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({
        "asset": {
            "_id": asset.id,
            "_type": "sanity.imageAsset",
            "_ref": asset.id,
            "url": asset.url,
        }
    })))
}
