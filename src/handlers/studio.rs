use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{auth::AdminSession, AppState};
use crate::error::ApiError;
use crate::images::GenerationTemplate;

const TASK_MIRROR_QUERY: &str = r#"*[_type == "generatedImageTask" && taskId == $taskId][0]"#;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub template: GenerationTemplate,
}

/// Submits a generation request to the external AI API and mirrors the new
/// task into the content store.
pub async fn generate(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::Validation("prompt is required".to_string()));
    }

    let Some(images) = &state.images else {
        return Err(ApiError::config(&state.config, "IMAGE_API_KEY"));
    };

    let task_id = images
        .submit(&request.prompt, &request.template)
        .await
        .map_err(|err| ApiError::upstream(&state.config, err))?;

    // Mirror creation is part of the submit flow; a failure here is
    // surfaced, unlike reconciliation during polling.
    state
        .content
        .create(json!({
            "_type": "generatedImageTask",
            "taskId": task_id,
            "status": "queued",
            "prompt": request.prompt,
            "requestedAt": Utc::now(),
        }))
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({ "taskId": task_id })))
}

/// Polls the external API for a task's current status and best-effort
/// reconciles the mirrored document. Status is always re-derived from the
/// external source of truth; the local document is a cache, never
/// authoritative. Repeated polls are idempotent.
pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if task_id.trim().is_empty() {
        return Err(ApiError::Validation("taskId is required".to_string()));
    }

    let Some(images) = &state.images else {
        return Err(ApiError::config(&state.config, "IMAGE_API_KEY"));
    };

    let report = images
        .status(&task_id)
        .await
        .map_err(|err| ApiError::upstream(&state.config, err))?;

    // Overwrite the mirror with the freshly fetched values. Last writer
    // wins; the mirror update is not required for a correct response.
    match state
        .content
        .fetch(TASK_MIRROR_QUERY, &[("taskId", json!(task_id))])
        .await
    {
        Ok(mirror) => match mirror.get("_id").and_then(Value::as_str) {
            Some(mirror_id) => {
                let mut set = json!({ "status": report.status });
                if let Some(result_url) = &report.result_url {
                    set["resultUrl"] = json!(result_url);
                }
                if let Some(error) = &report.error {
                    set["error"] = json!(error);
                }

                if let Err(err) = state.content.patch(mirror_id, set).await {
                    log::warn!("failed to reconcile task mirror {}: {:#}", task_id, err);
                }
            }
            None => {
                log::warn!("no mirror document for task {}", task_id);
            }
        },
        Err(err) => {
            log::warn!("mirror lookup failed for task {}: {:#}", task_id, err);
        }
    }

    Ok(Json(serde_json::to_value(&report).map_err(|err| {
        ApiError::upstream(&state.config, err.into())
    })?))
}
