use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LeadRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Lead capture: stores the contact in the content store and sends a
/// best-effort confirmation email.
pub async fn capture(
    State(state): State<AppState>,
    Json(request): Json<LeadRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = request.email.trim();

    if !email.contains('@') || email.len() < 3 {
        return Err(ApiError::Validation("a valid email is required".to_string()));
    }

    let document = json!({
        "_type": "lead",
        "email": email,
        "name": request.name,
        "submittedAt": Utc::now(),
    });

    state
        .content
        .create(document)
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    if let Some(client) = &state.email {
        if let Err(err) = client
            .send(
                email,
                "Bienvenue !",
                "<p>Merci pour votre inscription.</p>",
            )
            .await
        {
            log::error!("lead confirmation email failed: {:#}", err);
        }
    }

    Ok(Json(json!({ "success": true })))
}
