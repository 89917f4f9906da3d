use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{auth::AdminSession, AppState};
use crate::error::ApiError;
use crate::models::{block_key, build_blocks, BlockInput};

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Reference to a previously uploaded cover image asset.
    #[serde(default)]
    pub cover_image_ref: Option<String>,
    #[serde(default)]
    pub blocks: Vec<BlockInput>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeForm {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub cover_image_ref: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<BlockInput>,
}

fn require_title_and_slug(title: &str, slug: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() || slug.trim().is_empty() {
        return Err(ApiError::Validation(
            "title and slug are required".to_string(),
        ));
    }

    Ok(())
}

fn image_block(asset_ref: &str) -> Value {
    json!({
        "_type": "image",
        "asset": { "_type": "reference", "_ref": asset_ref },
    })
}

fn post_document(form: &PostForm) -> Value {
    let mut document = json!({
        "_type": "post",
        "title": form.title,
        "slug": { "_type": "slug", "current": form.slug },
        "publishedAt": Utc::now(),
        "body": build_blocks(&form.blocks),
    });

    if let Some(excerpt) = &form.excerpt {
        document["excerpt"] = json!(excerpt);
    }

    if let Some(asset_ref) = &form.cover_image_ref {
        document["mainImage"] = image_block(asset_ref);
    }

    document
}

fn recipe_document(form: &RecipeForm) -> Value {
    // Plain-text list entries still need rendering keys.
    let ingredients: Vec<Value> = form
        .ingredients
        .iter()
        .map(|text| json!({ "_key": block_key(), "text": text }))
        .collect();

    let mut document = json!({
        "_type": "recipe",
        "title": form.title,
        "slug": { "_type": "slug", "current": form.slug },
        "publishedAt": Utc::now(),
        "ingredients": ingredients,
        "steps": build_blocks(&form.steps),
    });

    if let Some(asset_ref) = &form.cover_image_ref {
        document["mainImage"] = image_block(asset_ref);
    }

    document
}

/// Create a blog post from form input.
pub async fn create_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(form): Json<PostForm>,
) -> Result<Json<Value>, ApiError> {
    require_title_and_slug(&form.title, &form.slug)?;

    let created = state
        .content
        .create(post_document(&form))
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({ "success": true, "document": created })))
}

/// Rewrite an existing post's fields. Rich-text blocks are rebuilt with
/// fresh keys; keys are never recycled across edits.
pub async fn update_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<PostForm>,
) -> Result<Json<Value>, ApiError> {
    require_title_and_slug(&form.title, &form.slug)?;

    let mut set = post_document(&form);
    if let Some(fields) = set.as_object_mut() {
        fields.remove("_type");
    }

    let updated = state
        .content
        .patch(&id, set)
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({ "success": true, "document": updated })))
}

/// Create a recipe from form input.
pub async fn create_recipe(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(form): Json<RecipeForm>,
) -> Result<Json<Value>, ApiError> {
    require_title_and_slug(&form.title, &form.slug)?;

    let created = state
        .content
        .create(recipe_document(&form))
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({ "success": true, "document": created })))
}

/// Rewrite an existing recipe's fields.
pub async fn update_recipe(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<RecipeForm>,
) -> Result<Json<Value>, ApiError> {
    require_title_and_slug(&form.title, &form.slug)?;

    let mut set = recipe_document(&form);
    if let Some(fields) = set.as_object_mut() {
        fields.remove("_type");
    }

    let updated = state
        .content
        .patch(&id, set)
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({ "success": true, "document": updated })))
}
