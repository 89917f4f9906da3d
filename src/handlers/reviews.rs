use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{auth::AdminSession, AppState};
use crate::error::ApiError;
use crate::models::Review;

/// Ratings of the full approved population. Kept separate from the featured
/// query: the mean must include non-featured approved reviews.
const APPROVED_RATINGS_QUERY: &str = r#"*[_type == "guideReview" && approved == true].rating"#;

const FEATURED_REVIEWS_QUERY: &str = r#"*[_type == "guideReview" && approved == true && featured == true] | order(submittedAt desc)[0...3]"#;

const REVIEW_BY_ID_QUERY: &str = r#"*[_type == "guideReview" && _id == $id][0]"#;

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub rating: u8,
    pub comment: String,
    pub name: String,
}

/// Public review submission. Reviews always start unapproved; only the
/// moderation workflow makes them visible.
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitReviewRequest>,
) -> Result<Json<Value>, ApiError> {
    if !(1..=5).contains(&request.rating) {
        return Err(ApiError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    if request.comment.trim().is_empty() || request.name.trim().is_empty() {
        return Err(ApiError::Validation(
            "comment and name are required".to_string(),
        ));
    }

    let document = json!({
        "_type": "guideReview",
        "rating": request.rating,
        "comment": request.comment,
        "name": request.name,
        "submittedAt": Utc::now(),
        "approved": false,
        "featured": false,
    });

    let created = state
        .content
        .create(document)
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({
        "success": true,
        "id": created.get("_id"),
    })))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    #[serde(default = "default_true")]
    pub approved: bool,
}

impl Default for ApproveRequest {
    fn default() -> Self {
        Self { approved: true }
    }
}

/// Approve (or un-approve) a review. Un-approving also clears `featured`:
/// a review must never remain featured while unapproved.
pub async fn approve(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ApproveRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let set = if request.approved {
        json!({ "approved": true })
    } else {
        json!({ "approved": false, "featured": false })
    };

    let review = state
        .content
        .patch(&id, set)
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({ "success": true, "review": review })))
}

#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    #[serde(default = "default_true")]
    pub featured: bool,
}

impl Default for FeatureRequest {
    fn default() -> Self {
        Self { featured: true }
    }
}

/// Feature (or un-feature) a review. Featuring always sets both fields
/// together so `featured == true` can never coexist with
/// `approved == false`.
pub async fn feature(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<FeatureRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let set = if request.featured {
        json!({ "approved": true, "featured": true })
    } else {
        json!({ "featured": false })
    };

    let review = state
        .content
        .patch(&id, set)
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    Ok(Json(json!({ "success": true, "review": review })))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Unapprove,
    Feature,
    Unfeature,
}

impl ModerationAction {
    fn set_fields(self) -> Value {
        match self {
            ModerationAction::Approve => json!({ "approved": true }),
            ModerationAction::Unapprove => json!({ "approved": false, "featured": false }),
            ModerationAction::Feature => json!({ "approved": true, "featured": true }),
            ModerationAction::Unfeature => json!({ "featured": false }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ModerationBatchRequest {
    pub items: Vec<ModerationItem>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationItem {
    pub id: String,
    pub action: ModerationAction,
}

#[derive(Debug, Serialize)]
pub struct ModerationOutcome {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch moderation. Each transition is attempted independently; one
/// review's failure never aborts processing of the rest, and every outcome
/// is reported individually.
pub async fn moderate_batch(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(request): Json<ModerationBatchRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut results = Vec::with_capacity(request.items.len());

    for item in request.items {
        let outcome = match state
            .content
            .patch(&item.id, item.action.set_fields())
            .await
        {
            Ok(_) => ModerationOutcome {
                id: item.id,
                success: true,
                error: None,
            },
            Err(err) => {
                log::error!("moderation of {} failed: {:#}", item.id, err);
                ModerationOutcome {
                    id: item.id,
                    success: false,
                    error: Some(if state.config.is_production() {
                        "upstream failure".to_string()
                    } else {
                        err.to_string()
                    }),
                }
            }
        };

        results.push(outcome);
    }

    Ok(Json(json!({ "results": results })))
}

/// Fetch a single review document. Used by the admin back-office detail
/// view.
pub async fn get_review(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = state
        .content
        .fetch(REVIEW_BY_ID_QUERY, &[("id", json!(id))])
        .await
        .map_err(|err| ApiError::from_store(&state.config, err))?;

    if result.is_null() {
        return Err(ApiError::Validation("review not found".to_string()));
    }

    Ok(Json(result))
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Public stats for the review section: count and mean over all approved
/// reviews, plus the up-to-3 most recent featured ones. The two queries are
/// independent and deliberately not merged.
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let (ratings, featured) = tokio::join!(
        state.content.fetch(APPROVED_RATINGS_QUERY, &[]),
        state.content.fetch(FEATURED_REVIEWS_QUERY, &[]),
    );

    let ratings = ratings.map_err(|err| ApiError::from_store(&state.config, err))?;
    let featured = featured.map_err(|err| ApiError::from_store(&state.config, err))?;

    let ratings: Vec<f64> = serde_json::from_value(ratings)
        .map_err(|err| ApiError::upstream(&state.config, err.into()))?;

    let featured: Vec<Review> = serde_json::from_value(featured)
        .map_err(|err| ApiError::upstream(&state.config, err.into()))?;

    let total = ratings.len();
    let average = if total == 0 {
        0.0
    } else {
        round_one_decimal(ratings.iter().sum::<f64>() / total as f64)
    };

    Ok(Json(json!({
        "success": true,
        "stats": {
            "totalReviews": total,
            "averageRating": average,
        },
        "featuredReviews": featured,
    })))
}
