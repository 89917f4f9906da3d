use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

/// A user-submitted review of the e-book, moderated by the admin.
///
/// `featured` is only meaningful while `approved` is true; the moderation
/// workflow never sets one without the other being consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    pub rating: u8,
    pub comment: String,
    pub name: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub featured: bool,
}

/// Lifecycle of an externally run image-generation job.
/// Monotonic: queued -> running -> succeeded | failed, no way back out of a
/// terminal state. The external API is the source of truth for this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

/// Locally mirrored copy of an image-generation task. The mirror is a
/// cache of the external task state, reconciled on every status poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImageTask {
    #[serde(rename = "_id")]
    pub id: String,
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reference to an uploaded binary asset in the content store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRef {
    pub id: String,
    pub url: String,
}

/// One unit of formatted content as entered in an authoring form. Converted
/// into the store's rich-text representation by [`build_blocks`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockInput {
    Paragraph {
        #[serde(default = "default_paragraph_style")]
        style: String,
        text: String,
    },
    Image {
        asset_ref: String,
        #[serde(default)]
        alt: Option<String>,
    },
}

fn default_paragraph_style() -> String {
    "normal".to_string()
}

/// Generates a list-rendering key for a rich-text element. Keys are only
/// used for identity within the containing document, never for business
/// logic; 8 alphanumeric characters keep the collision odds negligible.
pub fn block_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

/// Assembles the ordered rich-text block array for a document. Every block
/// and span gets a fresh key, unique within this document; keys are never
/// reused or recycled across edits.
pub fn build_blocks(inputs: &[BlockInput]) -> Vec<Value> {
    let mut used = HashSet::new();
    let mut fresh_key = move || loop {
        let key = block_key();
        if used.insert(key.clone()) {
            return key;
        }
    };

    inputs
        .iter()
        .map(|input| match input {
            BlockInput::Paragraph { style, text } => json!({
                "_type": "block",
                "_key": fresh_key(),
                "style": style,
                "markDefs": [],
                "children": [{
                    "_type": "span",
                    "_key": fresh_key(),
                    "text": text,
                    "marks": [],
                }],
            }),
            BlockInput::Image { asset_ref, alt } => {
                let mut block = json!({
                    "_type": "image",
                    "_key": fresh_key(),
                    "asset": {
                        "_type": "reference",
                        "_ref": asset_ref,
                    },
                });
                if let Some(alt) = alt {
                    block["alt"] = json!(alt);
                }
                block
            }
        })
        .collect()
}
