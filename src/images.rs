use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::TaskStatus;

/// Descriptor for one of the fixed generation presets offered by the design
/// studio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationTemplate {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub style: Option<String>,
}

/// Snapshot of an external generation task, as reported by the AI API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusReport {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

/// External AI image-generation API. Submitting yields a task identifier;
/// status is re-fetched on every poll, the API being the single source of
/// truth for the task lifecycle.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn submit(&self, prompt: &str, template: &GenerationTemplate) -> Result<String>;

    async fn status(&self, task_id: &str) -> Result<TaskStatusReport>;
}

/// Client for the hosted generation API.
pub struct HostedImageApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HostedImageApi {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn map_status(raw: &str) -> Result<TaskStatus> {
        match raw.to_ascii_lowercase().as_str() {
            "queued" | "pending" => Ok(TaskStatus::Queued),
            "running" | "processing" | "in_progress" => Ok(TaskStatus::Running),
            "succeeded" | "complete" | "completed" => Ok(TaskStatus::Succeeded),
            "failed" | "error" => Ok(TaskStatus::Failed),
            other => bail!("image API reported unknown status {:?}", other),
        }
    }
}

#[async_trait]
impl ImageGenerator for HostedImageApi {
    async fn submit(&self, prompt: &str, template: &GenerationTemplate) -> Result<String> {
        let url = format!("{}/generations", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "prompt": prompt,
                "template": template.name,
                "width": template.width,
                "height": template.height,
                "style": template.style,
            }))
            .send()
            .await
            .context("image API unreachable")?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("image API returned an unreadable body")?;

        if !status.is_success() {
            return Err(anyhow!("image API submit failed ({}): {}", status, body));
        }

        body.get("taskId")
            .or_else(|| body.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("image API submit response missing task id"))
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatusReport> {
        let url = format!("{}/generations/{}", self.base_url, task_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("image API unreachable")?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("image API returned an unreadable body")?;

        if !status.is_success() {
            return Err(anyhow!("image API status failed ({}): {}", status, body));
        }

        let raw_status = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("image API status response missing status"))?;

        Ok(TaskStatusReport {
            status: Self::map_status(raw_status)?,
            result_url: body
                .get("resultUrl")
                .and_then(Value::as_str)
                .map(str::to_string),
            error: body.get("error").and_then(Value::as_str).map(str::to_string),
            progress: body
                .get("progress")
                .and_then(Value::as_f64)
                .map(|p| p as f32),
        })
    }
}
