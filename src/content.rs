use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::MissingConfig;
use crate::models::AssetRef;

/// Typed request layer over the external headless content store.
///
/// Reads go through a cached path suitable for public pages; writes are
/// uncached, require a privileged credential and run server-side only.
/// Errors are never retried here; they propagate to the caller as upstream
/// failures.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run a filter/projection query and return its result value.
    async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Value>;

    /// Create a new document; the store assigns the identifier.
    async fn create(&self, document: Value) -> Result<Value>;

    /// Partial-field update by id. Last write wins per field.
    async fn patch(&self, id: &str, set: Value) -> Result<Value>;

    /// Upload raw bytes and return a reference to the stored asset.
    async fn upload_asset(&self, bytes: Bytes, filename: &str, content_type: &str)
        -> Result<AssetRef>;
}

/// Content store client for a Sanity-style hosted document lake.
pub struct SanityContentStore {
    client: reqwest::Client,
    project_id: String,
    dataset: String,
    api_version: String,
    read_token: Option<String>,
    write_token: Option<String>,
}

impl SanityContentStore {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id: config.content_project_id.clone(),
            dataset: config.content_dataset.clone(),
            api_version: config.content_api_version.clone(),
            read_token: config.content_read_token.clone(),
            write_token: config.content_write_token.clone(),
        }
    }

    /// Public reads hit the CDN host (eventually consistent); reads with a
    /// token must bypass the CDN.
    fn read_host(&self) -> String {
        match self.read_token {
            Some(_) => format!("https://{}.api.sanity.io", self.project_id),
            None => format!("https://{}.apicdn.sanity.io", self.project_id),
        }
    }

    fn write_host(&self) -> String {
        format!("https://{}.api.sanity.io", self.project_id)
    }

    fn write_token(&self) -> Result<&str> {
        self.write_token
            .as_deref()
            .ok_or_else(|| anyhow!(MissingConfig("CONTENT_WRITE_TOKEN")))
    }

    async fn mutate(&self, mutations: Value) -> Result<Value> {
        let token = self.write_token()?;
        let url = format!(
            "{}/v{}/data/mutate/{}?returnDocuments=true",
            self.write_host(),
            self.api_version,
            self.dataset,
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "mutations": mutations }))
            .send()
            .await
            .context("content store unreachable")?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("content store returned an unreadable body")?;

        if !status.is_success() {
            return Err(anyhow!("content store mutation failed ({}): {}", status, body));
        }

        body.pointer("/results/0/document")
            .cloned()
            .ok_or_else(|| anyhow!("content store mutation returned no document"))
    }
}

#[async_trait]
impl ContentStore for SanityContentStore {
    async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Value> {
        let url = format!(
            "{}/v{}/data/query/{}",
            self.read_host(),
            self.api_version,
            self.dataset,
        );

        let mut request = self.client.get(&url).query(&[("query", query)]);

        for (name, value) in params {
            request = request.query(&[(format!("${}", name), value.to_string())]);
        }

        if let Some(token) = &self.read_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("content store unreachable")?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("content store returned an unreadable body")?;

        if !status.is_success() {
            return Err(anyhow!("content store query failed ({}): {}", status, body));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| anyhow!("content store response missing result"))
    }

    async fn create(&self, document: Value) -> Result<Value> {
        self.mutate(json!([{ "create": document }])).await
    }

    async fn patch(&self, id: &str, set: Value) -> Result<Value> {
        self.mutate(json!([{ "patch": { "id": id, "set": set } }]))
            .await
    }

    async fn upload_asset(
        &self,
        bytes: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<AssetRef> {
        let token = self.write_token()?;
        let url = format!(
            "{}/v{}/assets/images/{}?filename={}",
            self.write_host(),
            self.api_version,
            self.dataset,
            filename,
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("content store unreachable")?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("content store returned an unreadable body")?;

        if !status.is_success() {
            return Err(anyhow!("asset upload failed ({}): {}", status, body));
        }

        let document = body
            .get("document")
            .ok_or_else(|| anyhow!("asset upload response missing document"))?;

        Ok(AssetRef {
            id: document
                .get("_id")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("asset upload response missing _id"))?
                .to_string(),
            url: document
                .get("url")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("asset upload response missing url"))?
                .to_string(),
        })
    }
}
