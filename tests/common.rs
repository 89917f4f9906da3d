#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use shop_server::{
    config::Config,
    content::ContentStore,
    create_router,
    handlers::{auth, AppState},
    images::{GenerationTemplate, ImageGenerator, TaskStatusReport},
    models::AssetRef,
    payments::{CheckoutSessionParams, PaymentGateway},
};

/// In-memory stand-in for the external content store. Understands the
/// handful of queries the handlers issue.
pub struct FakeContentStore {
    pub docs: Mutex<HashMap<String, Value>>,
    pub fail_patch_ids: Mutex<HashSet<String>>,
    pub uploads: Mutex<Vec<(String, String, usize)>>,
    counter: AtomicUsize,
}

impl FakeContentStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
            fail_patch_ids: Mutex::new(HashSet::new()),
            uploads: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, doc: Value) {
        let id = doc["_id"].as_str().expect("doc needs _id").to_string();
        self.docs.lock().unwrap().insert(id, doc);
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(id).cloned()
    }

    pub fn fail_patches_for(&self, id: &str) {
        self.fail_patch_ids.lock().unwrap().insert(id.to_string());
    }

    fn submitted_at(doc: &Value) -> DateTime<Utc> {
        doc["submittedAt"]
            .as_str()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC)
    }

    fn reviews(&self) -> Vec<Value> {
        self.docs
            .lock()
            .unwrap()
            .values()
            .filter(|doc| doc["_type"] == "guideReview")
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContentStore for FakeContentStore {
    async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Value> {
        if query.contains("].rating") {
            let ratings: Vec<Value> = self
                .reviews()
                .into_iter()
                .filter(|doc| doc["approved"] == json!(true))
                .map(|doc| doc["rating"].clone())
                .collect();
            return Ok(Value::Array(ratings));
        }

        if query.contains("featured == true") {
            let mut featured: Vec<Value> = self
                .reviews()
                .into_iter()
                .filter(|doc| doc["approved"] == json!(true) && doc["featured"] == json!(true))
                .collect();
            featured.sort_by_key(|doc| std::cmp::Reverse(Self::submitted_at(doc)));
            featured.truncate(3);
            return Ok(Value::Array(featured));
        }

        if query.contains("generatedImageTask") {
            let task_id = params
                .iter()
                .find(|(name, _)| *name == "taskId")
                .and_then(|(_, value)| value.as_str())
                .unwrap_or("");
            let found = self
                .docs
                .lock()
                .unwrap()
                .values()
                .find(|doc| {
                    doc["_type"] == "generatedImageTask" && doc["taskId"] == json!(task_id)
                })
                .cloned();
            return Ok(found.unwrap_or(Value::Null));
        }

        if query.contains("_id == $id") {
            let id = params
                .iter()
                .find(|(name, _)| *name == "id")
                .and_then(|(_, value)| value.as_str())
                .unwrap_or("");
            return Ok(self.get(id).unwrap_or(Value::Null));
        }

        Err(anyhow!("fake store does not understand query: {}", query))
    }

    async fn create(&self, mut document: Value) -> Result<Value> {
        let id = format!("doc-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        document["_id"] = json!(id);
        self.docs.lock().unwrap().insert(id, document.clone());
        Ok(document)
    }

    async fn patch(&self, id: &str, set: Value) -> Result<Value> {
        if self.fail_patch_ids.lock().unwrap().contains(id) {
            return Err(anyhow!("store write failed for {}", id));
        }

        let mut docs = self.docs.lock().unwrap();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| anyhow!("document {} not found", id))?;

        for (field, value) in set.as_object().cloned().unwrap_or_default() {
            doc[field] = value;
        }

        Ok(doc.clone())
    }

    async fn upload_asset(
        &self,
        bytes: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<AssetRef> {
        self.uploads
            .lock()
            .unwrap()
            .push((filename.to_string(), content_type.to_string(), bytes.len()));

        Ok(AssetRef {
            id: "image-fake0001-800x600-png".to_string(),
            url: "https://cdn.example/images/fake0001.png".to_string(),
        })
    }
}

/// Scripted generator: submit always yields `submit_id`, status is read
/// from the `reports` table.
pub struct FakeImageGenerator {
    pub submit_id: String,
    pub reports: Mutex<HashMap<String, TaskStatusReport>>,
    pub submits: AtomicUsize,
}

impl FakeImageGenerator {
    pub fn new() -> Self {
        Self {
            submit_id: "task-1".to_string(),
            reports: Mutex::new(HashMap::new()),
            submits: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, task_id: &str, report: TaskStatusReport) {
        self.reports
            .lock()
            .unwrap()
            .insert(task_id.to_string(), report);
    }
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn submit(&self, _prompt: &str, _template: &GenerationTemplate) -> Result<String> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(self.submit_id.clone())
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatusReport> {
        self.reports
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown task {}", task_id))
    }
}

/// Gateway fake that counts session-creation calls.
pub struct CountingGateway {
    pub calls: AtomicUsize,
    pub last_params: Mutex<Option<CheckoutSessionParams>>,
}

impl CountingGateway {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn create_checkout_session(&self, params: &CheckoutSessionParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());
        Ok("https://pay.example/session/cs_test_123".to_string())
    }
}

pub fn test_config() -> Config {
    Config {
        server_port: 0,
        environment: "development".to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        content_project_id: "testproj".to_string(),
        content_dataset: "test".to_string(),
        content_api_version: "2024-01-01".to_string(),
        content_read_token: None,
        content_write_token: None,
        payment_secret_key: Some("sk_test_123".to_string()),
        payment_price_id: Some("price_123".to_string()),
        payment_webhook_secret: Some("whsec_test".to_string()),
        payment_api_base: "https://api.stripe.com".to_string(),
        image_api_base: Some("https://images.example/api".to_string()),
        image_api_key: Some("img_test_key".to_string()),
        email_api_key: None,
        email_sender: "no-reply@localhost".to_string(),
        ebook_download_url: Some("https://cdn.example/ebook.pdf".to_string()),
        admin_password: Some("hunter2".to_string()),
        session_key: "test-session-key".to_string(),
        log_level: "info".to_string(),
    }
}

pub struct TestSetup {
    pub config: Config,
    pub store: Arc<FakeContentStore>,
    pub images: Arc<FakeImageGenerator>,
    pub gateway: Arc<CountingGateway>,
    pub with_payments: bool,
    pub with_images: bool,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            store: Arc::new(FakeContentStore::new()),
            images: Arc::new(FakeImageGenerator::new()),
            gateway: Arc::new(CountingGateway::new()),
            with_payments: true,
            with_images: true,
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            config: Arc::new(self.config.clone()),
            content: self.store.clone(),
            images: self
                .with_images
                .then(|| self.images.clone() as Arc<dyn ImageGenerator>),
            payments: self
                .with_payments
                .then(|| self.gateway.clone() as Arc<dyn PaymentGateway>),
            email: None,
        };

        create_router(state)
    }

    pub fn admin_cookie(&self) -> String {
        format!(
            "{}={}",
            auth::SESSION_COOKIE,
            auth::create_session(&self.config.session_key),
        )
    }

    pub fn insert_review(
        &self,
        id: &str,
        rating: u8,
        approved: bool,
        featured: bool,
        submitted_at: &str,
    ) {
        self.store.insert(json!({
            "_id": id,
            "_type": "guideReview",
            "rating": rating,
            "comment": format!("comment for {}", id),
            "name": format!("reader {}", id),
            "submittedAt": submitted_at,
            "approved": approved,
            "featured": featured,
        }));
    }
}

async fn dispatch(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("request failed");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body read failed")
        .to_bytes();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, body)
}

pub async fn get(router: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }

    dispatch(router, builder.body(Body::empty()).unwrap()).await
}

pub async fn send_json(
    router: &Router,
    method: &str,
    uri: &str,
    body: &Value,
    cookie: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }

    dispatch(
        router,
        builder
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
    )
    .await
}

pub async fn send_raw(
    router: &Router,
    method: &str,
    uri: &str,
    body: Vec<u8>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    dispatch(router, builder.body(Body::from(body)).unwrap()).await
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
