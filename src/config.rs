use envconfig::Envconfig;

/// Server configuration, loaded from environment variables.
///
/// Every external integration is optional: a missing credential degrades the
/// owning feature to an explicit configuration error at its route rather
/// than a silent no-op.
#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "SERVER_PORT", default = "8080")]
    pub server_port: u16,

    #[envconfig(from = "APP_ENV", default = "development")]
    pub environment: String,

    /// Base URL of the public site, used for checkout redirect targets.
    #[envconfig(from = "PUBLIC_BASE_URL", default = "http://localhost:3000")]
    pub public_base_url: String,

    #[envconfig(from = "CONTENT_PROJECT_ID", default = "dev-project")]
    pub content_project_id: String,

    #[envconfig(from = "CONTENT_DATASET", default = "production")]
    pub content_dataset: String,

    #[envconfig(from = "CONTENT_API_VERSION", default = "2024-01-01")]
    pub content_api_version: String,

    /// Absent for public datasets; reads then go through the CDN host.
    #[envconfig(from = "CONTENT_READ_TOKEN")]
    pub content_read_token: Option<String>,

    /// Required for mutations and asset uploads.
    #[envconfig(from = "CONTENT_WRITE_TOKEN")]
    pub content_write_token: Option<String>,

    #[envconfig(from = "PAYMENT_SECRET_KEY")]
    pub payment_secret_key: Option<String>,

    #[envconfig(from = "PAYMENT_PRICE_ID")]
    pub payment_price_id: Option<String>,

    #[envconfig(from = "PAYMENT_WEBHOOK_SECRET")]
    pub payment_webhook_secret: Option<String>,

    #[envconfig(from = "PAYMENT_API_BASE", default = "https://api.stripe.com")]
    pub payment_api_base: String,

    #[envconfig(from = "IMAGE_API_BASE")]
    pub image_api_base: Option<String>,

    #[envconfig(from = "IMAGE_API_KEY")]
    pub image_api_key: Option<String>,

    #[envconfig(from = "EMAIL_API_KEY")]
    pub email_api_key: Option<String>,

    #[envconfig(from = "EMAIL_SENDER", default = "no-reply@localhost")]
    pub email_sender: String,

    /// Link mailed out after a completed e-book checkout.
    #[envconfig(from = "EBOOK_DOWNLOAD_URL")]
    pub ebook_download_url: Option<String>,

    #[envconfig(from = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,

    #[envconfig(from = "SESSION_KEY", default = "change-me-in-production")]
    pub session_key: String,

    #[envconfig(from = "RUST_LOG", default = "info")]
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Self::init_from_env()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
