pub mod auth;
pub mod authoring;
pub mod checkout;
pub mod leads;
pub mod reviews;
pub mod studio;
pub mod upload;

use std::sync::Arc;

use crate::config::Config;
use crate::content::ContentStore;
use crate::email::EmailClient;
use crate::images::ImageGenerator;
use crate::payments::PaymentGateway;

/// Shared application state. Clients are constructed once at startup and
/// injected here; they hold no request-specific state and are safe to share
/// across concurrent requests. Optional fields correspond to integrations
/// that degrade to configuration errors when unconfigured.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub content: Arc<dyn ContentStore>,
    pub images: Option<Arc<dyn ImageGenerator>>,
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub email: Option<Arc<EmailClient>>,
}
