use std::sync::Arc;

use shop_server::{
    config::Config,
    content::SanityContentStore,
    email::EmailClient,
    handlers::AppState,
    images::HostedImageApi,
    payments::StripeGateway,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Arc::new(Config::from_env()?);
    log::info!(
        "starting shop server on port {} ({})",
        config.server_port,
        config.environment,
    );

    let content = Arc::new(SanityContentStore::new(&config));

    let payments = config.payment_secret_key.as_ref().map(|secret| {
        Arc::new(StripeGateway::new(
            config.payment_api_base.clone(),
            secret.clone(),
        )) as Arc<dyn shop_server::payments::PaymentGateway>
    });
    if payments.is_none() {
        log::warn!("PAYMENT_SECRET_KEY not set; checkout is disabled");
    }

    let images = match (&config.image_api_base, &config.image_api_key) {
        (Some(base), Some(key)) => Some(Arc::new(HostedImageApi::new(
            base.clone(),
            key.clone(),
        )) as Arc<dyn shop_server::images::ImageGenerator>),
        _ => {
            log::warn!("IMAGE_API_BASE/IMAGE_API_KEY not set; design studio is disabled");
            None
        }
    };

    let email = config.email_api_key.as_ref().map(|key| {
        Arc::new(EmailClient::new(key.clone(), config.email_sender.clone()))
    });
    if email.is_none() {
        log::warn!("EMAIL_API_KEY not set; outbound email is disabled");
    }

    let state = AppState {
        config: config.clone(),
        content,
        images,
        payments,
        email,
    };

    let app = shop_server::create_router(state);

    let listener =
        tokio::net::TcpListener::bind(("0.0.0.0", config.server_port)).await?;
    log::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
