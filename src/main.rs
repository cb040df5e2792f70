use std::sync::Arc;

use poem::listener::TcpListener;
use tracing::{info, warn};

use printgate::api::{build_app, AppServices};
use printgate::config::Config;
use printgate::logging;
use printgate::notifications::LogNotifier;
use printgate::orders::InMemoryOrderRepository;
use printgate::providers::build_registry;
use printgate::quotes::QuoteEngine;
use printgate::webhooks::{SignatureVerifier, WebhookProcessor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    logging::init(config.log_format);

    let (registry, skipped) = build_registry(&config.providers, config.quote_timeout);
    for (provider, reason) in &skipped {
        warn!("Provider {} not registered: {}", provider, reason);
    }
    if registry.is_empty() {
        warn!("No print provider is configured; quotes and webhooks will be unavailable");
    }

    let repository = Arc::new(InMemoryOrderRepository::new());
    let verifier = SignatureVerifier::new(config.verification_mode());
    let processor = Arc::new(WebhookProcessor::new(
        registry.clone(),
        verifier,
        repository.clone(),
        Arc::new(LogNotifier),
    ));
    let quote_engine = Arc::new(QuoteEngine::new(registry.clone(), config.quote_timeout));

    let services = AppServices {
        registry,
        repository,
        processor,
        quote_engine,
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let app = build_app(services, &format!("http://localhost:{}", config.port));

    info!("Starting PrintGate server on {}", addr);
    poem::Server::new(TcpListener::bind(&addr)).run(app).await?;

    Ok(())
}
