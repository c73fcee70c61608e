pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    adapters::mercadopago::SignatureVerifier,
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    domain::{
        provider::PaymentGateway,
        repo::{CodeStore, EmailQueue, PaymentStore},
    },
    services::{fetcher::PaymentFetcher, payment_pipeline::PaymentPipeline},
    std::{sync::Arc, time::Duration},
    tower_http::trace::TraceLayer,
};

/// Upper bound for one webhook delivery, fetch included.
pub const DEFAULT_WEBHOOK_BUDGET: Duration = Duration::from_secs(25);

#[derive(Clone)]
pub struct AppState {
    pub verifier: SignatureVerifier,
    pub fetcher: Arc<PaymentFetcher>,
    pub pipeline: Arc<PaymentPipeline>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub payments: Arc<dyn PaymentStore>,
    pub codes: Arc<dyn CodeStore>,
    pub emails: Arc<dyn EmailQueue>,
    pub webhook_budget: Duration,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/webhook", post(adapters::mercadopago::webhook_handler))
        .route(
            "/webhooks/mercadopago",
            post(adapters::mercadopago::webhook_handler),
        )
        .route("/payments", post(adapters::payments::create_payment_handler))
        .route(
            "/payments/status",
            get(adapters::payments::payment_status_handler),
        )
        .route("/codes/send", post(adapters::codes::send_code_handler))
        .route("/codes/verify", post(adapters::codes::verify_code_handler))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
