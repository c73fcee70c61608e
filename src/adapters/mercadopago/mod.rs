pub mod client;
pub mod signature;
pub mod webhook;

pub use client::{MercadoPagoClient, RestLookup, SearchLookup};
pub use signature::SignatureVerifier;
pub use webhook::{WebhookOutcome, handle_delivery, webhook_handler};
