//! CLI-side wiring for cartflow: configuration, the completion-service
//! client, the saved customer profile, and the browser runner that
//! assembles a [`checkout_flow::CheckoutController`] over a live CDP
//! connection.

pub mod config;
pub mod llm;
pub mod profile;
pub mod runner;
