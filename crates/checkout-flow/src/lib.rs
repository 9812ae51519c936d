//! Checkout flow controller: drives a purchase from product page to the
//! payment page using the locator/filler/perceiver components, with the
//! model bridge as a last resort and hard guards against spinning on a
//! page that will not move.

mod cart;
mod config;
mod controller;
mod error;
mod product;
mod stages;

pub use config::FlowConfig;
pub use controller::CheckoutController;
pub use error::FlowError;

use async_trait::async_trait;

/// Collaborator asked for a password when a checkout demands a sign-in.
/// Automation never invents credentials; a `None` answer aborts the run
/// with [`FlowError::CredentialRequired`].
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn request_password(&self, context: &str) -> Option<String>;
}

/// Refuses every credential request. The right default anywhere no
/// human is attached.
pub struct DenyCredentials;

#[async_trait]
impl CredentialPrompt for DenyCredentials {
    async fn request_password(&self, _context: &str) -> Option<String> {
        None
    }
}
