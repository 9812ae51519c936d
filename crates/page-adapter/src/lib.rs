//! Page adapter: the only crate in the workspace that knows how to talk to
//! a browser.
//!
//! Everything above this layer works with [`DomProbe`], a semantic
//! capability surface expressed in terms of harvested attribute bags and
//! transient element handles. The production implementation
//! ([`cdp::CdpProbe`], feature `cdp`) drives a real page over the Chrome
//! DevTools Protocol; [`fake::FakeDom`] (feature `fake-dom`) is an
//! in-memory page model for tests.

mod error;
mod probe;

#[cfg(feature = "cdp")]
mod cdp;
#[cfg(feature = "cdp")]
mod js;

#[cfg(feature = "fake-dom")]
pub mod fake;

pub use error::AdapterError;
pub use probe::{DomProbe, FillMode};

#[cfg(feature = "cdp")]
pub use cdp::CdpProbe;
