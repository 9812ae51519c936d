//! Core domain types shared across the cartflow workspace.
//!
//! Everything here is plain data: tasks and customer profiles coming in,
//! element descriptions harvested from a page, and the uniform outcome
//! types flowing back out. No crate in the workspace talks to a browser
//! through anything other than these shapes.

mod customer;
mod dom;
mod outcome;
mod report;
mod retry;
mod task;

pub use customer::{CheckoutRequest, Contact, Customer, ShippingAddress};
pub use dom::{
    ButtonInfo, ElementHandle, FieldInfo, FieldKind, MatchMethod, MatchResult, RadioOption,
    SelectOption, UnknownFieldKind,
};
pub use outcome::ActionOutcome;
pub use report::{RunId, RunPhase, RunReport};
pub use retry::RetryPolicy;
pub use task::Task;
