//! HTTP handlers for identity-service.

pub mod invitation;
pub mod membership;
pub mod metrics;
pub mod organization;

pub use invitation::*;
pub use membership::*;
pub use organization::*;
