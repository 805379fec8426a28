//! Service plumbing shared by Storefront back-end services.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
