//! Auth types shared across Storefront services.
//!
//! Provides the gateway `IdentityHeaders` extractor and the cookie that carries
//! a passcode token between the issue and verify steps of a flow.

pub mod cookie;
pub mod identity;
