//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (fixed-window check per client address)
//!     → auth.rs (bearer / basic / none, allow-list aware)
//!     → Pass to header validation and routing
//!
//! Supporting pieces:
//!     jwks.rs   (remote key set client for bearer mode)
//!     crypto.rs (salted password hashing for basic mode)
//! ```
//!
//! # Design Decisions
//! - Fail closed: any verification failure rejects the request
//! - Rejections use the uniform envelope, never bare status codes
//! - No trust in client input

pub mod auth;
pub mod crypto;
pub mod jwks;
pub mod rate_limit;

pub use auth::{AuthRecord, AuthUser, CredentialSource};
pub use rate_limit::RateLimiter;
