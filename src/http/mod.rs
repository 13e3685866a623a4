//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request context, header validation)
//!     → [security: rate limit, auth]
//!     → routes (users module, probes, api docs)
//!     → response.rs (uniform envelope)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod vitals;

pub use request::{RequestContext, X_REQUEST_ID};
pub use response::{ApiReply, ErrorDetail, Meta, ResponseKind};
pub use server::{AppState, HttpServer};
