//! User module: model, validation, persistence, controllers and routes.
//!
//! # Data Flow
//! ```text
//! router.rs (verb/path bindings)
//!     → controller.rs (sequence validator → service → envelope)
//!     → validator.rs (pure payload checks)
//!     → service.rs (one persistence action per call; cache invalidation)
//! ```

pub mod controller;
pub mod docs;
pub mod model;
pub mod router;
pub mod service;
pub mod validator;

pub use model::{FindUsersParams, PublicUser, UserPayload};
pub use service::{PgUserRepo, UserRepo};
