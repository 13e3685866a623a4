//! Boilerplate REST API service.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────────────┐
//!                  │                     HYDRA API                      │
//!                  │                                                    │
//!  Client Request  │  ┌─────────┐   ┌──────────┐   ┌────────────────┐  │
//!  ────────────────┼─▶│ context │──▶│ security │──▶│ header checks  │  │
//!                  │  │ + trace │   │ rl + auth│   │ (x-* headers)  │  │
//!                  │  └─────────┘   └──────────┘   └───────┬────────┘  │
//!                  │                                       │           │
//!                  │                                       ▼           │
//!                  │  ┌──────────┐   ┌──────────┐   ┌──────────────┐   │
//!  Client Response │  │ envelope │◀──│controller│◀──│  validator   │   │
//!  ◀───────────────┼──│ builder  │   │          │   │              │   │
//!                  │  └──────────┘   └────┬─────┘   └──────────────┘   │
//!                  │                      │                            │
//!                  │                      ▼                            │
//!                  │  ┌────────────────────────────────────────────┐   │
//!                  │  │   store: PostgreSQL · auth cache · counters│   │
//!                  │  └────────────────────────────────────────────┘   │
//!                  │                                                    │
//!                  │  ┌────────────────────────────────────────────┐   │
//!                  │  │        Cross-Cutting Concerns              │   │
//!                  │  │  config · observability · lifecycle · bus  │   │
//!                  │  └────────────────────────────────────────────┘   │
//!                  └────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod store;
pub mod users;

// Cross-cutting concerns
pub mod bus;
pub mod lifecycle;
pub mod mail;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
