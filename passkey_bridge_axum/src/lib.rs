//! # passkey-bridge-axum
//!
//! Mounts the [`passkey_bridge`] flow as JSON endpoints:
//!
//! - `POST /auth/passkey/init` with `{email}`
//! - `POST /auth/passkey/verify` with `{userId, type, response, email}`
//! - `GET /health`
//!
//! ```no_run
//! use std::sync::Arc;
//! use passkey_bridge::PasskeyOrchestrator;
//! use passkey_bridge_axum::{cors_for_origin, passkey_bridge_router};
//!
//! fn app(orchestrator: Arc<PasskeyOrchestrator>) -> axum::Router {
//!     let origin = orchestrator.config().origin.clone();
//!     let router = passkey_bridge_router(orchestrator);
//!     match cors_for_origin(&origin) {
//!         Ok(cors) => router.layer(cors),
//!         Err(_) => router,
//!     }
//! }
//! ```

mod error;
mod health;
mod passkey;
mod router;

pub use error::{ErrorResponse, IntoResponseError};
pub use router::{cors_for_origin, passkey_bridge_router, passkey_bridge_router_no_trace};

pub use passkey_bridge::PasskeyOrchestrator;
