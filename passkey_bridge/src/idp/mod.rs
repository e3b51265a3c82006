//! Identity provider hand-off: turns a verified email into provider-issued tokens.

mod config;
mod errors;
mod keycloak;
mod types;

pub use config::KeycloakConfig;
pub use errors::IdpError;
pub use keycloak::KeycloakTokenProvider;
pub use types::{TokenBundle, TokenProvider};
