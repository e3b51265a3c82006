mod attestation;
mod auth_data;
mod authentication;
mod client_data;
mod cose;
mod registration;

pub(crate) use authentication::{find_credential, verify_authentication};
pub(crate) use client_data::ParsedClientData;
pub(crate) use registration::verify_registration;
