//! Signed-request client for the bunq public API.
//!
//! Every request is signed with the caller's RSA key and every response is
//! checked against the server's key before its body is parsed. Sessions are
//! renewed on demand and rate-limited requests are resent after the delay the
//! server asks for.
//!
//! # Modules
//!
//! - [`api`]: Banking operations and session establishment
//! - [`client`]: The signed request pipeline
//! - [`constants`]: Header names, endpoint paths and fixed defaults
//! - [`envelope`]: Decoding of the `Response` envelope
//! - [`error`]: Error types and error handling utilities
//! - [`logging`]: Logger initialisation
//! - [`models`]: Request and response payloads
//! - [`request_signing`]: RSA keys, PEM armor, signing and verification
//! - [`retry`]: Rate-limit back-off
//! - [`session`]: Session state and credential selection
//! - [`settings`]: Configuration management and validation
//! - [`setup`]: Unsigned sandbox-user and installation calls
//! - [`test_support`]: Testing utilities and mocks
//! - [`transport`]: HTTP transport seam

pub mod api;
pub mod client;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod models;
pub mod request_signing;
pub mod retry;
pub mod session;
pub mod settings;
pub mod setup;
pub mod test_support;
pub mod transport;
