//! Request signing utilities for secure communication.
//!
//! This module provides RSA key handling (PEM armor, generation) and the
//! signer that authenticates outgoing requests and verifies server responses.

pub mod keys;
pub mod signing;

pub use keys::*;
pub use signing::*;
