//! Credentials for the local emulator.
//!
//! This module provides:
//! - `AccessToken`: an opaque bearer token with an expiry timestamp
//! - `Credentials`: the single token a database client presents
//!
//! The emulator performs no authentication, so the token is fabricated
//! once at startup and never refreshed.

pub mod credentials;
pub mod token;

pub use credentials::Credentials;
pub use token::{AccessToken, EMULATOR_TOKEN};
