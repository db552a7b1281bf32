//! REST client for the Realtime Database.
//!
//! This module provides the `DatabaseClient` for reading and writing
//! database nodes through the REST API the emulator exposes.
//!
//! Requests carry a bearer token; transport failures are retried with
//! exponential back-off.

pub mod client;
pub mod error;
pub mod path;

pub use client::DatabaseClient;
pub use error::ApiError;
pub use path::NodePath;
