//! Core library for firelocal.
//!
//! Provides the pieces needed to develop against a local Realtime Database
//! emulator:
//!
//! - `emulator`: launches the `firebase-server` emulator and waits for its port
//! - `factory`: builds one database client bound to the emulator URL
//! - `api`: REST client for reading and writing database nodes
//! - `auth`: the fabricated access token the emulator accepts
//! - `backoff`: exponential back-off used when requests fail with I/O errors
//! - `config`: user configuration loaded from disk and the environment

pub mod api;
pub mod auth;
pub mod backoff;
pub mod config;
pub mod emulator;
pub mod factory;

pub use api::{ApiError, DatabaseClient, NodePath};
pub use auth::{AccessToken, Credentials};
pub use backoff::{ExponentialBackOff, RetryPolicy};
pub use config::{Config, ConfigError};
pub use emulator::{EmulatorLauncher, EmulatorProcess, LaunchError};
pub use factory::{ClientFactory, EMULATOR_URL};
