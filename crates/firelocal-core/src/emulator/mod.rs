//! Launching the local database emulator.
//!
//! Provides helpers for resolving the platform-specific emulator executable,
//! spawning it with the rules file, and waiting until its port accepts
//! connections.

pub mod error;
pub mod launcher;

pub use error::LaunchError;
pub use launcher::{
    emulator_addr, resolve_executable, wait_for_port, EmulatorLauncher, EmulatorProcess,
    EMULATOR_EXECUTABLE, EMULATOR_PORT,
};
