use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while starting or stopping the emulator.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Rules file not found: {}", .0.display())]
    RulesFileMissing(PathBuf),

    #[error("Failed to launch emulator executable {}: {source}", .executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Emulator exited before {addr} accepted connections (exit code {code:?})")]
    Exited { addr: SocketAddr, code: Option<i32> },

    #[error("Emulator did not accept connections on {addr} within {timeout_ms} ms")]
    Timeout { addr: SocketAddr, timeout_ms: u64 },

    #[error("Failed to monitor emulator process: {source}")]
    Monitor {
        #[source]
        source: io::Error,
    },

    #[error("Failed to stop emulator process: {source}")]
    Stop {
        #[source]
        source: io::Error,
    },
}
