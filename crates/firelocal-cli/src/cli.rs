//! Command-line definition.

use clap::{Parser, Subcommand};

/// Run a local Realtime Database emulator and talk to it.
#[derive(Parser, Debug)]
#[command(name = "firelocal", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Starts the emulator, waits for its port, and keeps it running until Ctrl-C.
    StartEmulator,
    /// Starts the emulator, then the given server command once the emulator is listening.
    Run {
        /// Server command and its arguments.
        #[arg(
            value_name = "SERVER",
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        server: Vec<String>,
    },
    /// Prints the value stored at a node.
    Get { path: String },
    /// Overwrites a node with a JSON value.
    Set { path: String, value: String },
    /// Merges a JSON object into a node.
    Update { path: String, value: String },
    /// Appends a JSON value under a node and prints the generated key.
    Push { path: String, value: String },
    /// Removes a node.
    Delete { path: String },
}
