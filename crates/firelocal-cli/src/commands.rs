//! Subcommand implementations.

use anyhow::{anyhow, bail, Context, Result};
use firelocal_core::{ClientFactory, EmulatorLauncher, EmulatorProcess, NodePath};
use serde_json::Value;
use tokio::process::{Child, Command as ProcessCommand};
use tokio::signal;
use tracing::{info, warn};

use crate::cli::Command;

pub(crate) async fn dispatch(
    command: Command,
    launcher: &EmulatorLauncher,
    factory: &ClientFactory,
) -> Result<()> {
    match command {
        Command::StartEmulator => start_emulator(launcher).await,
        Command::Run { server } => run_with_emulator(launcher, &server).await,
        Command::Get { path } => get(factory, &path).await,
        Command::Set { path, value } => {
            let client = factory.client()?;
            client.set(&parse_path(&path)?, &parse_value(&value)?).await?;
            Ok(())
        }
        Command::Update { path, value } => {
            let client = factory.client()?;
            client.update(&parse_path(&path)?, &parse_value(&value)?).await?;
            Ok(())
        }
        Command::Push { path, value } => {
            let client = factory.client()?;
            let key = client.push(&parse_path(&path)?, &parse_value(&value)?).await?;
            println!("{key}");
            Ok(())
        }
        Command::Delete { path } => {
            let client = factory.client()?;
            client.delete(&parse_path(&path)?).await?;
            Ok(())
        }
    }
}

async fn launch(launcher: &EmulatorLauncher) -> Result<EmulatorProcess> {
    launcher
        .launch()
        .await
        .with_context(|| format!("Failed to start emulator {}", launcher.executable().display()))
}

async fn start_emulator(launcher: &EmulatorLauncher) -> Result<()> {
    let mut emulator = launch(launcher).await?;
    eprintln!("Emulator listening on {} (Ctrl-C to stop)", emulator.addr());

    let outcome = tokio::select! {
        result = signal::ctrl_c() => {
            info!("Interrupted, stopping emulator");
            result.context("Failed to listen for Ctrl-C")
        }
        status = emulator.wait() => match status {
            Ok(status) => Err(anyhow!("Emulator exited unexpectedly ({status})")),
            Err(e) => Err(e.into()),
        },
    };
    stop_then(emulator, outcome).await
}

/// Start the emulator, then the server. The server is never started unless
/// the emulator is listening.
async fn run_with_emulator(launcher: &EmulatorLauncher, server: &[String]) -> Result<()> {
    let Some((program, args)) = server.split_first() else {
        bail!("No server command given");
    };

    let emulator = launch(launcher).await?;

    info!(program = %program, "Starting server");
    let outcome = match ProcessCommand::new(program).args(args).spawn() {
        Ok(mut child) => supervise_server(&mut child).await,
        Err(e) => Err(e).with_context(|| format!("Failed to start server {program}")),
    };
    stop_then(emulator, outcome).await
}

/// Wait for the server to exit, killing it on Ctrl-C.
async fn supervise_server(child: &mut Child) -> Result<()> {
    tokio::select! {
        status = child.wait() => {
            let status = status.context("Failed to wait for server")?;
            if !status.success() {
                bail!("Server exited with {status}");
            }
            Ok(())
        }
        result = signal::ctrl_c() => {
            info!("Interrupted, stopping server");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to stop server");
            }
            result.context("Failed to listen for Ctrl-C")
        }
    }
}

/// Stop the emulator, then hand back `outcome`. An error in `outcome` takes
/// precedence over a failure to stop.
async fn stop_then<T>(emulator: EmulatorProcess, outcome: Result<T>) -> Result<T> {
    let stopped = emulator.stop().await;
    match (outcome, stopped) {
        (Ok(value), stopped) => {
            stopped.context("Failed to stop emulator")?;
            Ok(value)
        }
        (Err(e), Err(stop_error)) => {
            warn!(error = %stop_error, "Failed to stop emulator");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

async fn get(factory: &ClientFactory, path: &str) -> Result<()> {
    let client = factory.client()?;
    let value = client.fetch(&parse_path(path)?).await?;
    let rendered = serde_json::to_string_pretty(&value.unwrap_or(Value::Null))?;
    println!("{rendered}");
    Ok(())
}

fn parse_path(raw: &str) -> Result<NodePath> {
    NodePath::parse(raw).with_context(|| format!("Invalid node path: {raw}"))
}

fn parse_value(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("Value is not valid JSON: {raw}"))
}
