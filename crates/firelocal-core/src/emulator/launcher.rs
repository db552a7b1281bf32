//! Emulator process spawning and readiness checks.

use std::ffi::OsString;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use super::LaunchError;
use crate::config::Config;

/// Name of the emulator executable installed by npm.
pub const EMULATOR_EXECUTABLE: &str = "firebase-server";

/// Port the emulator binds.
pub const EMULATOR_PORT: u16 = 5000;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Upper bound for a single connection attempt while polling the port.
const CONNECT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Loopback address the emulator listens on.
pub fn emulator_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, EMULATOR_PORT))
}

/// Path of `name` inside `bin_dir`, with the suffix the platform's npm shims use.
pub fn resolve_executable(bin_dir: &Path, name: &str) -> PathBuf {
    bin_dir.join(executable_file_name(name))
}

fn executable_file_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.cmd")
    } else {
        name.to_string()
    }
}

/// Starts the emulator and blocks until it is reachable.
#[derive(Debug, Clone)]
pub struct EmulatorLauncher {
    executable: PathBuf,
    working_dir: PathBuf,
    rules_file: PathBuf,
    startup_timeout: Duration,
    addr: SocketAddr,
}

impl EmulatorLauncher {
    pub fn new(
        executable: PathBuf,
        working_dir: PathBuf,
        rules_file: PathBuf,
        startup_timeout: Duration,
    ) -> Self {
        Self {
            executable,
            working_dir,
            rules_file,
            startup_timeout,
            addr: emulator_addr(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            resolve_executable(&config.bin_dir(), EMULATOR_EXECUTABLE),
            config.working_dir(),
            config.rules_file(),
            config.startup_timeout(),
        )
    }

    #[cfg(test)]
    fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Arguments passed to the emulator: serve mode plus the rules file.
    pub fn arguments(&self) -> Vec<OsString> {
        vec![
            OsString::from("-e"),
            OsString::from("-r"),
            self.rules_file.clone().into_os_string(),
        ]
    }

    /// Start the emulator and wait until its port accepts connections.
    ///
    /// Nothing is retried. If the emulator exits or the port stays closed
    /// past the startup timeout, the error is returned and the caller
    /// decides what to do.
    pub async fn launch(&self) -> Result<EmulatorProcess, LaunchError> {
        if !self.rules_file.is_file() {
            return Err(LaunchError::RulesFileMissing(self.rules_file.clone()));
        }

        info!(
            executable = %self.executable.display(),
            rules_file = %self.rules_file.display(),
            addr = %self.addr,
            "Starting database emulator"
        );
        let mut child = self.spawn()?;

        if let Err(error) =
            wait_for_port(self.addr, &mut child, self.startup_timeout, POLL_INTERVAL).await
        {
            discard(&mut child).await;
            return Err(error);
        }

        info!(addr = %self.addr, pid = ?child.id(), "Database emulator is listening");
        Ok(EmulatorProcess {
            child,
            addr: self.addr,
        })
    }

    fn spawn(&self) -> Result<Child, LaunchError> {
        let mut command = Command::new(&self.executable);
        command
            .args(self.arguments())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command.spawn().map_err(|source| LaunchError::Spawn {
            executable: self.executable.clone(),
            source,
        })
    }
}

/// Poll `addr` until it accepts a TCP connection.
///
/// Fails early if `child` exits, and with `LaunchError::Timeout` once
/// `timeout` has passed.
pub async fn wait_for_port(
    addr: SocketAddr,
    child: &mut Child,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), LaunchError> {
    let deadline = Instant::now() + timeout;
    loop {
        if port_accepts_connections(addr).await {
            return Ok(());
        }
        if let Some(status) = child
            .try_wait()
            .map_err(|source| LaunchError::Monitor { source })?
        {
            return Err(LaunchError::Exited {
                addr,
                code: status.code(),
            });
        }
        if Instant::now() >= deadline {
            return Err(LaunchError::Timeout {
                addr,
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        debug!(addr = %addr, "Emulator port not open yet");
        time::sleep(poll_interval).await;
    }
}

/// Kill a child that never came up and reap it.
async fn discard(child: &mut Child) {
    if let Err(error) = child.kill().await {
        debug!(error = %error, "Emulator already gone");
    }
}

async fn port_accepts_connections(addr: SocketAddr) -> bool {
    matches!(
        time::timeout(CONNECT_ATTEMPT_TIMEOUT, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// A running emulator.
///
/// Dropping this leaves the emulator running; call `stop` to shut it down.
#[derive(Debug)]
pub struct EmulatorProcess {
    child: Child,
    addr: SocketAddr,
}

impl EmulatorProcess {
    /// Take over an emulator child started elsewhere and listening on `addr`.
    pub fn adopt(child: Child, addr: SocketAddr) -> Self {
        Self { child, addr }
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the emulator to exit on its own.
    pub async fn wait(&mut self) -> Result<ExitStatus, LaunchError> {
        self.child
            .wait()
            .await
            .map_err(|source| LaunchError::Monitor { source })
    }

    /// Kill the emulator and reap it.
    pub async fn stop(mut self) -> Result<(), LaunchError> {
        if let Some(status) = self
            .child
            .try_wait()
            .map_err(|source| LaunchError::Stop { source })?
        {
            warn!(%status, "Emulator had already exited");
            return Ok(());
        }
        self.child
            .kill()
            .await
            .map_err(|source| LaunchError::Stop { source })?;
        info!(addr = %self.addr, "Database emulator stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn rules_file(dir: &Path) -> PathBuf {
        let path = dir.join("database.rules.json");
        std::fs::write(&path, r#"{"rules": {".read": true, ".write": true}}"#)
            .expect("write rules");
        path
    }

    async fn closed_port() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        addr
    }

    #[test]
    fn test_emulator_addr() {
        assert_eq!(emulator_addr().to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn test_resolve_executable_suffix() {
        let path = resolve_executable(Path::new("node_modules/.bin"), EMULATOR_EXECUTABLE);
        if cfg!(windows) {
            assert!(path.ends_with("firebase-server.cmd"));
        } else {
            assert!(path.ends_with("firebase-server"));
        }
        assert!(path.starts_with("node_modules/.bin"));
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            working_dir: Some(PathBuf::from("/srv/app")),
            startup_timeout_secs: 7,
            ..Config::default()
        };
        let launcher = EmulatorLauncher::from_config(&config);

        assert_eq!(
            launcher.executable(),
            resolve_executable(Path::new("/srv/app/node_modules/.bin"), EMULATOR_EXECUTABLE)
        );
        assert_eq!(launcher.addr(), emulator_addr());
        assert_eq!(launcher.startup_timeout, Duration::from_secs(7));
        assert_eq!(
            launcher.arguments(),
            vec![
                OsString::from("-e"),
                OsString::from("-r"),
                OsString::from("/srv/app/database.rules.json"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_rules_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = EmulatorLauncher::new(
            PathBuf::from(EMULATOR_EXECUTABLE),
            dir.path().to_path_buf(),
            dir.path().join("absent.json"),
            Duration::from_secs(1),
        );

        match launcher.launch().await {
            Err(LaunchError::RulesFileMissing(path)) => assert!(path.ends_with("absent.json")),
            other => panic!("expected RulesFileMissing, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let executable = dir.path().join("no-such-emulator");
        let launcher = EmulatorLauncher::new(
            executable.clone(),
            dir.path().to_path_buf(),
            rules_file(dir.path()),
            Duration::from_secs(1),
        );

        match launcher.launch().await {
            Err(LaunchError::Spawn { executable: reported, .. }) => {
                assert_eq!(reported, executable)
            }
            other => panic!("expected Spawn, got: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_emulator_exiting_early() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = EmulatorLauncher::new(
            PathBuf::from("false"),
            dir.path().to_path_buf(),
            rules_file(dir.path()),
            Duration::from_secs(10),
        )
        .with_addr(closed_port().await);

        match launcher.launch().await {
            Err(LaunchError::Exited { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("expected Exited, got: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_succeeds_once_port_accepts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let launcher = EmulatorLauncher::new(
            PathBuf::from("true"),
            dir.path().to_path_buf(),
            rules_file(dir.path()),
            Duration::from_secs(5),
        )
        .with_addr(listener.local_addr().expect("local addr"));

        let process = launcher.launch().await.expect("launch");
        assert_eq!(process.addr(), launcher.addr());
        process.stop().await.expect("stop");
    }

    #[test]
    fn test_relative_working_dir_gives_absolute_paths() {
        let config = Config {
            working_dir: Some(PathBuf::from("web")),
            ..Config::default()
        };
        let launcher = EmulatorLauncher::from_config(&config);

        assert!(launcher.executable().is_absolute());
        let rules_arg = launcher.arguments().pop().expect("rules argument");
        assert!(Path::new(&rules_arg).is_absolute());
        assert!(launcher.working_dir.is_absolute());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_discard_reaps_child() {
        let mut child = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        assert!(child.id().is_some());

        discard(&mut child).await;
        assert!(child.id().is_none());
        // A second discard of an already reaped child is harmless.
        discard(&mut child).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wait_for_port_times_out() {
        let addr = closed_port().await;
        let mut child = Command::new("sleep").arg("5").spawn().expect("spawn sleep");

        let result = wait_for_port(
            addr,
            &mut child,
            Duration::from_millis(300),
            Duration::from_millis(50),
        )
        .await;
        match result {
            Err(LaunchError::Timeout { addr: reported, timeout_ms }) => {
                assert_eq!(reported, addr);
                assert_eq!(timeout_ms, 300);
            }
            other => panic!("expected Timeout, got: {other:?}"),
        }
        child.kill().await.expect("kill sleep");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_running_emulator() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let mut child = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        wait_for_port(addr, &mut child, Duration::from_secs(1), POLL_INTERVAL)
            .await
            .expect("port is open");

        let mut process = EmulatorProcess::adopt(child, addr);
        assert!(process.id().is_some());
        let status = process.child.try_wait().expect("try_wait");
        assert!(status.is_none());

        process.stop().await.expect("stop");
    }
}
