//! Line transports carrying protocol messages to and from a bridge.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::bridge::{find_bridge_exe, BridgeError, ExcelBridgeConfig};

/// A duplex channel of newline-free JSON messages.
///
/// [`ExcelBridge`](crate::ExcelBridge) sends exactly one line and then
/// receives exactly one line per request.
pub trait Transport: Send {
    fn send_line(&mut self, line: &str) -> Result<(), BridgeError>;

    fn recv_line(&mut self) -> Result<String, BridgeError>;

    /// Release the peer after `Shutdown` was sent.
    fn close(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// The bridge executable running under WINE, spoken to over its stdio.
///
/// Stdout is drained by a reader thread so that a silent bridge turns into
/// [`BridgeError::Timeout`] instead of blocking forever.
pub struct ProcessTransport {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<io::Result<String>>,
    timeout: Duration,
}

impl ProcessTransport {
    pub fn spawn(config: &ExcelBridgeConfig) -> Result<Self, BridgeError> {
        let exe_path = config
            .bridge_exe_path
            .clone()
            .unwrap_or_else(find_bridge_exe);

        if !exe_path.exists() {
            return Err(BridgeError::BridgeExeNotFound(
                exe_path.display().to_string(),
            ));
        }

        let mut cmd = std::process::Command::new(&config.wine_path);
        if let Some(prefix) = &config.wine_prefix {
            cmd.env("WINEPREFIX", prefix);
        }
        cmd.arg(&exe_path);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit()); // Bridge diagnostics go to our stderr

        debug!(wine = %config.wine_path.display(), exe = %exe_path.display(), "spawning bridge");
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                BridgeError::WineNotFound
            } else {
                BridgeError::SpawnFailed(e)
            }
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(BridgeError::NotRunning);
        };

        let (tx, lines) = mpsc::channel();
        thread::Builder::new()
            .name("excel-link-reader".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(BridgeError::SpawnFailed)?;

        Ok(Self {
            child,
            stdin,
            lines,
            timeout: config.timeout,
        })
    }
}

impl Transport for ProcessTransport {
    fn send_line(&mut self, line: &str) -> Result<(), BridgeError> {
        writeln!(self.stdin, "{line}").map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        self.stdin
            .flush()
            .map_err(|e| BridgeError::SendFailed(e.to_string()))
    }

    fn recv_line(&mut self) -> Result<String, BridgeError> {
        match self.lines.recv_timeout(self.timeout) {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(e)) => Err(BridgeError::ReadFailed(e.to_string())),
            Err(RecvTimeoutError::Timeout) => Err(BridgeError::Timeout(self.timeout)),
            // Reader thread hit EOF: the process is gone
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::NotRunning),
        }
    }

    fn close(&mut self) -> Result<(), BridgeError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.child.try_wait().map_err(BridgeError::Io)?.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("bridge did not exit after shutdown, killing it");
                self.child.kill().map_err(BridgeError::Io)?;
                self.child.wait().map_err(BridgeError::Io)?;
                return Ok(());
            }
            thread::sleep(Duration::from_millis(50));
        }
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_bridge_exe() {
        let config = ExcelBridgeConfig {
            bridge_exe_path: Some(PathBuf::from("/nonexistent/excel-link-bridge.exe")),
            ..Default::default()
        };
        assert!(matches!(
            ProcessTransport::spawn(&config),
            Err(BridgeError::BridgeExeNotFound(_))
        ));
    }

    #[test]
    fn test_missing_wine() {
        let exe = tempfile::NamedTempFile::new().unwrap();
        let config = ExcelBridgeConfig {
            bridge_exe_path: Some(exe.path().to_path_buf()),
            wine_path: PathBuf::from("/nonexistent/wine"),
            ..Default::default()
        };
        assert!(matches!(
            ProcessTransport::spawn(&config),
            Err(BridgeError::WineNotFound)
        ));
    }
}
