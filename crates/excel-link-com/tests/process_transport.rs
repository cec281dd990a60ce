//! The process transport driven by small shell scripts standing in for the
//! bridge executable (`wine_path` is pointed at `sh`).
#![cfg(unix)]

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use excel_link_com::{BridgeError, ExcelBridge, ExcelBridgeConfig};

const ECHO_BRIDGE: &str = r#"
while read -r line; do
  id=$(printf '%s' "$line" | sed 's/^{"id":\([0-9]*\).*/\1/')
  printf '{"id":%s,"status":"ok"}\n' "$id"
  case "$line" in
    *'"Shutdown"'*) exit 0 ;;
  esac
done
"#;

fn script(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn config(script: &tempfile::NamedTempFile, timeout: Duration) -> ExcelBridgeConfig {
    ExcelBridgeConfig {
        bridge_exe_path: Some(script.path().to_path_buf()),
        wine_path: PathBuf::from("sh"),
        wine_prefix: None,
        timeout,
    }
}

#[test]
fn test_session_over_a_child_process() {
    let bridge_script = script(ECHO_BRIDGE);
    let bridge = ExcelBridge::start(config(&bridge_script, Duration::from_secs(10))).unwrap();
    bridge.set_visible(false).unwrap();
    bridge.shutdown().unwrap();
}

#[test]
fn test_silent_bridge_times_out() {
    let bridge_script = script("sleep 30\n");
    let started = Instant::now();
    let result = ExcelBridge::start(config(&bridge_script, Duration::from_millis(200)));
    assert!(matches!(result, Err(BridgeError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_exited_bridge_is_not_running() {
    let bridge_script = script("exit 0\n");
    let result = ExcelBridge::start(config(&bridge_script, Duration::from_secs(10)));
    assert!(matches!(
        result,
        Err(BridgeError::NotRunning) | Err(BridgeError::SendFailed(_))
    ));
}
