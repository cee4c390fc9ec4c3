#![cfg(feature = "cli")]

use std::io;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tabwire::endpoint::{create_client, Endpoint};
use tabwire::Table;

fn free_addr() -> String {
    let placeholder = std::net::TcpListener::bind("127.0.0.1:0").expect("placeholder should bind");
    placeholder
        .local_addr()
        .expect("placeholder listener should have address")
        .to_string()
}

fn wait_for_connect(addr: &str, timeout: Duration) -> io::Result<Endpoint> {
    let start = Instant::now();
    loop {
        match create_client(addr) {
            Ok(endpoint) => return Ok(endpoint),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn tabwire() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tabwire"));
    cmd.env_remove("TABWIRE_ADDR");
    cmd
}

#[test]
fn demo_exchange_passes() {
    let output = tabwire()
        .args(["--log-level", "error", "--format", "json", "demo"])
        .output()
        .expect("demo should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("demo should emit json");
    assert_eq!(report["passed"], true);
    assert_eq!(report["bytes_echoed"], "Hello");
    assert_eq!(report["matrix"], serde_json::json!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
}

#[test]
fn demo_runs_over_memory_pair() {
    let output = tabwire()
        .args(["--log-level", "error", "--format", "json", "demo", "--memory"])
        .output()
        .expect("demo should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("demo should emit json");
    assert_eq!(report["passed"], true);
    assert_eq!(report["server"], "memory");
}

#[test]
fn serve_echoes_bytes_and_matrix() {
    let addr = free_addr();
    let child = tabwire()
        .args(["--log-level", "error", "--format", "json", "serve", addr.as_str(), "--count", "2"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve should start");

    let mut client =
        wait_for_connect(&addr, Duration::from_secs(5)).expect("client should connect to serve");

    client.send_bytes(b"Hello").expect("bytes should send");
    assert_eq!(client.recv_bytes().expect("echo should arrive").as_ref(), b"Hello");

    let matrix = Table::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).expect("matrix");
    client.send_table(&matrix).expect("matrix should send");
    assert_eq!(client.recv_table().expect("matrix echo should arrive"), matrix);

    let output = child.wait_with_output().expect("serve should exit");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each frame line should be json"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["kind"], "raw");
    assert_eq!(lines[0]["payload"], "Hello");
    assert_eq!(lines[1]["kind"], "table");
    assert_eq!(lines[1]["rows"], 2);
    assert_eq!(lines[1]["cols"], 3);
}

#[test]
fn send_wait_prints_echo() {
    let addr = free_addr();
    let mut server = tabwire()
        .args(["--log-level", "error", "serve", addr.as_str(), "--count", "1"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve should start");

    // The server accepts a single client, so retry the send itself until it binds.
    let start = Instant::now();
    let output: Output = loop {
        let output = tabwire()
            .args(["--log-level", "error", "--format", "json", "send", addr.as_str()])
            .args(["--matrix", "[[1.5,-2],[0.25,8]]", "--wait"])
            .output()
            .expect("send should run");
        if output.status.success() || start.elapsed() >= Duration::from_secs(5) {
            break output;
        }
        thread::sleep(Duration::from_millis(25));
    };

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let frame: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("send should emit json");
    assert_eq!(frame["kind"], "table");
    assert_eq!(frame["values"], serde_json::json!([[1.5, -2.0], [0.25, 8.0]]));

    let status = server.wait().expect("serve should exit");
    assert!(status.success());
}

#[test]
fn send_rejects_ragged_matrix_before_connecting() {
    let output = tabwire()
        .args(["send", "127.0.0.1:1", "--matrix", "[[1,2],[3]]"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_to_closed_port_is_transport_error() {
    let addr = free_addr();

    let output = tabwire()
        .args(["send", addr.as_str(), "--data", "hi", "--connect-timeout", "1s"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"));
}

#[test]
fn version_reports_package_version() {
    let output = tabwire().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("tabwire {}", env!("CARGO_PKG_VERSION")));
}
