//! Capture shutdown tests
//!
//! Runs the `airsense` binary against a FIFO whose writer stays silent and
//! checks that Ctrl+C still ends the process promptly.

#![cfg(unix)]

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

const EXIT_BOUND: Duration = Duration::from_secs(5);

#[test]
fn test_ctrl_c_exits_while_device_is_silent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fifo = dir.path().join("tty");
    let made = Command::new("mkfifo").arg(&fifo).status().expect("mkfifo");
    assert!(made.success());

    // Read-write open does not block and keeps a writer attached
    let _writer = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&fifo)
        .expect("open fifo");

    let mut child = Command::new(env!("CARGO_BIN_EXE_airsense"))
        .current_dir(dir.path())
        .env_remove("AIRSENSE_CONFIG")
        .env("RUST_LOG", "info")
        .arg("capture")
        .arg("--device")
        .arg(&fifo)
        .arg("--data-dir")
        .arg(dir.path().join("sensor_data"))
        .arg("--listen")
        .arg("127.0.0.1:0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn airsense");

    let stdout = child.stdout.take().expect("piped stdout");
    let (ready_tx, ready_rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if line.contains("All tasks spawned") {
                let _ = ready_tx.send(());
            }
        }
    });

    if ready_rx.recv_timeout(Duration::from_secs(10)).is_err() {
        let _ = child.kill();
        panic!("capture agent did not start");
    }
    std::thread::sleep(Duration::from_millis(200));

    let sent = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()
        .expect("kill -INT");
    assert!(sent.success());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            break status;
        }
        if started.elapsed() > EXIT_BOUND {
            let _ = child.kill();
            let _ = child.wait();
            panic!("airsense still running {EXIT_BOUND:?} after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    assert!(status.success(), "unexpected exit status: {status}");
}
