//! Configuration failures of the copy-timelines binary
//!
//! Every case fails before a store connection is attempted. The store
//! ports point at a local listener that must never see a connection.

use std::io::ErrorKind;
use std::net::TcpListener;
use std::process::{Command, Output};

/// A local port that records whether anything connected to it
struct Listener(TcpListener);

impl Listener {
  fn bind() -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    Self(listener)
  }

  fn port(&self) -> String {
    self.0.local_addr().unwrap().port().to_string()
  }

  fn assert_untouched(&self) {
    match self.0.accept() {
      Err(e) => assert_eq!(e.kind(), ErrorKind::WouldBlock),
      Ok((_, peer)) => panic!("unexpected connection from {}", peer),
    }
  }
}

fn command(dir: &std::path::Path) -> Command {
  let mut command = Command::new(env!("CARGO_BIN_EXE_copy-timelines"));
  command.current_dir(dir).env_clear();
  command
}

fn run(env: &[(&str, &str)], args: &[&str]) -> Output {
  let dir = tempfile::tempdir().unwrap();
  command(dir.path())
    .envs(env.iter().copied())
    .args(args)
    .output()
    .unwrap()
}

fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_not_connected(output: &Output) {
  assert!(!stderr(output).contains("connecting to"));
}

#[test]
fn test_missing_source_exits_1() {
  let output = run(&[("SOURCE_HOST", "127.0.0.1"), ("KEY_PREFIX", "misskey:")], &[]);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Please set SOURCE_HOST, SOURCE_PORT"));
  assert_not_connected(&output);
}

#[test]
fn test_missing_key_prefix_exits_1() {
  let source = Listener::bind();
  let port = source.port();
  let output = run(&[("SOURCE_HOST", "127.0.0.1"), ("SOURCE_PORT", port.as_str())], &[]);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Please set KEY_PREFIX"));
  assert_not_connected(&output);
  source.assert_untouched();
}

#[test]
fn test_missing_destination_exits_1_when_writing() {
  let source = Listener::bind();
  let port = source.port();
  let output = run(
    &[
      ("SOURCE_HOST", "127.0.0.1"),
      ("SOURCE_PORT", port.as_str()),
      ("KEY_PREFIX", "misskey:"),
      ("DEST_HOST", "127.0.0.1"),
    ],
    &["--dry-run", "false"],
  );
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Please set DEST_HOST, DEST_PORT"));
  assert_not_connected(&output);
  source.assert_untouched();
}

#[test]
fn test_source_checked_before_key_prefix() {
  let output = run(&[], &[]);
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("Please set SOURCE_HOST, SOURCE_PORT"));
  assert!(!err.contains("KEY_PREFIX"));
}

#[test]
fn test_config_file_disables_dry_run() {
  let source = Listener::bind();
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("timelines.yaml"), "dry_run: false\n").unwrap();

  let output = command(dir.path())
    .env("SOURCE_HOST", "127.0.0.1")
    .env("SOURCE_PORT", source.port())
    .env("KEY_PREFIX", "misskey:")
    .output()
    .unwrap();

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Please set DEST_HOST, DEST_PORT"));
  assert_not_connected(&output);
  source.assert_untouched();
}
