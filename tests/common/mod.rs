//! Common test utilities for cluster-agent integration tests.
//!
//! Provides `TestEnv`, a throwaway snap layout so tests never touch a real
//! node's state.

#![allow(dead_code)]

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
pub use tempfile::TempDir;

const CERT_FILES: [&str; 7] = [
    "ca.crt",
    "ca.key",
    "server.crt",
    "server.key",
    "serviceaccount.key",
    "front-proxy-client.crt",
    "front-proxy-client.key",
];

/// A test environment with isolated snap directories.
///
/// - `data_dir`: stands in for `$SNAP_DATA`
/// - `snap_dir`: stands in for `$SNAP`
///
/// `agent()` passes both per-command, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub snap_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with empty directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            snap_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment holding every file a join needs.
    pub fn populated() -> Self {
        let env = Self::new();
        for name in CERT_FILES {
            env.write(&format!("certs/{}", name), &format!("{} data\n", name));
        }
        env.write("var/kubernetes/backend/cluster.crt", "cluster cert\n");
        env.write("var/kubernetes/backend/cluster.key", "cluster key\n");
        env.write("credentials/cluster-tokens.txt", "abc123\nother\n");
        env.write("credentials/callback-token.txt", "tok1\n");
        env.write("args/kube-apiserver", "--secure-port=16443\n");
        env.write("args/kubelet", "--v=2\n");
        env
    }

    /// Get a Command for the agent binary pointed at this environment.
    pub fn agent(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cluster-agent"));
        cmd.env_remove("RUST_LOG");
        cmd.env("SNAP_DATA", self.data_dir.path());
        cmd.env("SNAP", self.snap_dir.path());
        cmd
    }

    /// Same as `agent()`, as a plain std command for long-running processes.
    pub fn agent_process(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_cluster-agent"));
        cmd.env_remove("RUST_LOG");
        cmd.env("SNAP_DATA", self.data_dir.path());
        cmd.env("SNAP", self.snap_dir.path());
        cmd
    }

    /// Path relative to the data directory.
    pub fn data_path(&self, relative: &str) -> PathBuf {
        self.data_dir.path().join(relative)
    }

    /// Write a file relative to the data directory, creating parents.
    pub fn write(&self, relative: &str, contents: &str) {
        write_file(&self.data_path(relative), contents);
    }

    /// Read a file relative to the data directory.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.data_path(relative)).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Ask the OS for a port that is free right now.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
