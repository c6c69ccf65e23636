//! Cluster agent - admits new nodes and applies pushed runtime configuration.
//!
//! This library provides the core of the `cluster-agent` binary: join-token
//! bookkeeping, per-service argument files, credential bundle assembly and the
//! batch configuration applier, plus the HTTP surface that exposes them.

pub mod agent;
pub mod apply;
pub mod args;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod files;
pub mod server;
pub mod tokens;

use std::path::PathBuf;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    use crate::config::Layout;

    /// Test environment with an isolated snap data directory.
    ///
    /// The directory skeleton (`args/`, `certs/`, `credentials/`,
    /// `var/kubernetes/backend/`) is created up front; files are written by
    /// the individual tests.
    pub struct TestEnv {
        /// Simulated `$SNAP_DATA`
        pub data_dir: TempDir,
        /// Simulated `$SNAP`
        pub snap_dir: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with an empty layout.
        pub fn new() -> Self {
            let env = Self {
                data_dir: TempDir::new().unwrap(),
                snap_dir: TempDir::new().unwrap(),
            };
            let layout = env.layout();
            fs::create_dir_all(layout.args_dir()).unwrap();
            fs::create_dir_all(layout.certs_dir()).unwrap();
            fs::create_dir_all(layout.credentials_dir()).unwrap();
            fs::create_dir_all(layout.cluster_backend_dir()).unwrap();
            env
        }

        /// Create a test environment populated with every file a join needs.
        pub fn populated() -> Self {
            let env = Self::new();
            let layout = env.layout();
            for name in crate::credentials::CERT_FILES {
                env.write(&layout.certs_dir().join(name), &format!("{name} data\n"));
            }
            env.write(&layout.cluster_backend_dir().join("cluster.crt"), "cluster cert\n");
            env.write(&layout.cluster_backend_dir().join("cluster.key"), "cluster key\n");
            env.write(&layout.cluster_tokens_file(), "abc123\nother\n");
            env.write(&layout.callback_token_file(), "tok1\n");
            env.write(
                &layout.args_dir().join("kube-apiserver"),
                "--secure-port=16443\n--insecure-port=0\n",
            );
            env.write(
                &layout.args_dir().join("kubelet"),
                "--kubeconfig=${SNAP_DATA}/credentials/kubelet.config\n",
            );
            env
        }

        /// Layout rooted at this environment's directories.
        pub fn layout(&self) -> Layout {
            Layout::new(self.data_dir.path(), self.snap_dir.path())
        }

        /// Write a file, creating parents as needed.
        pub fn write(&self, path: &Path, contents: &str) {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }

        /// Read a file to a string.
        pub fn read(&self, path: &Path) -> String {
            fs::read_to_string(path).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for agent operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A join or callback token did not match the store.
    #[error("Invalid token")]
    InvalidCredential,

    /// A file the agent cannot operate without is absent.
    #[error("Required file missing: {}", path.display())]
    MissingFile { path: PathBuf },

    /// A restart or addon script exited non-zero or timed out.
    #[error("External process failed: `{command}`: {reason}")]
    ExternalProcess { command: String, reason: String },

    /// A configuration document failed schema validation.
    #[error("Invalid configuration document: {0}")]
    InvalidDocument(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, Error>;
