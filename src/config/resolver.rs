//! Precedence resolution for agent settings.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (clap folds the matching environment variables in here)
//! 2. `cluster-agent.kdl`
//! 3. Built-in defaults

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    AgentConfig, DEFAULT_CLUSTER_PORT, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_LISTEN, DEFAULT_PORT,
};
use crate::{Error, Result};

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from a CLI flag or its environment variable
    CliFlag,
    /// Value from the settings file at the given path
    ConfigFile(PathBuf),
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::ConfigFile(path) => write!(f, "file:{}", path.display()),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }

    fn pick(cli: Option<T>, file: Option<T>, file_path: Option<&PathBuf>, default: T) -> Self {
        match (cli, file, file_path) {
            (Some(value), _, _) => Self::new(value, ValueSource::CliFlag),
            (None, Some(value), Some(path)) => {
                Self::new(value, ValueSource::ConfigFile(path.clone()))
            }
            _ => Self::new(default, ValueSource::Default),
        }
    }
}

/// CLI overrides for settings resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub command_timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = Some(listen.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_command_timeout_secs(mut self, secs: u64) -> Self {
        self.command_timeout_secs = Some(secs);
        self
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub listen: Resolved<String>,
    pub port: Resolved<u16>,
    pub command_timeout_secs: Resolved<u64>,
    pub cluster_port: Resolved<String>,
    pub restart_apiserver_on_join: Resolved<bool>,
    pub annotate_kubelet_hostname: Resolved<bool>,
}

impl ResolvedSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.value)
    }

    /// Socket address for the listener.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen.value.parse().map_err(|e| {
            Error::Config(format!(
                "Invalid listen address '{}' ({}): {}",
                self.listen.value, self.listen.source, e
            ))
        })?;
        Ok(SocketAddr::from((ip, self.port.value)))
    }
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        resolve_settings(&ConfigOverrides::default(), None, None)
    }
}

/// Resolve settings with the full precedence chain.
///
/// `file` is the parsed settings file, if one was found at `file_path`.
pub fn resolve_settings(
    overrides: &ConfigOverrides,
    file: Option<&AgentConfig>,
    file_path: Option<&PathBuf>,
) -> ResolvedSettings {
    let empty = AgentConfig::default();
    let file = file.unwrap_or(&empty);

    ResolvedSettings {
        listen: Resolved::pick(
            overrides.listen.clone(),
            file.listen.clone(),
            file_path,
            DEFAULT_LISTEN.to_string(),
        ),
        port: Resolved::pick(overrides.port, file.port, file_path, DEFAULT_PORT),
        command_timeout_secs: Resolved::pick(
            overrides.command_timeout_secs,
            file.command_timeout_secs,
            file_path,
            DEFAULT_COMMAND_TIMEOUT_SECS,
        ),
        cluster_port: Resolved::pick(
            None,
            file.cluster_port.clone(),
            file_path,
            DEFAULT_CLUSTER_PORT.to_string(),
        ),
        restart_apiserver_on_join: Resolved::pick(
            None,
            file.restart_apiserver_on_join,
            file_path,
            true,
        ),
        annotate_kubelet_hostname: Resolved::pick(
            None,
            file.annotate_kubelet_hostname,
            file_path,
            false,
        ),
    }
}
