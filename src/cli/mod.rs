//! CLI argument definitions for the cluster agent.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigOverrides, Layout};

/// Version string with the build commit and timestamp.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("AGENT_GIT_COMMIT"),
    " ",
    env!("AGENT_BUILD_TIMESTAMP"),
    ")"
);

/// Cluster agent - admits joining nodes and applies pushed configuration.
///
/// Listens for join requests (token for credentials) and configuration
/// documents (argument edits, restarts, addon toggles) from the control plane.
#[derive(Parser, Debug)]
#[command(name = "cluster-agent")]
#[command(author, version, long_version = LONG_VERSION, about, long_about = None)]
pub struct Cli {
    /// Interface to listen on [default: 0.0.0.0]
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Port to listen on [default: 25000]
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Mutable node state directory (tokens, args, certs)
    #[arg(long, env = "SNAP_DATA")]
    pub snap_data: PathBuf,

    /// Install directory holding the addon wrapper scripts
    #[arg(long, env = "SNAP")]
    pub snap: PathBuf,

    /// Settings file [default: $SNAP_DATA/args/cluster-agent.kdl]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Upper bound in seconds on a restart or addon script [default: 300]
    #[arg(long)]
    pub command_timeout_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    pub fn layout(&self) -> Layout {
        Layout::new(&self.snap_data, &self.snap)
    }

    /// Settings file to read, and whether it was named explicitly.
    ///
    /// An explicit `--config` must exist; the default location is optional.
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (self.layout().config_file(), false),
        }
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen: self.listen.clone(),
            port: self.port,
            command_timeout_secs: self.command_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "cluster-agent",
            "-l",
            "127.0.0.1",
            "-p",
            "26000",
            "--snap-data",
            "/var/snap/data",
            "--snap",
            "/snap/current",
            "--command-timeout-secs",
            "30",
        ])
        .unwrap();

        assert_eq!(cli.listen.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(26000));
        assert_eq!(cli.overrides().command_timeout_secs, Some(30));
        assert_eq!(
            cli.layout().cluster_tokens_file(),
            PathBuf::from("/var/snap/data/credentials/cluster-tokens.txt")
        );
        assert!(!cli.log_json);
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from([
            "cluster-agent",
            "--snap-data",
            "/d",
            "--snap",
            "/s",
        ])
        .unwrap();

        assert_eq!(
            cli.config_path(),
            (PathBuf::from("/d/args/cluster-agent.kdl"), false)
        );
        assert_eq!(cli.overrides().port, None);
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::try_parse_from([
            "cluster-agent",
            "--snap-data",
            "/d",
            "--snap",
            "/s",
            "--config",
            "/etc/agent.kdl",
        ])
        .unwrap();

        assert_eq!(cli.config_path(), (PathBuf::from("/etc/agent.kdl"), true));
    }
}
