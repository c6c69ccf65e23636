//! Configuration for the cluster agent.
//!
//! ## Layout
//!
//! Every file the agent reads or writes lives under two roots taken from the
//! snap environment:
//! - `$SNAP_DATA` - mutable node state (tokens, service arguments, certs)
//! - `$SNAP` - read-only install tree (addon wrapper scripts)
//!
//! See [`Layout`] for the individual paths.
//!
//! ## cluster-agent.kdl - optional settings file
//!
//! Located at `$SNAP_DATA/args/cluster-agent.kdl` unless `--config` points
//! elsewhere. See [`AgentConfig`] for the schema.
//!
//! ## Precedence
//!
//! CLI flag (or its environment variable) > cluster-agent.kdl > built-in defaults.
//! Use the [`resolver`] module for precedence resolution.

pub mod layout;
pub mod resolver;
pub mod schema;

pub use layout::{AddonAction, Layout};
pub use resolver::{ConfigOverrides, Resolved, ResolvedSettings, ValueSource, resolve_settings};
pub use schema::AgentConfig;

/// Default interface to listen on.
pub const DEFAULT_LISTEN: &str = "0.0.0.0";

/// Default port to listen on.
pub const DEFAULT_PORT: u16 = 25000;

/// Port the inter-node cluster datastore listens on, handed to joining nodes.
pub const DEFAULT_CLUSTER_PORT: &str = "19001";

/// Upper bound on a single restart or addon script invocation.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// File name of the optional settings file inside the args directory.
pub const CONFIG_FILE_NAME: &str = "cluster-agent.kdl";
