//! On-disk layout of the node state the agent works with.

use std::path::{Path, PathBuf};

/// Which addon wrapper script to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddonAction {
    Enable,
    Disable,
}

impl AddonAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

impl std::fmt::Display for AddonAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Paths derived from the snap data and install directories.
///
/// ```text
/// $SNAP_DATA/credentials/cluster-tokens.txt   join tokens, one per line
/// $SNAP_DATA/credentials/callback-token.txt   callback token
/// $SNAP_DATA/args/<service>                   service argument files
/// $SNAP_DATA/certs/                           CA, server, proxy, SA material
/// $SNAP_DATA/var/kubernetes/backend/          cluster.crt / cluster.key
/// $SNAP/microk8s-{enable,disable}.wrapper     addon scripts
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    snap_data: PathBuf,
    snap: PathBuf,
}

impl Layout {
    pub fn new(snap_data: impl Into<PathBuf>, snap: impl Into<PathBuf>) -> Self {
        Self {
            snap_data: snap_data.into(),
            snap: snap.into(),
        }
    }

    pub fn snap_data(&self) -> &Path {
        &self.snap_data
    }

    pub fn snap(&self) -> &Path {
        &self.snap
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.snap_data.join("credentials")
    }

    pub fn cluster_tokens_file(&self) -> PathBuf {
        self.credentials_dir().join("cluster-tokens.txt")
    }

    pub fn callback_token_file(&self) -> PathBuf {
        self.credentials_dir().join("callback-token.txt")
    }

    pub fn args_dir(&self) -> PathBuf {
        self.snap_data.join("args")
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.snap_data.join("certs")
    }

    pub fn cluster_backend_dir(&self) -> PathBuf {
        self.snap_data.join("var").join("kubernetes").join("backend")
    }

    /// Default location of the optional settings file.
    pub fn config_file(&self) -> PathBuf {
        self.args_dir().join(super::CONFIG_FILE_NAME)
    }

    /// Wrapper script that enables or disables an addon.
    pub fn addon_script(&self, action: AddonAction) -> PathBuf {
        self.snap.join(format!("microk8s-{}.wrapper", action))
    }
}
