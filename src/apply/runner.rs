//! External process collaborators: service restarts and addon scripts.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{info, warn};
use wait_timeout::ChildExt;

use crate::config::{AddonAction, Layout};
use crate::{Error, Result};

/// Prefix of the init-system unit a service restarts through.
pub const UNIT_PREFIX: &str = "snap.microk8s.daemon-";

/// A command line to hand to a [`ProcessRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `systemctl restart snap.microk8s.daemon-<unit>.service`
    pub fn restart(unit: &str) -> Self {
        Self::new(
            "systemctl",
            ["restart".to_string(), format!("{}{}.service", UNIT_PREFIX, unit)],
        )
    }

    /// `$SNAP/microk8s-<action>.wrapper <addon>`
    pub fn addon(layout: &Layout, action: AddonAction, addon: &str) -> Self {
        Self::new(layout.addon_script(action), [addon])
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs external commands to completion.
///
/// Implementations must treat a non-zero exit as failure.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

/// Spawns real processes, killing any that outlive the timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        let command = invocation.to_string();
        let failed = |reason: String| Error::ExternalProcess {
            command: command.clone(),
            reason,
        };

        info!(command = %command, "running");
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| failed(format!("failed to start: {}", e)))?;

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) if status.success() => Ok(()),
            Ok(Some(status)) => {
                warn!(command = %command, %status, "command failed");
                Err(failed(format!("exited with {}", status)))
            }
            Ok(None) => {
                // Reap after kill so no zombie is left behind
                let _ = child.kill();
                let _ = child.wait();
                warn!(command = %command, timeout_secs = self.timeout.as_secs(), "command timed out");
                Err(failed(format!("timed out after {}s", self.timeout.as_secs())))
            }
            Err(e) => Err(failed(format!("failed to wait: {}", e))),
        }
    }
}
