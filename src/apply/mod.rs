//! Applying configuration documents.
//!
//! A document is applied service by service, then addon by addon, in the order
//! it lists them. Within a service all updates run before all removals, and
//! the restart (if requested) comes last. For an addon with both flags set the
//! enable script runs before the disable script.
//!
//! The batch is fail-fast: the first failing step (argument write, restart or
//! addon script) aborts everything after it and the whole call fails. Steps
//! already taken are not rolled back.

pub mod document;
pub mod runner;

use std::sync::Arc;

use tracing::{info, warn};

use crate::args::ArgumentStore;
use crate::config::{AddonAction, Layout};
use crate::Result;

pub use document::{AddonEntry, ArgumentUpdate, ConfigurationDocument, RawDocument, ServiceEntry};
pub use runner::{Invocation, ProcessRunner, SystemRunner};

/// Map a service's argument-file name to the unit name it restarts through.
pub fn restart_unit(service: &str) -> &str {
    match service {
        "kube-proxy" => "proxy",
        "kube-apiserver" => "apiserver",
        "kube-scheduler" => "scheduler",
        "kube-controller-manager" => "controller-manager",
        other => other,
    }
}

/// Drives argument edits, restarts and addon scripts for one node.
#[derive(Clone)]
pub struct ConfigApplier {
    args: ArgumentStore,
    runner: Arc<dyn ProcessRunner>,
    layout: Layout,
}

impl ConfigApplier {
    pub fn new(args: ArgumentStore, runner: Arc<dyn ProcessRunner>, layout: Layout) -> Self {
        Self {
            args,
            runner,
            layout,
        }
    }

    /// Validate and apply a whole document, stopping at the first failure.
    pub fn apply(&self, doc: &ConfigurationDocument) -> Result<()> {
        doc.validate()?;

        for entry in &doc.service {
            self.apply_service(entry).inspect_err(|e| {
                warn!(service = %entry.name, error = %e, "aborting configuration batch");
            })?;
        }
        for entry in &doc.addon {
            self.apply_addon(entry).inspect_err(|e| {
                warn!(addon = %entry.name, error = %e, "aborting configuration batch");
            })?;
        }

        info!(
            services = doc.service.len(),
            addons = doc.addon.len(),
            "configuration applied"
        );
        Ok(())
    }

    fn apply_service(&self, entry: &ServiceEntry) -> Result<()> {
        let service = entry.name.as_str();

        for update in &entry.arguments_update {
            for (key, value) in update.pairs() {
                match value {
                    Some(value) => self.args.upsert(service, key, value)?,
                    None => self.args.delete(service, key)?,
                }
            }
        }
        for key in &entry.arguments_remove {
            self.args.delete(service, key)?;
        }

        if entry.restart {
            self.restart(service)?;
        }
        Ok(())
    }

    fn apply_addon(&self, entry: &AddonEntry) -> Result<()> {
        if entry.enable {
            self.addon(AddonAction::Enable, &entry.name)?;
        }
        if entry.disable {
            self.addon(AddonAction::Disable, &entry.name)?;
        }
        Ok(())
    }

    /// Restart a service through its mapped unit name.
    pub fn restart(&self, service: &str) -> Result<()> {
        let unit = restart_unit(service);
        info!(service, unit, "restarting service");
        self.runner.run(&Invocation::restart(unit))
    }

    fn addon(&self, action: AddonAction, name: &str) -> Result<()> {
        info!(addon = name, %action, "toggling addon");
        self.runner
            .run(&Invocation::addon(&self.layout, action, name))
    }
}
