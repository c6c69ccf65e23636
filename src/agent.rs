//! The node agent: join and configure, wired to the stores it works on.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::apply::{ConfigApplier, ProcessRunner, RawDocument};
use crate::args::ArgumentStore;
use crate::config::{Layout, ResolvedSettings};
use crate::credentials::{CredentialBundle, CredentialRepository, annotate_kubelet_args};
use crate::endpoint::{HostResolver, resolve_node_endpoint};
use crate::files::FileLocks;
use crate::tokens::TokenStore;
use crate::Result;

/// Behaviour switches read from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub cluster_port: String,
    pub restart_apiserver_on_join: bool,
    pub annotate_kubelet_hostname: bool,
}

impl From<&ResolvedSettings> for AgentOptions {
    fn from(settings: &ResolvedSettings) -> Self {
        Self {
            cluster_port: settings.cluster_port.value.clone(),
            restart_apiserver_on_join: settings.restart_apiserver_on_join.value,
            annotate_kubelet_hostname: settings.annotate_kubelet_hostname.value,
        }
    }
}

#[derive(Clone)]
pub struct Agent {
    tokens: TokenStore,
    args: ArgumentStore,
    credentials: CredentialRepository,
    resolver: Arc<dyn HostResolver>,
    applier: ConfigApplier,
    options: AgentOptions,
}

impl Agent {
    pub fn new(
        layout: Layout,
        options: AgentOptions,
        runner: Arc<dyn ProcessRunner>,
        resolver: Arc<dyn HostResolver>,
    ) -> Self {
        let locks = Arc::new(FileLocks::new());
        let args = ArgumentStore::new(layout.args_dir(), locks.clone());
        Self {
            tokens: TokenStore::new(&layout, locks),
            credentials: CredentialRepository::new(&layout),
            applier: ConfigApplier::new(args.clone(), runner, layout),
            args,
            resolver,
            options,
        }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Admit a node presenting a join token.
    ///
    /// The token is consumed before anything else is read, so a join that
    /// later fails on a missing file has still used up its token.
    #[instrument(skip(self, token))]
    pub fn join(&self, token: &str, hostname: &str, observed: &str) -> Result<CredentialBundle> {
        self.tokens.consume_join_token(token)?;

        let callback_token = self.tokens.callback_token()?;
        let address = resolve_node_endpoint(self.resolver.as_ref(), hostname, observed);
        let apiport = self.args.get_required("kube-apiserver", "--secure-port")?;

        if self.options.restart_apiserver_on_join {
            self.applier.restart("kube-apiserver")?;
        }

        let mut kubelet_args = self.args.read_all("kubelet")?;
        if self.options.annotate_kubelet_hostname {
            kubelet_args = annotate_kubelet_args(&kubelet_args, &address);
        }

        let creds = self.credentials.assemble()?;
        info!(node = %address, "node joined");

        Ok(CredentialBundle::new(
            creds,
            self.options.cluster_port.clone(),
            callback_token,
            apiport,
            kubelet_args,
            address,
        ))
    }

    /// Apply a configuration document sent by the controller.
    ///
    /// The callback token is checked before the document is decoded, so a
    /// caller without it gets an invalid-token error whatever the body holds.
    #[instrument(skip_all)]
    pub fn configure(&self, callback: &str, document: RawDocument) -> Result<()> {
        self.tokens.check_callback_token(callback)?;
        let doc = document.decode()?;
        self.applier.apply(&doc)
    }
}
