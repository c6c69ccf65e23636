//! Certificate material handed to joining nodes.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Layout;
use crate::files::read_required;
use crate::Result;

pub const CA_CERT: &str = "ca.crt";
pub const CA_KEY: &str = "ca.key";
pub const SERVER_CERT: &str = "server.crt";
pub const SERVER_KEY: &str = "server.key";
pub const SERVICE_ACCOUNT_KEY: &str = "serviceaccount.key";
pub const PROXY_CERT: &str = "front-proxy-client.crt";
pub const PROXY_KEY: &str = "front-proxy-client.key";

/// Every file expected under the certs directory.
pub const CERT_FILES: [&str; 7] = [
    CA_CERT,
    CA_KEY,
    SERVER_CERT,
    SERVER_KEY,
    SERVICE_ACCOUNT_KEY,
    PROXY_CERT,
    PROXY_KEY,
];

/// Certificate and key contents of this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCredentials {
    pub ca: String,
    pub ca_key: String,
    pub server_cert: String,
    pub server_cert_key: String,
    pub service_account_key: String,
    pub proxy_cert: String,
    pub proxy_cert_key: String,
    pub cluster_cert: String,
    pub cluster_key: String,
}

/// Read-only view of the node's certificate directories.
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    certs_dir: PathBuf,
    cluster_dir: PathBuf,
}

impl CredentialRepository {
    pub fn new(layout: &Layout) -> Self {
        Self {
            certs_dir: layout.certs_dir(),
            cluster_dir: layout.cluster_backend_dir(),
        }
    }

    /// Contents of a file in the certs directory.
    pub fn cert(&self, name: &str) -> Result<String> {
        read_required(&self.certs_dir.join(name))
    }

    /// Contents of the inter-node cluster certificate and key.
    pub fn cluster_pair(&self) -> Result<(String, String)> {
        let cert = read_required(&self.cluster_dir.join("cluster.crt"))?;
        let key = read_required(&self.cluster_dir.join("cluster.key"))?;
        Ok((cert, key))
    }

    /// Read every certificate and key.
    ///
    /// Fails on the first missing file; a partial set is never returned.
    pub fn assemble(&self) -> Result<NodeCredentials> {
        let (cluster_cert, cluster_key) = self.cluster_pair()?;
        Ok(NodeCredentials {
            ca: self.cert(CA_CERT)?,
            ca_key: self.cert(CA_KEY)?,
            server_cert: self.cert(SERVER_CERT)?,
            server_cert_key: self.cert(SERVER_KEY)?,
            service_account_key: self.cert(SERVICE_ACCOUNT_KEY)?,
            proxy_cert: self.cert(PROXY_CERT)?,
            proxy_cert_key: self.cert(PROXY_KEY)?,
            cluster_cert,
            cluster_key,
        })
    }
}

/// Everything a joining node receives.
///
/// Field names are the wire names of the join response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialBundle {
    pub ca: String,
    pub ca_key: String,
    pub server_cert: String,
    pub server_cert_key: String,
    pub service_account_key: String,
    pub proxy_cert: String,
    pub proxy_cert_key: String,
    pub cluster_cert: String,
    pub cluster_key: String,
    pub cluster_port: String,
    pub callback_token: String,
    pub apiport: Option<String>,
    pub kubelet_args: String,
    pub hostname_override: String,
}

impl CredentialBundle {
    pub fn new(
        creds: NodeCredentials,
        cluster_port: String,
        callback_token: String,
        apiport: Option<String>,
        kubelet_args: String,
        hostname_override: String,
    ) -> Self {
        Self {
            ca: creds.ca,
            ca_key: creds.ca_key,
            server_cert: creds.server_cert,
            server_cert_key: creds.server_cert_key,
            service_account_key: creds.service_account_key,
            proxy_cert: creds.proxy_cert,
            proxy_cert_key: creds.proxy_cert_key,
            cluster_cert: creds.cluster_cert,
            cluster_key: creds.cluster_key,
            cluster_port,
            callback_token,
            apiport,
            kubelet_args,
            hostname_override,
        }
    }
}

/// Append a hostname override to a kubelet argument blob.
pub fn annotate_kubelet_args(args: &str, node: &str) -> String {
    format!("{}--hostname-override {}", args, node)
}
