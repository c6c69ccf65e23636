//! Choosing the address a joined node is known by.

use std::net::ToSocketAddrs;

use tracing::debug;

/// Forward name resolution.
pub trait HostResolver: Send + Sync {
    /// Whether `hostname` resolves to at least one address.
    fn resolves(&self, hostname: &str) -> bool;
}

/// Resolver backed by the system's `getaddrinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolves(&self, hostname: &str) -> bool {
        match (hostname, 0).to_socket_addrs() {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                debug!(hostname, error = %e, "hostname did not resolve");
                false
            }
        }
    }
}

/// Pick the endpoint for a joining node.
///
/// The hostname is kept if it resolves, so the control plane can re-resolve it
/// later; otherwise the address the request came from is used. One lookup, no
/// retries.
pub fn resolve_node_endpoint(resolver: &dyn HostResolver, hostname: &str, observed: &str) -> String {
    let hostname = hostname.trim();
    if !hostname.is_empty() && resolver.resolves(hostname) {
        hostname.to_string()
    } else {
        observed.to_string()
    }
}
