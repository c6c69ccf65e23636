//! KDL schema for the agent settings file.

use std::path::Path;

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};

use crate::files::read_optional;
use crate::{Error, Result};

/// Settings stored in `cluster-agent.kdl`.
///
/// Every field is optional; unset fields fall through to the CLI/env value or
/// the built-in default during resolution.
///
/// # KDL Schema
///
/// ```kdl
/// listen "0.0.0.0"
/// port 25000
/// command-timeout-secs 300
/// cluster-port "19001"
/// restart-apiserver-on-join #true
/// annotate-kubelet-hostname #false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
    /// Interface to listen on
    pub listen: Option<String>,

    /// Port to listen on
    pub port: Option<u16>,

    /// Timeout for a single restart/addon invocation
    pub command_timeout_secs: Option<u64>,

    /// Inter-node cluster port advertised in the join bundle
    pub cluster_port: Option<String>,

    /// Restart the API server after a node joins
    pub restart_apiserver_on_join: Option<bool>,

    /// Append `--hostname-override` to the kubelet args handed to joiners
    pub annotate_kubelet_hostname: Option<bool>,
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the settings file, returning `None` if it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let Some(contents) = read_optional(path)? else {
            return Ok(None);
        };
        let doc: KdlDocument = contents
            .parse()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Some(config))
    }

    /// Validate the config values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.port == Some(0) {
            return Err("port must be non-zero".to_string());
        }
        if self.command_timeout_secs == Some(0) {
            return Err("command-timeout-secs must be non-zero".to_string());
        }
        if let Some(ref port) = self.cluster_port {
            if port.parse::<u16>().is_err() {
                return Err(format!("cluster-port must be a port number, got {}", port));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Entries of the wrong type are ignored, as are unknown nodes.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(value) = first_value(doc, "listen") {
            config.listen = value.as_string().map(str::to_string);
        }

        if let Some(value) = first_value(doc, "port") {
            config.port = value.as_integer().and_then(|i| u16::try_from(i).ok());
        }

        if let Some(value) = first_value(doc, "command-timeout-secs") {
            config.command_timeout_secs = value.as_integer().and_then(|i| u64::try_from(i).ok());
        }

        // Accept both `cluster-port 19001` and `cluster-port "19001"`
        if let Some(value) = first_value(doc, "cluster-port") {
            config.cluster_port = match value {
                KdlValue::String(s) => Some(s.clone()),
                KdlValue::Integer(i) => Some(i.to_string()),
                _ => None,
            };
        }

        if let Some(value) = first_value(doc, "restart-apiserver-on-join") {
            config.restart_apiserver_on_join = value.as_bool();
        }

        if let Some(value) = first_value(doc, "annotate-kubelet-hostname") {
            config.annotate_kubelet_hostname = value.as_bool();
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref listen) = self.listen {
            push_node(&mut doc, "listen", KdlValue::String(listen.clone()));
        }
        if let Some(port) = self.port {
            push_node(&mut doc, "port", KdlValue::Integer(port as i128));
        }
        if let Some(secs) = self.command_timeout_secs {
            push_node(&mut doc, "command-timeout-secs", KdlValue::Integer(secs as i128));
        }
        if let Some(ref port) = self.cluster_port {
            push_node(&mut doc, "cluster-port", KdlValue::String(port.clone()));
        }
        if let Some(flag) = self.restart_apiserver_on_join {
            push_node(&mut doc, "restart-apiserver-on-join", KdlValue::Bool(flag));
        }
        if let Some(flag) = self.annotate_kubelet_hostname {
            push_node(&mut doc, "annotate-kubelet-hostname", KdlValue::Bool(flag));
        }

        doc
    }
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.listen, None);
        assert_eq!(config.port, None);
        assert_eq!(config.restart_apiserver_on_join, None);
    }

    #[test]
    fn test_config_from_kdl_empty() {
        let doc = KdlDocument::new();
        assert_eq!(AgentConfig::from_kdl(&doc), AgentConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            listen "127.0.0.1"
            port 25001
            command-timeout-secs 30
            cluster-port 19002
            restart-apiserver-on-join #false
            annotate-kubelet-hostname #true
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = AgentConfig::from_kdl(&doc);

        assert_eq!(config.listen, Some("127.0.0.1".to_string()));
        assert_eq!(config.port, Some(25001));
        assert_eq!(config.command_timeout_secs, Some(30));
        assert_eq!(config.cluster_port, Some("19002".to_string()));
        assert_eq!(config.restart_apiserver_on_join, Some(false));
        assert_eq!(config.annotate_kubelet_hostname, Some(true));
    }

    #[test]
    fn test_config_from_kdl_ignores_wrong_types() {
        let doc: KdlDocument = r#"port "not-a-number""#.parse().unwrap();
        let config = AgentConfig::from_kdl(&doc);
        assert_eq!(config.port, None);
    }

    #[test]
    fn test_config_from_kdl_out_of_range_port() {
        let doc: KdlDocument = "port 70000".parse().unwrap();
        assert_eq!(AgentConfig::from_kdl(&doc).port, None);
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = AgentConfig {
            listen: Some("10.0.0.1".to_string()),
            port: Some(25000),
            command_timeout_secs: Some(60),
            cluster_port: Some("19001".to_string()),
            restart_apiserver_on_join: Some(true),
            annotate_kubelet_hostname: Some(false),
        };
        let reparsed: KdlDocument = config.to_kdl().to_string().parse().unwrap();
        assert_eq!(AgentConfig::from_kdl(&reparsed), config);
    }

    #[test]
    fn test_validate_rejects_bad_cluster_port() {
        let config = AgentConfig {
            cluster_port: Some("abc".to_string()),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("cluster-port"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = AgentConfig {
            command_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert_eq!(AgentConfig::load(&temp.path().join("absent.kdl")).unwrap(), None);
    }

    #[test]
    fn test_load_invalid_kdl() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("agent.kdl");
        std::fs::write(&path, "port {{{").unwrap();
        assert!(matches!(AgentConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_valid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("agent.kdl");
        std::fs::write(&path, "port 26000\n").unwrap();
        let config = AgentConfig::load(&path).unwrap().unwrap();
        assert_eq!(config.port, Some(26000));
    }
}
