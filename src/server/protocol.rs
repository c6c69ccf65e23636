//! Request bodies of the cluster API.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::apply::RawDocument;
use crate::server::extract::FormBody;
use crate::Result;

/// The `port` a joining node reports, sent as a string or a number.
///
/// Accepted for compatibility; the agent does not use it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortField {
    Number(u64),
    Text(String),
}

/// Body of `POST /join`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinRequest {
    pub token: String,
    pub hostname: String,
    #[serde(default)]
    pub port: Option<PortField>,
}

/// `POST /join` as form fields; every value arrives as text.
#[derive(Debug, Deserialize)]
pub struct JoinForm {
    token: String,
    hostname: String,
    #[serde(default)]
    port: Option<String>,
}

impl FormBody for JoinRequest {
    type Form = JoinForm;

    fn from_form(form: JoinForm) -> Result<Self> {
        Ok(Self {
            token: form.token,
            hostname: form.hostname,
            port: form.port.map(PortField::Text),
        })
    }
}

/// Body of `POST /configure`: the callback token next to the document lists.
///
/// The document stays undecoded until the callback token has been checked.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ConfigureFields")]
pub struct ConfigureRequest {
    pub callback: String,
    pub document: RawDocument,
}

/// Wire shape of [`ConfigureRequest`]: the callback plus every other field.
#[derive(Debug, Deserialize)]
pub struct ConfigureFields {
    callback: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<ConfigureFields> for ConfigureRequest {
    fn from(fields: ConfigureFields) -> Self {
        Self {
            callback: fields.callback,
            document: RawDocument::Fields(fields.rest),
        }
    }
}

/// `POST /configure` as form fields, the document JSON-encoded in
/// `configuration`.
#[derive(Debug, Deserialize)]
pub struct ConfigureForm {
    callback: String,
    configuration: String,
}

impl FormBody for ConfigureRequest {
    type Form = ConfigureForm;

    fn from_form(form: ConfigureForm) -> Result<Self> {
        Ok(Self {
            callback: form.callback,
            document: RawDocument::Text(form.configuration),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    #[test]
    fn test_join_port_as_string_or_number() {
        let text: JoinRequest =
            serde_json::from_value(json!({"token": "t", "hostname": "h", "port": "25000"}))
                .unwrap();
        let number: JoinRequest =
            serde_json::from_value(json!({"token": "t", "hostname": "h", "port": 25000})).unwrap();
        let missing: JoinRequest =
            serde_json::from_value(json!({"token": "t", "hostname": "h"})).unwrap();

        assert_eq!(text.port, Some(PortField::Text("25000".to_string())));
        assert_eq!(number.port, Some(PortField::Number(25000)));
        assert_eq!(missing.port, None);
    }

    #[test]
    fn test_join_requires_token() {
        let result: std::result::Result<JoinRequest, _> =
            serde_json::from_value(json!({"hostname": "h"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_configure_request_flattens_document() {
        let request: ConfigureRequest = serde_json::from_value(json!({
            "callback": "tok1",
            "service": [{"name": "kubelet", "restart": true}],
            "addon": [{"name": "dns", "enable": true}]
        }))
        .unwrap();

        assert_eq!(request.callback, "tok1");
        let document = request.document.decode().unwrap();
        assert_eq!(document.service[0].name, "kubelet");
        assert_eq!(document.addon[0].name, "dns");
    }

    #[test]
    fn test_configure_request_defers_schema_errors() {
        let request: ConfigureRequest = serde_json::from_value(json!({
            "callback": "WRONG",
            "service": [{"name": "kubelet", "restrat": true}]
        }))
        .unwrap();

        assert_eq!(request.callback, "WRONG");
        assert!(matches!(
            request.document.decode(),
            Err(Error::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_configure_form_decodes_embedded_json() {
        let request = ConfigureRequest::from_form(ConfigureForm {
            callback: "tok1".to_string(),
            configuration: r#"{"addon":[{"name":"dns","disable":true}]}"#.to_string(),
        })
        .unwrap();

        let document = request.document.decode().unwrap();
        assert!(document.service.is_empty());
        assert!(document.addon[0].disable);
    }

    #[test]
    fn test_configure_form_bad_json_fails_on_decode() {
        let request = ConfigureRequest::from_form(ConfigureForm {
            callback: "tok1".to_string(),
            configuration: "not json".to_string(),
        })
        .unwrap();
        assert!(matches!(
            request.document.decode(),
            Err(Error::InvalidDocument(_))
        ));
    }
}
