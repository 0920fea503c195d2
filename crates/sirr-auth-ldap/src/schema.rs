//! Field schema for the `config` path
//!
//! Schema-as-data: a static table of field names, types, defaults and
//! operator help text. Both write-time validation and the read projection
//! derive from this table, so it is the single source of truth for what
//! the path accepts and returns.

use serde_json::{Map, Value};
use sirr_core::{Error, Result};

pub const DEFAULT_URL: &str = "ldap://127.0.0.1";
pub const DEFAULT_GROUP_FILTER: &str =
    "(|(memberUid={{.Username}})(member={{.UserDN}})(uniqueMember={{.UserDN}}))";
pub const DEFAULT_ATTR: &str = "cn";
pub const DEFAULT_TLS_VERSION: &str = "tls12";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
}

/// Default applied when the caller omits a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    None,
    Str(&'static str),
    Bool(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub name: &'static str,
    pub field_type: FieldType,
    pub default: FieldDefault,
    pub description: &'static str,
}

const CONFIG_FIELDS: &[FieldSchema] = &[
    FieldSchema {
        name: "url",
        field_type: FieldType::String,
        default: FieldDefault::Str(DEFAULT_URL),
        description: "LDAP URL to connect to (default: ldap://127.0.0.1). Multiple URLs can be \
                      specified by concatenating them with commas; they will be tried in-order.",
    },
    FieldSchema {
        name: "userdn",
        field_type: FieldType::String,
        default: FieldDefault::None,
        description: "LDAP domain to use for users (eg: ou=People,dc=example,dc=org)",
    },
    FieldSchema {
        name: "binddn",
        field_type: FieldType::String,
        default: FieldDefault::None,
        description: "LDAP DN for searching for the user DN (optional)",
    },
    FieldSchema {
        name: "bindpass",
        field_type: FieldType::String,
        default: FieldDefault::None,
        description: "LDAP password for searching for the user DN (optional)",
    },
    FieldSchema {
        name: "groupdn",
        field_type: FieldType::String,
        default: FieldDefault::None,
        description: "LDAP search base to use for group membership search \
                      (eg: ou=Groups,dc=example,dc=org)",
    },
    FieldSchema {
        name: "groupfilter",
        field_type: FieldType::String,
        default: FieldDefault::Str(DEFAULT_GROUP_FILTER),
        description: "Template for querying group membership of a user (optional). The template \
                      can access the context variables UserDN and Username.",
    },
    FieldSchema {
        name: "groupattr",
        field_type: FieldType::String,
        default: FieldDefault::Str(DEFAULT_ATTR),
        description: "LDAP attribute to follow on objects returned by groupfilter in order to \
                      enumerate user group membership. Examples: \"cn\" or \"memberOf\". \
                      Default: cn",
    },
    FieldSchema {
        name: "upndomain",
        field_type: FieldType::String,
        default: FieldDefault::None,
        description: "Enables userPrincipalDomain login with [username]@UPNDomain (optional)",
    },
    FieldSchema {
        name: "userattr",
        field_type: FieldType::String,
        default: FieldDefault::Str(DEFAULT_ATTR),
        description: "Attribute used for users (default: cn)",
    },
    FieldSchema {
        name: "certificate",
        field_type: FieldType::String,
        default: FieldDefault::None,
        description: "CA certificate to use when verifying the LDAP server certificate, must be \
                      x509 PEM encoded (optional)",
    },
    FieldSchema {
        name: "discoverdn",
        field_type: FieldType::Bool,
        default: FieldDefault::None,
        description: "Use anonymous bind to discover the bind DN of a user (optional)",
    },
    FieldSchema {
        name: "insecure_tls",
        field_type: FieldType::Bool,
        default: FieldDefault::None,
        description: "Skip LDAP server SSL certificate verification - VERY insecure (optional)",
    },
    FieldSchema {
        name: "starttls",
        field_type: FieldType::Bool,
        default: FieldDefault::None,
        description: "Issue a StartTLS command after establishing an unencrypted connection \
                      (optional)",
    },
    FieldSchema {
        name: "tls_min_version",
        field_type: FieldType::String,
        default: FieldDefault::Str(DEFAULT_TLS_VERSION),
        description: "Minimum TLS version to use. Accepted values are 'tls10', 'tls11' or \
                      'tls12'. Defaults to 'tls12'",
    },
    FieldSchema {
        name: "tls_max_version",
        field_type: FieldType::String,
        default: FieldDefault::Str(DEFAULT_TLS_VERSION),
        description: "Maximum TLS version to use. Accepted values are 'tls10', 'tls11' or \
                      'tls12'. Defaults to 'tls12'",
    },
    FieldSchema {
        name: "deny_null_bind",
        field_type: FieldType::Bool,
        default: FieldDefault::Bool(true),
        description: "Denies an unauthenticated LDAP bind request if the user's password is \
                      empty; defaults to true",
    },
    FieldSchema {
        name: "case_sensitive_names",
        field_type: FieldType::Bool,
        default: FieldDefault::None,
        description: "If true, case sensitivity will be used when comparing usernames and \
                      groups for matching policies.",
    },
];

/// The full `config` path schema, in declaration order.
pub fn config_fields() -> &'static [FieldSchema] {
    CONFIG_FIELDS
}

pub fn field_schema(name: &str) -> Option<&'static FieldSchema> {
    CONFIG_FIELDS.iter().find(|field| field.name == name)
}

/// Raw user-supplied values checked against the schema.
///
/// Unknown names and mistyped values are rejected up front; absent fields
/// fall back to their schema defaults on extraction.
#[derive(Debug, Clone, Default)]
pub struct FieldData {
    raw: Map<String, Value>,
}

impl FieldData {
    pub fn new(raw: Map<String, Value>) -> Result<Self> {
        for (name, value) in &raw {
            let schema = field_schema(name)
                .ok_or_else(|| Error::InvalidConfiguration(format!("unknown field: {name}")))?;
            let matches = match schema.field_type {
                FieldType::String => value.is_string(),
                FieldType::Bool => value.is_boolean(),
            };
            if !matches {
                return Err(Error::InvalidConfiguration(format!(
                    "field {name} expects a {:?} value",
                    schema.field_type
                )));
            }
        }
        Ok(Self { raw })
    }

    /// Build from a JSON object, as received from the host request body.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Err(Error::InvalidConfiguration(
                "request body must be a JSON object".to_string(),
            )),
        }
    }

    /// No user input at all: every extraction returns its schema default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// String value of `name`, falling back to the schema default.
    pub fn get_str(&self, name: &str) -> String {
        match self.raw.get(name) {
            Some(Value::String(s)) => s.clone(),
            _ => match field_schema(name).map(|field| field.default) {
                Some(FieldDefault::Str(s)) => s.to_string(),
                _ => String::new(),
            },
        }
    }

    /// Bool value of `name`, falling back to the schema default.
    pub fn get_bool(&self, name: &str) -> bool {
        match self.raw.get(name) {
            Some(Value::Bool(b)) => *b,
            _ => matches!(
                field_schema(name).map(|field| field.default),
                Some(FieldDefault::Bool(true))
            ),
        }
    }

    /// Bool value of `name` only when the caller explicitly supplied it.
    pub fn get_bool_ok(&self, name: &str) -> Option<bool> {
        match self.raw.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_covers_every_config_field() {
        assert_eq!(config_fields().len(), 17);
        assert!(field_schema("url").is_some());
        assert!(field_schema("bindpass").is_some());
        assert!(field_schema("nonexistent").is_none());
    }

    #[test]
    fn empty_data_yields_schema_defaults() {
        let data = FieldData::empty();
        assert_eq!(data.get_str("url"), DEFAULT_URL);
        assert_eq!(data.get_str("groupattr"), DEFAULT_ATTR);
        assert_eq!(data.get_str("tls_min_version"), DEFAULT_TLS_VERSION);
        assert_eq!(data.get_str("userdn"), "");
        assert!(data.get_bool("deny_null_bind"));
        assert!(!data.get_bool("starttls"));
    }

    #[test]
    fn supplied_values_override_defaults() {
        let data = FieldData::from_json(json!({
            "url": "ldaps://ad.example.com",
            "deny_null_bind": false,
        }))
        .unwrap();
        assert_eq!(data.get_str("url"), "ldaps://ad.example.com");
        assert!(!data.get_bool("deny_null_bind"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = FieldData::from_json(json!({"no_such_field": "x"})).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn mistyped_fields_are_rejected() {
        let err = FieldData::from_json(json!({"starttls": "yes"})).unwrap_err();
        assert!(err.is_validation());
        let err = FieldData::from_json(json!({"url": true})).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn get_bool_ok_distinguishes_absent_from_false() {
        let absent = FieldData::empty();
        assert_eq!(absent.get_bool_ok("case_sensitive_names"), None);

        let explicit = FieldData::from_json(json!({"case_sensitive_names": false})).unwrap();
        assert_eq!(explicit.get_bool_ok("case_sensitive_names"), Some(false));
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = FieldData::from_json(json!(["url"])).unwrap_err();
        assert!(err.is_validation());
    }
}
