//! The stored LDAP configuration record

use std::fmt;
use std::io::BufReader;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sirr_core::{Error, Result};

use crate::schema::FieldData;
use crate::template::GroupFilterTemplate;

/// Supported TLS protocol versions, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "tls10")]
    Tls10,
    #[serde(rename = "tls11")]
    Tls11,
    #[default]
    #[serde(rename = "tls12")]
    Tls12,
}

impl TlsVersion {
    pub const SUPPORTED: &'static [TlsVersion] =
        &[TlsVersion::Tls10, TlsVersion::Tls11, TlsVersion::Tls12];

    pub fn parse(value: &str) -> Option<Self> {
        Self::SUPPORTED
            .iter()
            .copied()
            .find(|version| version.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "tls10",
            TlsVersion::Tls11 => "tls11",
            TlsVersion::Tls12 => "tls12",
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state username/group case sensitivity.
///
/// `Unset` only ever occurs on records written before the field existed;
/// it never survives a load or a write. Persisted records carry a plain
/// JSON bool, and the field is skipped entirely while unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    #[default]
    Unset,
    Insensitive,
    Sensitive,
}

impl CaseSensitivity {
    pub fn is_unset(&self) -> bool {
        matches!(self, CaseSensitivity::Unset)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CaseSensitivity::Unset => None,
            CaseSensitivity::Insensitive => Some(false),
            CaseSensitivity::Sensitive => Some(true),
        }
    }
}

impl From<bool> for CaseSensitivity {
    fn from(sensitive: bool) -> Self {
        if sensitive {
            CaseSensitivity::Sensitive
        } else {
            CaseSensitivity::Insensitive
        }
    }
}

impl Serialize for CaseSensitivity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.as_bool() {
            Some(value) => serializer.serialize_bool(value),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CaseSensitivity {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<bool>::deserialize(deserializer)? {
            Some(value) => value.into(),
            None => CaseSensitivity::Unset,
        })
    }
}

fn default_url() -> String {
    crate::schema::DEFAULT_URL.to_string()
}

fn default_group_filter() -> String {
    crate::schema::DEFAULT_GROUP_FILTER.to_string()
}

fn default_attr() -> String {
    crate::schema::DEFAULT_ATTR.to_string()
}

fn default_true() -> bool {
    true
}

/// The LDAP connection configuration, persisted as JSON under the backend's
/// `config` storage key.
///
/// Serde defaults mirror the field schema, so records written before a
/// field existed decode with that field at its schema default.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub userdn: String,
    #[serde(default)]
    pub binddn: String,
    #[serde(default)]
    pub bindpass: String,
    #[serde(default)]
    pub groupdn: String,
    #[serde(default = "default_group_filter")]
    pub groupfilter: String,
    #[serde(default = "default_attr")]
    pub groupattr: String,
    #[serde(default)]
    pub upndomain: String,
    #[serde(default = "default_attr")]
    pub userattr: String,
    #[serde(default)]
    pub certificate: String,
    #[serde(default)]
    pub insecure_tls: bool,
    #[serde(default)]
    pub starttls: bool,
    #[serde(default)]
    pub discoverdn: bool,
    #[serde(default = "default_true")]
    pub deny_null_bind: bool,
    #[serde(default)]
    pub tls_min_version: TlsVersion,
    #[serde(default)]
    pub tls_max_version: TlsVersion,
    #[serde(default, skip_serializing_if = "CaseSensitivity::is_unset")]
    pub case_sensitive_names: CaseSensitivity,
}

impl ConfigEntry {
    /// Build an entry out of user-supplied fields, validating as the
    /// values are pulled out. Absent fields take their schema defaults.
    /// Pure: storage is never touched.
    pub fn from_fields(data: &FieldData) -> Result<Self> {
        let url = data.get_str("url").to_lowercase();
        let userattr = data.get_str("userattr").to_lowercase();

        let groupfilter = data.get_str("groupfilter");
        if !groupfilter.is_empty() {
            GroupFilterTemplate::parse(&groupfilter)
                .map_err(|err| Error::InvalidConfiguration(format!("invalid groupfilter: {err}")))?;
        }

        let certificate = data.get_str("certificate");
        if !certificate.is_empty() {
            validate_certificate(certificate.as_bytes())?;
        }

        let tls_min_version = parse_tls_version("tls_min_version", &data.get_str("tls_min_version"))?;
        let tls_max_version = parse_tls_version("tls_max_version", &data.get_str("tls_max_version"))?;
        if tls_max_version < tls_min_version {
            return Err(Error::InvalidConfiguration(
                "'tls_max_version' must be greater than or equal to 'tls_min_version'".to_string(),
            ));
        }

        let case_sensitive_names = match data.get_bool_ok("case_sensitive_names") {
            Some(value) => value.into(),
            None => CaseSensitivity::Unset,
        };

        Ok(Self {
            url,
            userdn: data.get_str("userdn"),
            binddn: data.get_str("binddn"),
            bindpass: data.get_str("bindpass"),
            groupdn: data.get_str("groupdn"),
            groupfilter,
            groupattr: data.get_str("groupattr"),
            upndomain: data.get_str("upndomain"),
            userattr,
            certificate,
            insecure_tls: data.get_bool("insecure_tls"),
            starttls: data.get_bool("starttls"),
            discoverdn: data.get_bool("discoverdn"),
            deny_null_bind: data.get_bool("deny_null_bind"),
            tls_min_version,
            tls_max_version,
            case_sensitive_names,
        })
    }
}

impl fmt::Debug for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("url", &self.url)
            .field("userdn", &self.userdn)
            .field("binddn", &self.binddn)
            .field("bindpass", &"***REDACTED***")
            .field("groupdn", &self.groupdn)
            .field("groupfilter", &self.groupfilter)
            .field("groupattr", &self.groupattr)
            .field("upndomain", &self.upndomain)
            .field("userattr", &self.userattr)
            .field("certificate", &self.certificate)
            .field("insecure_tls", &self.insecure_tls)
            .field("starttls", &self.starttls)
            .field("discoverdn", &self.discoverdn)
            .field("deny_null_bind", &self.deny_null_bind)
            .field("tls_min_version", &self.tls_min_version)
            .field("tls_max_version", &self.tls_max_version)
            .field("case_sensitive_names", &self.case_sensitive_names)
            .finish()
    }
}

fn parse_tls_version(field: &str, value: &str) -> Result<TlsVersion> {
    TlsVersion::parse(value)
        .ok_or_else(|| Error::InvalidConfiguration(format!("invalid '{field}': {value:?}")))
}

/// Check that `pem` holds a parseable PEM-armored X.509 certificate.
fn validate_certificate(pem: &[u8]) -> Result<()> {
    let mut reader = BufReader::new(pem);
    let block = rustls_pemfile::read_one(&mut reader).map_err(|err| {
        Error::InvalidConfiguration(format!(
            "failed to decode PEM block in the certificate: {err}"
        ))
    })?;

    let der = match block {
        Some(rustls_pemfile::Item::X509Certificate(der)) => der,
        Some(_) => {
            return Err(Error::InvalidConfiguration(
                "PEM block in the certificate is not a CERTIFICATE block".to_string(),
            ))
        }
        None => {
            return Err(Error::InvalidConfiguration(
                "failed to decode PEM block in the certificate".to_string(),
            ))
        }
    };

    x509_parser::parse_x509_certificate(der.as_ref()).map_err(|err| {
        Error::InvalidConfiguration(format!("failed to parse certificate: {err}"))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldData {
        FieldData::from_json(value).unwrap()
    }

    fn test_certificate_pem() -> String {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let mut params = rcgen::CertificateParams::default();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "ldap.example.org");
        params.self_signed(&key_pair).unwrap().pem()
    }

    #[test]
    fn defaults_match_the_schema() {
        let entry = ConfigEntry::from_fields(&FieldData::empty()).unwrap();
        assert_eq!(entry.url, "ldap://127.0.0.1");
        assert_eq!(entry.groupattr, "cn");
        assert_eq!(entry.userattr, "cn");
        assert_eq!(entry.tls_min_version, TlsVersion::Tls12);
        assert_eq!(entry.tls_max_version, TlsVersion::Tls12);
        assert!(entry.deny_null_bind);
        assert!(!entry.insecure_tls);
        assert!(entry.case_sensitive_names.is_unset());
    }

    #[test]
    fn url_and_userattr_are_lowercased() {
        let entry = ConfigEntry::from_fields(&fields(json!({
            "url": "LDAP://EXAMPLE.COM,ldaps://Backup.Example.Com",
            "userattr": "sAMAccountName",
        })))
        .unwrap();
        assert_eq!(entry.url, "ldap://example.com,ldaps://backup.example.com");
        assert_eq!(entry.userattr, "samaccountname");
    }

    #[test]
    fn invalid_groupfilter_is_rejected() {
        let err = ConfigEntry::from_fields(&fields(json!({
            "groupfilter": "(member={{.UserDN)",
        })))
        .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("invalid groupfilter"));
    }

    #[test]
    fn valid_groupfilter_is_accepted() {
        let entry = ConfigEntry::from_fields(&fields(json!({
            "groupfilter": "(&(objectClass=group)(member={{.UserDN}}))",
        })))
        .unwrap();
        assert_eq!(entry.groupfilter, "(&(objectClass=group)(member={{.UserDN}}))");
    }

    #[test]
    fn every_inverted_tls_pair_is_rejected() {
        let versions = ["tls10", "tls11", "tls12"];
        for (i, max) in versions.iter().enumerate() {
            for min in &versions[i + 1..] {
                let err = ConfigEntry::from_fields(&fields(json!({
                    "tls_min_version": min,
                    "tls_max_version": max,
                })))
                .unwrap_err();
                assert!(err.is_validation(), "min={min} max={max} should fail");
            }
        }
    }

    #[test]
    fn ordered_tls_pairs_are_accepted() {
        let versions = ["tls10", "tls11", "tls12"];
        for (i, min) in versions.iter().enumerate() {
            for max in &versions[i..] {
                let entry = ConfigEntry::from_fields(&fields(json!({
                    "tls_min_version": min,
                    "tls_max_version": max,
                })))
                .unwrap();
                assert_eq!(entry.tls_min_version.as_str(), *min);
                assert_eq!(entry.tls_max_version.as_str(), *max);
            }
        }
    }

    #[test]
    fn unsupported_tls_versions_are_rejected() {
        for bad in ["tls13", "ssl3", "TLS12", "", "1.2"] {
            let err = ConfigEntry::from_fields(&fields(json!({"tls_min_version": bad})))
                .unwrap_err();
            assert!(err.is_validation(), "{bad:?} should fail");
            let err = ConfigEntry::from_fields(&fields(json!({"tls_max_version": bad})))
                .unwrap_err();
            assert!(err.is_validation(), "{bad:?} should fail");
        }
    }

    #[test]
    fn malformed_certificate_is_rejected() {
        let err = ConfigEntry::from_fields(&fields(json!({
            "certificate": "not a certificate",
        })))
        .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("PEM block"));
    }

    #[test]
    fn non_certificate_pem_block_is_rejected() {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let err = ConfigEntry::from_fields(&fields(json!({
            "certificate": key_pair.serialize_pem(),
        })))
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn valid_certificate_is_accepted() {
        let pem = test_certificate_pem();
        let entry = ConfigEntry::from_fields(&fields(json!({"certificate": pem}))).unwrap();
        assert_eq!(entry.certificate, pem);
    }

    #[test]
    fn explicit_case_sensitivity_is_kept() {
        let entry = ConfigEntry::from_fields(&fields(json!({"case_sensitive_names": true})))
            .unwrap();
        assert_eq!(entry.case_sensitive_names, CaseSensitivity::Sensitive);

        let entry = ConfigEntry::from_fields(&fields(json!({"case_sensitive_names": false})))
            .unwrap();
        assert_eq!(entry.case_sensitive_names, CaseSensitivity::Insensitive);
    }

    #[test]
    fn legacy_record_decodes_with_unset_case_sensitivity() {
        let entry: ConfigEntry =
            serde_json::from_str(r#"{"url":"ldap://example.com"}"#).unwrap();
        assert!(entry.case_sensitive_names.is_unset());
        // Absent fields keep schema defaults
        assert_eq!(entry.groupattr, "cn");
        assert!(entry.deny_null_bind);
    }

    #[test]
    fn unset_case_sensitivity_is_not_serialized() {
        let entry = ConfigEntry::from_fields(&FieldData::empty()).unwrap();
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("case_sensitive_names"));

        let mut entry = entry;
        entry.case_sensitive_names = CaseSensitivity::Sensitive;
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""case_sensitive_names":true"#));
    }

    #[test]
    fn debug_output_redacts_the_bind_password() {
        let entry = ConfigEntry::from_fields(&fields(json!({
            "bindpass": "hunter2",
        })))
        .unwrap();
        let debug = format!("{entry:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }
}
