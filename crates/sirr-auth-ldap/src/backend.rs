//! The `config` path operations: load, write, display

use serde_json::{json, Map, Value};
use sirr_core::{Result, SystemView};
use sirr_storage::{Storage, StorageEntry};
use tracing::{debug, warn};

use crate::config::{CaseSensitivity, ConfigEntry};
use crate::schema::FieldData;

/// Storage key holding the backend configuration. One record per mount.
pub const CONFIG_STORAGE_KEY: &str = "config";

pub const HELP_SYNOPSIS: &str =
    "Configure the LDAP server to connect to, along with its options.";

pub const HELP_DESCRIPTION: &str = "\
This endpoint allows you to configure the LDAP server to connect to and its
configuration options.

The LDAP URL can use either the \"ldap://\" or \"ldaps://\" schema. In the
former case, an unencrypted connection will be made with a default port of
389, unless the \"starttls\" parameter is set to true, in which case TLS
will be used. In the latter case, a SSL connection will be established with
a default port of 636.

It is up to the administrator to provide properly escaped DNs. This
includes the user DN, bind DN for search, and so on.";

/// Handles the `config` path of the LDAP auth backend.
pub struct ConfigBackend {
    system: SystemView,
}

impl ConfigBackend {
    pub fn new(system: SystemView) -> Self {
        Self { system }
    }

    /// Load the stored configuration, falling back to schema defaults when
    /// nothing has been written yet.
    ///
    /// Records written before `case_sensitive_names` existed are resolved
    /// to case-sensitive (the behavior at the time) and re-persisted when
    /// this node is authoritative for writes. The re-persist is
    /// best-effort: a storage failure is logged and the upgraded entry is
    /// still returned.
    pub async fn load(&self, storage: &dyn Storage) -> Result<ConfigEntry> {
        let Some(stored) = storage.get(CONFIG_STORAGE_KEY).await? else {
            // Fresh mount: nothing to upgrade, nothing persisted.
            let mut entry = ConfigEntry::from_fields(&FieldData::empty())?;
            entry.case_sensitive_names = CaseSensitivity::Insensitive;
            return Ok(entry);
        };

        let mut entry: ConfigEntry = stored.decode_json()?;

        if entry.case_sensitive_names.is_unset() {
            // Record predates the switch to case-insensitive matching.
            entry.case_sensitive_names = CaseSensitivity::Sensitive;

            if self.system.authoritative_for_writes() {
                let upgraded = StorageEntry::from_json(CONFIG_STORAGE_KEY, &entry)?;
                match storage.put(upgraded).await {
                    Ok(()) => debug!("persisted legacy ldap config upgrade"),
                    Err(err) => {
                        warn!("failed to persist upgraded ldap config, keeping upgrade in memory: {err}")
                    }
                }
            }
        }

        Ok(entry)
    }

    /// Validate and persist a new configuration. All-or-nothing: the
    /// record is only written once every field has validated.
    pub async fn write(&self, fields: &FieldData, storage: &dyn Storage) -> Result<()> {
        let mut entry = ConfigEntry::from_fields(fields)?;

        // New writes default to case-insensitive; only reads of legacy
        // records resolve the field to case-sensitive.
        if entry.case_sensitive_names.is_unset() {
            entry.case_sensitive_names = CaseSensitivity::Insensitive;
        }

        let record = StorageEntry::from_json(CONFIG_STORAGE_KEY, &entry)?;
        storage.put(record).await?;
        debug!("stored ldap configuration");
        Ok(())
    }

    /// Project the configuration for external display. The bind password
    /// is never included.
    pub async fn read_for_display(&self, storage: &dyn Storage) -> Result<Map<String, Value>> {
        let entry = self.load(storage).await?;

        let mut data = Map::new();
        data.insert("url".to_string(), json!(entry.url));
        data.insert("userdn".to_string(), json!(entry.userdn));
        data.insert("binddn".to_string(), json!(entry.binddn));
        data.insert("groupdn".to_string(), json!(entry.groupdn));
        data.insert("groupfilter".to_string(), json!(entry.groupfilter));
        data.insert("groupattr".to_string(), json!(entry.groupattr));
        data.insert("upndomain".to_string(), json!(entry.upndomain));
        data.insert("userattr".to_string(), json!(entry.userattr));
        data.insert("certificate".to_string(), json!(entry.certificate));
        data.insert("insecure_tls".to_string(), json!(entry.insecure_tls));
        data.insert("starttls".to_string(), json!(entry.starttls));
        data.insert("discoverdn".to_string(), json!(entry.discoverdn));
        data.insert("deny_null_bind".to_string(), json!(entry.deny_null_bind));
        data.insert("tls_min_version".to_string(), json!(entry.tls_min_version));
        data.insert("tls_max_version".to_string(), json!(entry.tls_max_version));
        data.insert(
            "case_sensitive_names".to_string(),
            json!(entry.case_sensitive_names.as_bool().unwrap_or(true)),
        );
        Ok(data)
    }
}
