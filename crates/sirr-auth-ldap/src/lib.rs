//! LDAP authentication backend for Sirr
//!
//! The backend's `config` path: a declarative field schema, validation of
//! user-supplied directory settings, versioned persistence through the
//! host storage, and the display projection served on reads.
//!
//! The LDAP network client and the login flow live in the host; this
//! crate owns everything about the configuration record.

mod backend;
mod config;
mod schema;
mod template;

pub use backend::{ConfigBackend, CONFIG_STORAGE_KEY, HELP_DESCRIPTION, HELP_SYNOPSIS};
pub use config::{CaseSensitivity, ConfigEntry, TlsVersion};
pub use schema::{config_fields, FieldData, FieldDefault, FieldSchema, FieldType};
pub use template::{GroupFilterTemplate, TemplateError};
