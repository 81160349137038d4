//! Errors raised while looking up identity references over LDAPS.
//!
//! Messages carry the bind DN, search base and filter when they help an
//! operator, never the bind credential.

use std::time::Duration;

use idref_directory::DirectoryError;
use thiserror::Error;

/// Failures of the LDAP lookup backend.
#[derive(Debug, Error)]
pub enum LdapError {
    /// A configuration value is missing or out of range.
    #[error("invalid LDAP lookup configuration: {0}")]
    Configuration(String),

    /// The directory URL does not use LDAPS.
    #[error(
        "refusing directory URL '{url}': lookups only run over LDAPS (ldaps://), \
         plain LDAP and STARTTLS are not supported"
    )]
    InsecureProtocol {
        /// The rejected URL.
        url: String,
    },

    /// The directory could not be reached.
    #[error("cannot reach the directory: {0}")]
    Connection(String),

    /// The lookup service account was rejected.
    #[error("lookup account '{bind_dn}' could not bind: {reason}")]
    Bind {
        /// DN of the service account.
        bind_dn: String,
        /// Server diagnostic.
        reason: String,
    },

    /// The directory answered a lookup with a non-success result.
    #[error("lookup under '{base_dn}' with filter {filter} failed: {reason}")]
    Search {
        /// Search base.
        base_dn: String,
        /// The lookup filter that was sent.
        filter: String,
        /// Server result code and diagnostic.
        reason: String,
    },

    /// A lookup did not complete within the operation timeout.
    #[error("lookup did not complete within {}s", .0.as_secs())]
    Timeout(Duration),

    /// The connection pool has been shut down.
    #[error("LDAP connection pool is closed")]
    PoolClosed,

    /// Transport or protocol failure reported by `ldap3`.
    #[error("LDAP protocol failure: {0}")]
    Ldap3(#[from] ldap3::LdapError),
}

impl LdapError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Checks if the cached connection should be discarded.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::PoolClosed | Self::Ldap3(_)
        )
    }
}

/// Result type for LDAP lookups.
pub type LdapResult<T> = Result<T, LdapError>;

impl From<LdapError> for DirectoryError {
    fn from(err: LdapError) -> Self {
        match err {
            LdapError::Configuration(msg) => DirectoryError::Configuration(msg),
            LdapError::InsecureProtocol { .. } | LdapError::Bind { .. } => {
                DirectoryError::Configuration(err.to_string())
            }
            LdapError::Search { .. } => DirectoryError::Protocol(err.to_string()),
            LdapError::Timeout(_) => DirectoryError::Timeout(err.to_string()),
            LdapError::Connection(msg) => DirectoryError::Connection(msg),
            LdapError::PoolClosed | LdapError::Ldap3(_) => {
                DirectoryError::Connection(err.to_string())
            }
        }
    }
}
