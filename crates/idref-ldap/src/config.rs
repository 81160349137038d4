//! LDAP connection configuration.
//!
//! ## Security Requirements
//!
//! The connection URL MUST use the `ldaps://` scheme. Plain `ldap://` and
//! STARTTLS are rejected.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LdapError, LdapResult};

/// Environment variable holding the connection URL.
pub const ENV_URL: &str = "IDREF_LDAP_URL";
/// Environment variable holding the bind DN.
pub const ENV_BIND_DN: &str = "IDREF_LDAP_BIND_DN";
/// Environment variable holding the bind password.
pub const ENV_BIND_PASSWORD: &str = "IDREF_LDAP_BIND_PASSWORD";
/// Environment variable holding the operation timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "IDREF_LDAP_TIMEOUT_SECS";
/// Environment variable holding the maximum concurrent operations.
pub const ENV_POOL_SIZE: &str = "IDREF_LDAP_POOL_SIZE";

const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POOL_SIZE: usize = 4;

/// LDAP directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server URL (MUST be ldaps://).
    pub connection_url: String,

    /// Bind DN for the service account.
    pub bind_dn: String,

    /// Bind credential (password).
    #[serde(skip_serializing)]
    pub bind_credential: String,

    /// Whether to validate server certificates.
    pub validate_certificates: bool,

    /// Connection establishment timeout.
    #[serde(with = "duration_secs")]
    pub connection_timeout: Duration,

    /// Timeout for each search.
    #[serde(with = "duration_secs")]
    pub operation_timeout: Duration,

    /// Maximum concurrent operations.
    pub pool_size: usize,
}

impl LdapConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> LdapConfigBuilder {
        LdapConfigBuilder::new()
    }

    /// Loads configuration from `IDREF_LDAP_*` environment variables,
    /// reading a `.env` file first if one exists.
    ///
    /// ## Errors
    ///
    /// Returns an error if a required variable is missing, a numeric
    /// variable does not parse, or validation fails.
    pub fn from_env() -> LdapResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from a key lookup using the `IDREF_LDAP_*` names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LdapResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .ok_or_else(|| LdapError::config(format!("{key} environment variable is required")))
        };

        let mut builder = Self::builder()
            .connection_url(required(ENV_URL)?)
            .bind_dn(required(ENV_BIND_DN)?)
            .bind_credential(required(ENV_BIND_PASSWORD)?);

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| {
                    LdapError::config(format!(
                        "{ENV_TIMEOUT_SECS} must be a number of seconds, got '{secs}'"
                    ))
                })?;
            builder = builder.operation_timeout(Duration::from_secs(secs));
        }
        if let Some(size) = lookup(ENV_POOL_SIZE) {
            let size: usize = size
                .trim()
                .parse()
                .map_err(|_| {
                    LdapError::config(format!(
                        "{ENV_POOL_SIZE} must be a positive integer, got '{size}'"
                    ))
                })?;
            builder = builder.pool_size(size);
        }

        builder.build()
    }

    /// Validates the configuration.
    ///
    /// ## Security
    ///
    /// This method enforces LDAPS-only connections.
    pub fn validate(&self) -> LdapResult<()> {
        Self::validate_ldaps_url(&self.connection_url)?;

        if self.bind_dn.is_empty() {
            return Err(LdapError::config("bind_dn cannot be empty"));
        }
        if self.pool_size == 0 {
            return Err(LdapError::config("pool_size must be at least 1"));
        }
        if self.operation_timeout.is_zero() {
            return Err(LdapError::config("operation_timeout must be greater than zero"));
        }

        Ok(())
    }

    fn validate_ldaps_url(url: &str) -> LdapResult<()> {
        let url_lower = url.to_lowercase();

        if !url_lower.starts_with("ldaps://") {
            return Err(LdapError::InsecureProtocol {
                url: url.to_string(),
            });
        }
        if url.len() <= "ldaps://".len() {
            return Err(LdapError::config("Invalid LDAPS URL: missing host"));
        }

        Ok(())
    }
}

/// Builder for [`LdapConfig`].
#[derive(Debug)]
pub struct LdapConfigBuilder {
    connection_url: Option<String>,
    bind_dn: Option<String>,
    bind_credential: Option<String>,
    validate_certificates: bool,
    connection_timeout: Duration,
    operation_timeout: Duration,
    pool_size: usize,
}

impl Default for LdapConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LdapConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connection_url: None,
            bind_dn: None,
            bind_credential: None,
            validate_certificates: true,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Sets the connection URL.
    #[must_use]
    pub fn connection_url(mut self, url: impl Into<String>) -> Self {
        self.connection_url = Some(url.into());
        self
    }

    /// Sets the bind DN.
    #[must_use]
    pub fn bind_dn(mut self, dn: impl Into<String>) -> Self {
        self.bind_dn = Some(dn.into());
        self
    }

    /// Sets the bind credential.
    #[must_use]
    pub fn bind_credential(mut self, credential: impl Into<String>) -> Self {
        self.bind_credential = Some(credential.into());
        self
    }

    /// Sets whether certificates are validated.
    #[must_use]
    pub const fn validate_certificates(mut self, validate: bool) -> Self {
        self.validate_certificates = validate;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the per-search timeout.
    #[must_use]
    pub const fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets the maximum concurrent operations.
    #[must_use]
    pub const fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - Required fields are missing
    /// - Connection URL does not use LDAPS
    pub fn build(self) -> LdapResult<LdapConfig> {
        let config = LdapConfig {
            connection_url: self
                .connection_url
                .ok_or_else(|| LdapError::config("connection_url is required"))?,
            bind_dn: self
                .bind_dn
                .ok_or_else(|| LdapError::config("bind_dn is required"))?,
            bind_credential: self
                .bind_credential
                .ok_or_else(|| LdapError::config("bind_credential is required"))?,
            validate_certificates: self.validate_certificates,
            connection_timeout: self.connection_timeout,
            operation_timeout: self.operation_timeout,
            pool_size: self.pool_size,
        };

        config.validate()?;

        Ok(config)
    }
}

/// Serde support for `Duration` as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
