//! LDAP connection pool management.
//!
//! ## Security Requirements
//!
//! All connections use LDAPS (TLS from connection start).
//! STARTTLS is NOT supported.

use std::sync::Arc;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::LdapConfig;
use crate::error::{LdapError, LdapResult};

/// Bounded access to one bound, multiplexed LDAPS connection.
///
/// `ldap3` multiplexes operations over a single connection, so handles are
/// clones of one cached [`Ldap`]. The semaphore bounds concurrent
/// operations to `pool_size`. A connection-level failure drops the cached
/// handle and the next checkout reconnects.
pub struct LdapConnectionPool {
    config: Arc<LdapConfig>,
    semaphore: Arc<Semaphore>,
    connection: Mutex<Option<Ldap>>,
}

impl LdapConnectionPool {
    /// Creates a new connection pool. No connection is opened until first use.
    #[must_use]
    pub fn new(config: LdapConfig) -> Self {
        let size = config.pool_size;
        Self {
            config: Arc::new(config),
            semaphore: Arc::new(Semaphore::new(size)),
            connection: Mutex::new(None),
        }
    }

    /// Checks out a connection handle.
    ///
    /// The permit is released when the handle is dropped.
    pub async fn get(&self) -> LdapResult<LdapConnection> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LdapError::PoolClosed)?;

        let mut guard = self.connection.lock().await;
        let ldap = match guard.as_ref() {
            Some(ldap) => ldap.clone(),
            None => {
                let ldap = self.create_connection().await?;
                *guard = Some(ldap.clone());
                ldap
            }
        };

        Ok(LdapConnection {
            ldap,
            _permit: permit,
        })
    }

    /// Drops the cached connection so the next checkout reconnects.
    pub async fn invalidate(&self) {
        if self.connection.lock().await.take().is_some() {
            debug!("discarded cached LDAP connection");
        }
    }

    /// Returns the number of operations that may start right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    async fn create_connection(&self) -> LdapResult<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.connection_timeout)
            .set_no_tls_verify(!self.config.validate_certificates);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.connection_url)
            .await
            .map_err(|e| LdapError::connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_failed = |reason: String| LdapError::Bind {
            bind_dn: self.config.bind_dn.clone(),
            reason,
        };
        ldap.simple_bind(&self.config.bind_dn, &self.config.bind_credential)
            .await
            .map_err(|e| bind_failed(e.to_string()))?
            .success()
            .map_err(|e| bind_failed(e.to_string()))?;

        debug!(url = %self.config.connection_url, "LDAP connection established");
        Ok(ldap)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }
}

/// A checked-out connection handle.
pub struct LdapConnection {
    ldap: Ldap,
    _permit: OwnedSemaphorePermit,
}

impl LdapConnection {
    /// Returns a mutable reference to the LDAP handle.
    pub fn ldap_mut(&mut self) -> &mut Ldap {
        &mut self.ldap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_creation() {
        let config = LdapConfig::builder()
            .connection_url("ldaps://dc01.example.com:636")
            .bind_dn("cn=svc,dc=example,dc=com")
            .bind_credential("password")
            .pool_size(5)
            .build()
            .unwrap();

        let pool = LdapConnectionPool::new(config);
        assert_eq!(pool.config().pool_size, 5);
        assert_eq!(pool.available(), 5);
    }

    #[tokio::test]
    async fn invalidate_without_connection_is_a_no_op() {
        let config = LdapConfig::builder()
            .connection_url("ldaps://dc01.example.com:636")
            .bind_dn("cn=svc,dc=example,dc=com")
            .bind_credential("password")
            .build()
            .unwrap();

        let pool = LdapConnectionPool::new(config);
        pool.invalidate().await;
        assert_eq!(pool.available(), pool.config().pool_size);
    }
}
