//! `DirectorySearch` over LDAPS.

use async_trait::async_trait;
use idref_directory::{
    DirectoryRecord, DirectoryResult, DirectorySearch, SearchScope, RECORD_ATTRIBUTES,
};
use ldap3::{Scope, SearchEntry};
use tracing::{debug, instrument, warn};

use crate::config::LdapConfig;
use crate::connection::LdapConnectionPool;
use crate::error::{LdapError, LdapResult};
use crate::search::LdapEntry;

/// Converts a search scope to its `ldap3` counterpart.
#[must_use]
pub const fn to_ldap3(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

/// An LDAP directory.
pub struct LdapDirectory {
    pool: LdapConnectionPool,
}

impl LdapDirectory {
    /// Creates a directory client.
    ///
    /// ## Errors
    ///
    /// Returns an error if the configuration is invalid or not LDAPS.
    pub fn new(config: LdapConfig) -> LdapResult<Self> {
        config.validate()?;
        Ok(Self {
            pool: LdapConnectionPool::new(config),
        })
    }

    /// Creates a directory client from `IDREF_LDAP_*` environment variables.
    pub fn from_env() -> LdapResult<Self> {
        Self::new(LdapConfig::from_env()?)
    }

    /// Returns the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &LdapConnectionPool {
        &self.pool
    }

    /// Verifies connectivity by reading the base entry.
    pub async fn test_connection(&self, base_dn: &str) -> LdapResult<()> {
        self.search_entries(base_dn, "(objectClass=*)", SearchScope::Base)
            .await
            .map(|_| ())
    }

    async fn search_entries(
        &self,
        base_dn: &str,
        filter: &str,
        scope: SearchScope,
    ) -> LdapResult<Vec<LdapEntry>> {
        let result = self.run_search(base_dn, filter, scope).await;
        if let Err(err) = &result {
            if err.is_connection_error() {
                self.pool.invalidate().await;
            }
        }
        result
    }

    async fn run_search(
        &self,
        base_dn: &str,
        filter: &str,
        scope: SearchScope,
    ) -> LdapResult<Vec<LdapEntry>> {
        let timeout = self.pool.config().operation_timeout;
        let mut conn = self.pool.get().await?;

        let search = conn
            .ldap_mut()
            .search(base_dn, to_ldap3(scope), filter, RECORD_ATTRIBUTES.to_vec());
        let (rs, _result) = tokio::time::timeout(timeout, search)
            .await
            .map_err(|_| LdapError::Timeout(timeout))??
            .success()
            .map_err(|e| LdapError::Search {
                base_dn: base_dn.to_string(),
                filter: filter.to_string(),
                reason: e.to_string(),
            })?;

        Ok(rs
            .into_iter()
            .map(SearchEntry::construct)
            .map(LdapEntry::from_search_entry)
            .collect())
    }
}

#[async_trait]
impl DirectorySearch for LdapDirectory {
    #[instrument(skip(self), level = "debug")]
    async fn search(
        &self,
        base_dn: &str,
        filter: &str,
        scope: SearchScope,
    ) -> DirectoryResult<Vec<DirectoryRecord>> {
        match self.search_entries(base_dn, filter, scope).await {
            Ok(entries) => {
                debug!(entries = entries.len(), "LDAP search complete");
                Ok(entries.into_iter().map(LdapEntry::into_record).collect())
            }
            Err(err) => {
                warn!(error = %err, "LDAP search failed");
                Err(err.into())
            }
        }
    }
}
