//! Resolver configuration.

use std::collections::BTreeMap;

use idref_core::{normalize, CanonicalDn, DistinguishedName};
use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};
use crate::search::SearchScope;

/// Where and how the resolver searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Base DN for every lookup.
    pub base_dn: CanonicalDn,

    /// Search scope below the base DN.
    #[serde(default)]
    pub scope: SearchScope,

    /// NetBIOS domain name to domain-context DN, used to qualify
    /// `DOMAIN\account` lookups.
    #[serde(default)]
    pub domain_contexts: BTreeMap<String, CanonicalDn>,
}

impl ResolverConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::new()
    }

    /// Returns the domain-context DN configured for a NetBIOS name.
    #[must_use]
    pub fn domain_context(&self, netbios: &str) -> Option<&CanonicalDn> {
        self.domain_contexts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(netbios))
            .map(|(_, dn)| dn)
    }

    /// Returns whether `dn` lies inside the domain named `netbios`.
    ///
    /// With a configured domain context the DN must be at or below it.
    /// Otherwise the left-most `dc` component must equal the NetBIOS name.
    #[must_use]
    pub fn in_domain(&self, netbios: &str, dn: &DistinguishedName) -> bool {
        match self.domain_context(netbios) {
            Some(context) => context
                .to_dn()
                .is_ok_and(|context| dn.is_descendant_of(&context)),
            None => dn
                .first_value_of("dc")
                .is_some_and(|dc| dc.to_lowercase() == netbios.to_lowercase()),
        }
    }
}

/// Builder for [`ResolverConfig`].
#[derive(Debug, Default)]
pub struct ResolverConfigBuilder {
    base_dn: Option<String>,
    scope: SearchScope,
    domain_contexts: Vec<(String, String)>,
}

impl ResolverConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base DN.
    #[must_use]
    pub fn base_dn(mut self, dn: impl Into<String>) -> Self {
        self.base_dn = Some(dn.into());
        self
    }

    /// Sets the search scope.
    #[must_use]
    pub const fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Maps a NetBIOS domain name to its domain-context DN.
    #[must_use]
    pub fn domain_context(mut self, netbios: impl Into<String>, dn: impl Into<String>) -> Self {
        self.domain_contexts.push((netbios.into(), dn.into()));
        self
    }

    /// Builds and validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if the base DN is missing or any DN is malformed.
    pub fn build(self) -> DirectoryResult<ResolverConfig> {
        let base_dn = self
            .base_dn
            .ok_or_else(|| DirectoryError::config("base_dn is required"))?;
        let base_dn = normalize(&base_dn)
            .map_err(|e| DirectoryError::config(format!("base_dn: {e}")))?;

        let mut domain_contexts = BTreeMap::new();
        for (netbios, dn) in self.domain_contexts {
            if netbios.is_empty() {
                return Err(DirectoryError::config("domain context name cannot be empty"));
            }
            let dn = normalize(&dn).map_err(|e| {
                DirectoryError::config(format!("domain context for {netbios}: {e}"))
            })?;
            domain_contexts.insert(netbios.to_uppercase(), dn);
        }

        Ok(ResolverConfig {
            base_dn,
            scope: self.scope,
            domain_contexts,
        })
    }
}
