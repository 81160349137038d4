//! The directory search seam.
//!
//! The resolver needs exactly one capability from a directory:
//! `search(base DN, filter, scope)` returning records that carry the five
//! identifying attributes.

use std::sync::Arc;

use async_trait::async_trait;
use idref_core::{PrincipalKind, SecurityIdentifier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DirectoryResult;

/// Attributes requested from the directory for every lookup.
pub const RECORD_ATTRIBUTES: [&str; 5] = [
    "objectGUID",
    "objectSid",
    "userPrincipalName",
    "sAMAccountName",
    "sAMAccountType",
];

/// LDAP search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchScope {
    /// Search only the base DN.
    Base,
    /// Search one level below the base DN.
    OneLevel,
    /// Search the entire subtree.
    #[default]
    Subtree,
}

/// One directory object as returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// `distinguishedName` as returned by the server.
    pub distinguished_name: String,
    /// Decoded `objectGUID`.
    pub object_guid: Option<Uuid>,
    /// Decoded `objectSid`.
    pub object_sid: Option<SecurityIdentifier>,
    /// `userPrincipalName`.
    pub user_principal_name: Option<String>,
    /// `sAMAccountName`.
    pub sam_account_name: Option<String>,
    /// `sAMAccountType`.
    pub sam_account_type: Option<u32>,
}

impl DirectoryRecord {
    /// Creates a record with only a DN.
    #[must_use]
    pub fn new(distinguished_name: impl Into<String>) -> Self {
        Self {
            distinguished_name: distinguished_name.into(),
            ..Self::default()
        }
    }

    /// Sets the GUID.
    #[must_use]
    pub const fn with_guid(mut self, guid: Uuid) -> Self {
        self.object_guid = Some(guid);
        self
    }

    /// Sets the SID.
    #[must_use]
    pub fn with_sid(mut self, sid: SecurityIdentifier) -> Self {
        self.object_sid = Some(sid);
        self
    }

    /// Sets the user principal name.
    #[must_use]
    pub fn with_upn(mut self, upn: impl Into<String>) -> Self {
        self.user_principal_name = Some(upn.into());
        self
    }

    /// Sets the account name.
    #[must_use]
    pub fn with_sam_account_name(mut self, name: impl Into<String>) -> Self {
        self.sam_account_name = Some(name.into());
        self
    }

    /// Sets the account type.
    #[must_use]
    pub const fn with_sam_account_type(mut self, account_type: u32) -> Self {
        self.sam_account_type = Some(account_type);
        self
    }

    /// Returns the principal kind derived from `sAMAccountType`.
    #[must_use]
    pub fn principal_kind(&self) -> Option<PrincipalKind> {
        self.sam_account_type
            .map(PrincipalKind::from_sam_account_type)
    }
}

/// A directory that can be searched.
///
/// Implementations must be thread-safe; the resolver issues one search per
/// identifier format concurrently.
#[async_trait]
pub trait DirectorySearch: Send + Sync {
    /// Runs a search and returns every matching record.
    async fn search(
        &self,
        base_dn: &str,
        filter: &str,
        scope: SearchScope,
    ) -> DirectoryResult<Vec<DirectoryRecord>>;
}

#[async_trait]
impl<T: DirectorySearch + ?Sized> DirectorySearch for Arc<T> {
    async fn search(
        &self,
        base_dn: &str,
        filter: &str,
        scope: SearchScope,
    ) -> DirectoryResult<Vec<DirectoryRecord>> {
        (**self).search(base_dn, filter, scope).await
    }
}
