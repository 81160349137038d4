//! Membership sets and the changes between them.

use std::collections::btree_map::{BTreeMap, Entry};

use serde::{Deserialize, Serialize};

use crate::dn::{normalize, CanonicalDn};
use crate::error::NormalizationError;

/// A deduplicated, case-insensitive set of canonical DNs.
///
/// The first spelling inserted for a DN is the one kept. Serializes as a
/// plain array of DN strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CanonicalDn>", into = "Vec<CanonicalDn>")]
pub struct MembershipSet {
    entries: BTreeMap<String, CanonicalDn>,
}

impl MembershipSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes and collects raw DN strings.
    pub fn from_raw<I, S>(dns: I) -> Result<Self, NormalizationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for dn in dns {
            set.insert(normalize(dn.as_ref())?);
        }
        Ok(set)
    }

    /// Inserts a DN, returning false if an equal DN was already present.
    pub fn insert(&mut self, dn: CanonicalDn) -> bool {
        match self.entries.entry(dn.folded()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(dn);
                true
            }
        }
    }

    /// Returns whether the set holds a DN equal to `dn`, ignoring case.
    #[must_use]
    pub fn contains(&self, dn: &CanonicalDn) -> bool {
        self.entries.contains_key(&dn.folded())
    }

    /// Returns the number of distinct DNs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in folded order.
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalDn> {
        self.entries.values()
    }

    /// Returns true if both sets hold the same DNs, ignoring case.
    #[must_use]
    pub fn same_members(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.keys().all(|key| other.entries.contains_key(key))
    }

    /// Computes the changes that turn `observed` into `desired`.
    #[must_use]
    pub fn diff(desired: &Self, observed: &Self) -> MembershipDiff {
        MembershipDiff {
            to_add: desired.missing_from(observed),
            to_remove: observed.missing_from(desired),
        }
    }

    fn missing_from(&self, other: &Self) -> Vec<CanonicalDn> {
        self.entries
            .iter()
            .filter(|(key, _)| !other.entries.contains_key(*key))
            .map(|(_, dn)| dn.clone())
            .collect()
    }
}

impl FromIterator<CanonicalDn> for MembershipSet {
    fn from_iter<T: IntoIterator<Item = CanonicalDn>>(iter: T) -> Self {
        let mut set = Self::new();
        for dn in iter {
            set.insert(dn);
        }
        set
    }
}

impl Extend<CanonicalDn> for MembershipSet {
    fn extend<T: IntoIterator<Item = CanonicalDn>>(&mut self, iter: T) {
        for dn in iter {
            self.insert(dn);
        }
    }
}

impl From<Vec<CanonicalDn>> for MembershipSet {
    fn from(dns: Vec<CanonicalDn>) -> Self {
        dns.into_iter().collect()
    }
}

impl From<MembershipSet> for Vec<CanonicalDn> {
    fn from(set: MembershipSet) -> Self {
        set.entries.into_values().collect()
    }
}

impl IntoIterator for MembershipSet {
    type Item = CanonicalDn;
    type IntoIter = std::collections::btree_map::IntoValues<String, CanonicalDn>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

/// Members to add and remove, each sorted by folded DN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDiff {
    /// Desired but not observed.
    pub to_add: Vec<CanonicalDn>,
    /// Observed but not desired.
    pub to_remove: Vec<CanonicalDn>,
}

impl MembershipDiff {
    /// Returns true when there is nothing to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
