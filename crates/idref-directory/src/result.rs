//! Batch resolution results.

use idref_core::{CanonicalDn, MembershipSet, PrincipalKind};

use crate::error::ResolutionError;

/// A successfully resolved identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// The canonical DN of the referenced object.
    pub dn: CanonicalDn,
    /// Principal kind reported by the directory; `None` for identifiers
    /// given as DNs, which are not looked up.
    pub kind: Option<PrincipalKind>,
}

/// Outcome for one input position.
#[derive(Debug, Clone)]
pub struct ResolutionEntry {
    /// The identifier as supplied.
    pub raw: String,
    /// Resolved reference or typed failure.
    pub outcome: Result<ResolvedReference, ResolutionError>,
}

/// One entry per input identifier, in input order.
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    entries: Vec<ResolutionEntry>,
    query_count: usize,
}

impl ResolutionResult {
    pub(crate) fn new(entries: Vec<ResolutionEntry>, query_count: usize) -> Self {
        Self {
            entries,
            query_count,
        }
    }

    /// Returns the number of entries (equal to the number of inputs).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there were no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of directory queries issued.
    #[must_use]
    pub const fn query_count(&self) -> usize {
        self.query_count
    }

    /// Iterates entries in input order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolutionEntry> {
        self.entries.iter()
    }

    /// Returns the outcome for the first input equal to `raw`.
    #[must_use]
    pub fn get(&self, raw: &str) -> Option<&Result<ResolvedReference, ResolutionError>> {
        self.entries
            .iter()
            .find(|entry| entry.raw == raw)
            .map(|entry| &entry.outcome)
    }

    /// Returns the canonical DN for `raw`, if it resolved.
    #[must_use]
    pub fn dn(&self, raw: &str) -> Option<&CanonicalDn> {
        self.get(raw)
            .and_then(|outcome| outcome.as_ref().ok())
            .map(|resolved| &resolved.dn)
    }

    /// Iterates over failed inputs.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ResolutionError)> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            Ok(_) => None,
            Err(err) => Some((entry.raw.as_str(), err)),
        })
    }

    /// Returns true if every input resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|entry| entry.outcome.is_ok())
    }

    /// Collects the resolved DNs.
    ///
    /// ## Errors
    ///
    /// Returns the first failure; a partially resolved batch is never a set.
    pub fn into_membership_set(self) -> Result<MembershipSet, ResolutionError> {
        self.entries
            .into_iter()
            .map(|entry| entry.outcome.map(|resolved| resolved.dn))
            .collect()
    }
}

impl IntoIterator for ResolutionResult {
    type Item = ResolutionEntry;
    type IntoIter = std::vec::IntoIter<ResolutionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
