//! Batch resolution of raw identifiers to canonical DNs.
//!
//! Identifiers are grouped by format and each group costs one directory
//! query, so a batch never needs more than four round trips. Identifiers
//! given as DNs are only canonicalized. Queries run concurrently and the
//! call returns once all of them have completed.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use idref_core::{
    CanonicalDn, DistinguishedName, Identifier, IdentifierClassifier, IdentifierFormat,
    MembershipSet,
};
use tracing::{debug, instrument, warn};

use crate::config::ResolverConfig;
use crate::error::{DirectoryError, DirectoryResult, ResolutionError};
use crate::filter::{any_of, assertion_value, lookup_attribute};
use crate::result::{ResolutionEntry, ResolutionResult, ResolvedReference};
use crate::search::{DirectoryRecord, DirectorySearch};

/// A returned record and its parsed DN, or why the DN was rejected.
///
/// A malformed DN fails only the identifiers its record matches.
struct Candidate {
    record: DirectoryRecord,
    dn: Result<ParsedDn, Arc<DirectoryError>>,
}

struct ParsedDn {
    dn: DistinguishedName,
    canonical: CanonicalDn,
}

impl From<DirectoryRecord> for Candidate {
    fn from(record: DirectoryRecord) -> Self {
        let dn = match DistinguishedName::parse(&record.distinguished_name) {
            Ok(dn) => Ok(ParsedDn {
                canonical: dn.to_canonical(),
                dn,
            }),
            Err(err) => {
                warn!(
                    dn = %record.distinguished_name,
                    error = %err,
                    "directory returned a malformed DN"
                );
                Err(Arc::new(DirectoryError::invalid_record(err.to_string())))
            }
        };
        Self { record, dn }
    }
}

enum Classified {
    Done(Result<ResolvedReference, ResolutionError>),
    Lookup(Identifier),
}

type GroupResponse = Result<Vec<Candidate>, Arc<DirectoryError>>;

/// Resolves batches of identifiers against a directory.
pub struct BatchResolver<D> {
    directory: D,
    config: ResolverConfig,
    classifier: IdentifierClassifier,
}

impl<D: DirectorySearch> BatchResolver<D> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(directory: D, config: ResolverConfig) -> Self {
        Self::with_classifier(directory, config, IdentifierClassifier::new())
    }

    /// Creates a resolver sharing an existing classifier.
    #[must_use]
    pub const fn with_classifier(
        directory: D,
        config: ResolverConfig,
        classifier: IdentifierClassifier,
    ) -> Self {
        Self {
            directory,
            config,
            classifier,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns the directory.
    #[must_use]
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    /// Resolves every identifier.
    ///
    /// The result has one entry per input, in input order. Failures are
    /// per entry; a failed directory query fails every identifier of that
    /// format.
    #[instrument(skip_all, fields(count = raws.len()))]
    pub async fn resolve<S: AsRef<str> + Sync>(&self, raws: &[S]) -> ResolutionResult {
        let classified: Vec<Classified> = raws
            .iter()
            .map(|raw| self.classify(raw.as_ref()))
            .collect();

        let mut groups: BTreeMap<IdentifierFormat, Vec<&Identifier>> = BTreeMap::new();
        for item in &classified {
            if let Classified::Lookup(identifier) = item {
                groups.entry(identifier.format()).or_default().push(identifier);
            }
        }

        let responses = join_all(
            groups
                .iter()
                .map(|(format, identifiers)| self.query(*format, identifiers)),
        )
        .await;
        let query_count = responses.len();

        let responses: BTreeMap<IdentifierFormat, GroupResponse> = groups
            .keys()
            .copied()
            .zip(responses)
            .map(|(format, response)| {
                let response = response.map_err(|err| {
                    warn!(%format, error = %err, "directory lookup failed for format group");
                    Arc::new(err)
                });
                (format, response)
            })
            .collect();

        let entries = raws
            .iter()
            .zip(classified)
            .map(|(raw, item)| {
                let raw = raw.as_ref();
                let outcome = match item {
                    Classified::Done(outcome) => outcome,
                    Classified::Lookup(identifier) => {
                        self.match_identifier(raw, &identifier, responses.get(&identifier.format()))
                    }
                };
                ResolutionEntry {
                    raw: raw.to_string(),
                    outcome,
                }
            })
            .collect();

        debug!(queries = query_count, "resolution complete");
        ResolutionResult::new(entries, query_count)
    }

    /// Resolves every identifier into a membership set.
    ///
    /// ## Errors
    ///
    /// Returns the first failure; nothing is returned for a partial batch.
    pub async fn resolve_membership<S: AsRef<str> + Sync>(
        &self,
        raws: &[S],
    ) -> Result<MembershipSet, ResolutionError> {
        self.resolve(raws).await.into_membership_set()
    }

    fn classify(&self, raw: &str) -> Classified {
        match self.classifier.classify(raw) {
            Err(err) => Classified::Done(Err(err.into())),
            Ok(Identifier::DistinguishedName(dn)) => Classified::Done(Ok(ResolvedReference {
                dn: dn.to_canonical(),
                kind: None,
            })),
            Ok(identifier) => Classified::Lookup(identifier),
        }
    }

    async fn query(
        &self,
        format: IdentifierFormat,
        identifiers: &[&Identifier],
    ) -> DirectoryResult<Vec<Candidate>> {
        let attribute = lookup_attribute(format)
            .ok_or_else(|| DirectoryError::Internal(format!("no lookup attribute for {format}")))?;
        let values: Vec<String> = identifiers
            .iter()
            .filter_map(|identifier| assertion_value(identifier))
            .collect();
        let filter = any_of(attribute, &values)
            .ok_or_else(|| DirectoryError::Internal(format!("empty {format} lookup")))?;

        debug!(%format, %filter, base_dn = %self.config.base_dn, "searching directory");
        let records = self
            .directory
            .search(self.config.base_dn.as_str(), &filter, self.config.scope)
            .await?;
        debug!(%format, records = records.len(), "directory returned records");

        Ok(records.into_iter().map(Candidate::from).collect())
    }

    fn match_identifier(
        &self,
        raw: &str,
        identifier: &Identifier,
        response: Option<&GroupResponse>,
    ) -> Result<ResolvedReference, ResolutionError> {
        let format = identifier.format();
        let candidates = match response {
            Some(Ok(candidates)) => candidates,
            Some(Err(err)) => {
                return Err(ResolutionError::DirectoryFailure {
                    value: raw.to_string(),
                    format,
                    source: Arc::clone(err),
                })
            }
            None => {
                return Err(ResolutionError::DirectoryFailure {
                    value: raw.to_string(),
                    format,
                    source: Arc::new(DirectoryError::Internal(format!(
                        "no query was issued for {format}"
                    ))),
                })
            }
        };

        let mut matched: BTreeMap<String, (&CanonicalDn, &DirectoryRecord)> = BTreeMap::new();
        for candidate in candidates.iter().filter(|c| self.matches(identifier, c)) {
            match &candidate.dn {
                Ok(parsed) => {
                    matched
                        .entry(parsed.canonical.folded())
                        .or_insert((&parsed.canonical, &candidate.record));
                }
                Err(err) => {
                    return Err(ResolutionError::DirectoryFailure {
                        value: raw.to_string(),
                        format,
                        source: Arc::clone(err),
                    })
                }
            }
        }

        let mut matched = matched.into_values();
        match (matched.next(), matched.len()) {
            (None, _) => Err(ResolutionError::not_found(raw, format)),
            (Some((dn, record)), 0) => Ok(ResolvedReference {
                dn: dn.clone(),
                kind: record.principal_kind(),
            }),
            (Some(first), _) => Err(ResolutionError::Ambiguous {
                value: raw.to_string(),
                format,
                candidates: std::iter::once(first)
                    .chain(matched)
                    .map(|(dn, _)| dn.clone())
                    .collect(),
            }),
        }
    }

    /// A record whose DN could not be parsed cannot be placed in a domain,
    /// so it matches any `DOMAIN\account` with the same account name.
    fn matches(&self, identifier: &Identifier, candidate: &Candidate) -> bool {
        let record = &candidate.record;
        match identifier {
            Identifier::DistinguishedName(_) => false,
            Identifier::Guid(guid) => record.object_guid == Some(*guid),
            Identifier::Sid(sid) => record.object_sid.as_ref() == Some(sid),
            Identifier::Upn(upn) => record
                .user_principal_name
                .as_deref()
                .is_some_and(|value| eq_folded(value, &upn.to_string())),
            Identifier::DomainQualifiedSam(account) => {
                record
                    .sam_account_name
                    .as_deref()
                    .is_some_and(|value| eq_folded(value, account.account()))
                    && candidate.dn.as_ref().map_or(true, |parsed| {
                        self.config.in_domain(account.domain(), &parsed.dn)
                    })
            }
        }
    }
}

fn eq_folded(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
