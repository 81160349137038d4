//! Semantic equality of DN collections.
//!
//! Two collections are equal when they denote the same set of directory
//! objects under the directory's case-insensitive matching. DNs that cannot
//! be parsed do not fail the comparison: both sides are then compared as
//! case-folded strings.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::dn::{normalize, normalize_batch, CanonicalDn};
use crate::error::Result;

/// Returns whether two DN collections are semantically equal.
///
/// This is set equality: order and duplicates in the input are irrelevant,
/// except that collections of different length are never equal.
pub fn sets_equal<S: AsRef<str>>(old: &[S], new: &[S]) -> bool {
    match try_sets_equal(old, new) {
        Ok(equal) => equal,
        Err(err) if err.is_recoverable() => {
            warn!(
                error = %err,
                "DN normalization failed, comparing as case-insensitive strings"
            );
            folded_strings(old) == folded_strings(new)
        }
        Err(err) => {
            warn!(error = %err, "DN comparison failed");
            false
        }
    }
}

/// Like [`sets_equal`], but fails on the first DN that cannot be parsed.
///
/// ## Errors
///
/// Returns [`Error::Normalization`](crate::Error::Normalization) naming the
/// malformed DN. Collections of different length are unequal without being
/// parsed.
pub fn try_sets_equal<S: AsRef<str>>(old: &[S], new: &[S]) -> Result<bool> {
    if old.len() != new.len() {
        return Ok(false);
    }
    let old_set = folded_dns(&normalize_batch(old)?);
    let new_set = folded_dns(&normalize_batch(new)?);
    Ok(old_set == new_set)
}

/// Returns whether two single DN values are semantically equal.
pub fn dn_values_equal(old: &str, new: &str) -> bool {
    match (normalize(old), normalize(new)) {
        (Ok(a), Ok(b)) => a.folded() == b.folded(),
        _ => {
            debug!(old, new, "DN not parseable, comparing as case-insensitive strings");
            old.to_lowercase() == new.to_lowercase()
        }
    }
}

fn folded_dns(dns: &[CanonicalDn]) -> BTreeSet<String> {
    dns.iter().map(CanonicalDn::folded).collect()
}

fn folded_strings<S: AsRef<str>>(values: &[S]) -> BTreeSet<String> {
    values.iter().map(|v| v.as_ref().to_lowercase()).collect()
}
