//! # idref-core
//!
//! Identity-reference engine for directory reconciliation.
//!
//! Directory members and cross-references arrive in five formats
//! (distinguished name, GUID, SID, user principal name and `DOMAIN\account`).
//! This crate classifies them, canonicalizes distinguished names and decides
//! whether two collections of references are semantically equal. Nothing
//! here performs I/O; resolution against a directory lives in
//! `idref-directory`.
//!
//! ## Modules
//!
//! - [`identifier`] - Classifier for the five identifier grammars
//! - [`dn`] - DN parser and normalizer
//! - [`equality`] - Case-insensitive set equality with string fallback
//! - [`membership`] - Membership sets and diffs
//! - [`account_name`] - Plan-time `sAMAccountName` derivation
//! - [`guid`], [`sid`] - Binary attribute codecs
//!
//! ## Example
//!
//! ```
//! use idref_core::{sets_equal, IdentifierClassifier, IdentifierFormat};
//!
//! let classifier = IdentifierClassifier::new();
//! let id = classifier.classify("S-1-5-21-123456789-123456789-123456789-1001").unwrap();
//! assert_eq!(id.format(), IdentifierFormat::Sid);
//!
//! assert!(sets_equal(
//!     &["CN=Test,DC=example,DC=com"],
//!     &["cn=test,dc=example,dc=com"],
//! ));
//! ```

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod account_name;
pub mod dn;
pub mod equality;
pub mod error;
pub mod guid;
pub mod identifier;
pub mod membership;
pub mod sid;

pub use account_name::{
    derive_account_name, plan_account_name, AccountNamePolicy, Planned, PrincipalKind,
};
pub use dn::{normalize, normalize_batch, CanonicalDn, DistinguishedName};
pub use equality::{dn_values_equal, sets_equal, try_sets_equal};
pub use error::{
    ClassificationError, Defect, DnDefect, Error, NormalizationError, PolicyViolation, Result,
};
pub use identifier::{
    DomainAccount, Identifier, IdentifierClassifier, IdentifierFormat, UserPrincipalName,
};
pub use membership::{MembershipDiff, MembershipSet};
pub use sid::SecurityIdentifier;
