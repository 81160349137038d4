//! Identifier classification.
//!
//! A raw reference from configuration can be written in five formats. The
//! classifier tries them in a fixed precedence (DN, GUID, SID, UPN,
//! `DOMAIN\account`) and the first full match wins. When nothing matches, the
//! error names the first format whose shape was present and what was wrong
//! with it.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dn::DistinguishedName;
use crate::error::{quote_chars, ClassificationError, Defect};
use crate::sid::SecurityIdentifier;

/// Longest NetBIOS domain name.
pub const MAX_NETBIOS_DOMAIN_LENGTH: usize = 15;

/// Longest `sAMAccountName` accepted in a reference.
pub const MAX_ACCOUNT_SEGMENT_LENGTH: usize = 256;

const UPN_LOCAL_FORBIDDEN: &[char] = &['"', '(', ')', ',', ':', ';', '<', '>', '[', ']', '\\'];
const NETBIOS_FORBIDDEN: &[char] = &['/', ':', '*', '?', '"', '<', '>', '|'];
const ACCOUNT_FORBIDDEN: &[char] = &[
    '"', '/', '\\', '[', ']', ':', ';', '|', '=', ',', '+', '*', '?', '<', '>', '@',
];

// ============================================================================
// Formats and values
// ============================================================================

/// The closed set of identifier formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierFormat {
    /// `CN=...,DC=...`
    DistinguishedName,
    /// `550e8400-e29b-41d4-a716-446655440000`
    Guid,
    /// `S-1-5-21-...`
    Sid,
    /// `user@example.com`
    Upn,
    /// `DOMAIN\account`
    DomainQualifiedSam,
}

impl IdentifierFormat {
    /// All formats in classification precedence.
    pub const ALL: [Self; 5] = [
        Self::DistinguishedName,
        Self::Guid,
        Self::Sid,
        Self::Upn,
        Self::DomainQualifiedSam,
    ];

    /// Returns a human readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DistinguishedName => "distinguished name",
            Self::Guid => "GUID",
            Self::Sid => "SID",
            Self::Upn => "user principal name",
            Self::DomainQualifiedSam => "DOMAIN\\account name",
        }
    }
}

impl fmt::Display for IdentifierFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user principal name, `local@domain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserPrincipalName {
    local: String,
    domain: String,
}

impl UserPrincipalName {
    /// Returns the part before `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        &self.local
    }

    /// Returns the part after `@`.
    #[must_use]
    pub fn domain_part(&self) -> &str {
        &self.domain
    }
}

impl fmt::Display for UserPrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

/// A domain-qualified account name, `DOMAIN\account`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainAccount {
    domain: String,
    account: String,
}

impl DomainAccount {
    /// Returns the NetBIOS domain name.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the `sAMAccountName`.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }
}

impl fmt::Display for DomainAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.domain, self.account)
    }
}

/// A classified identifier carrying its parsed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// A distinguished name.
    DistinguishedName(DistinguishedName),
    /// An `objectGUID`.
    Guid(Uuid),
    /// An `objectSid`.
    Sid(SecurityIdentifier),
    /// A `userPrincipalName`.
    Upn(UserPrincipalName),
    /// A `sAMAccountName` qualified by its NetBIOS domain.
    DomainQualifiedSam(DomainAccount),
}

impl Identifier {
    /// Returns the format tag.
    #[must_use]
    pub const fn format(&self) -> IdentifierFormat {
        match self {
            Self::DistinguishedName(_) => IdentifierFormat::DistinguishedName,
            Self::Guid(_) => IdentifierFormat::Guid,
            Self::Sid(_) => IdentifierFormat::Sid,
            Self::Upn(_) => IdentifierFormat::Upn,
            Self::DomainQualifiedSam(_) => IdentifierFormat::DomainQualifiedSam,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DistinguishedName(dn) => write!(f, "{dn}"),
            Self::Guid(guid) => write!(f, "{}", guid.hyphenated()),
            Self::Sid(sid) => write!(f, "{sid}"),
            Self::Upn(upn) => write!(f, "{upn}"),
            Self::DomainQualifiedSam(account) => write!(f, "{account}"),
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

enum Attempt {
    Match(Identifier),
    Defect(Defect),
    NotApplicable,
}

/// Recognizes the five identifier grammars.
///
/// Construct once and share; it holds only immutable compiled grammars.
#[derive(Debug, Clone)]
pub struct IdentifierClassifier {
    guid: Regex,
    dns_label: Regex,
}

impl Default for IdentifierClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierClassifier {
    /// Compiles the grammars.
    #[must_use]
    pub fn new() -> Self {
        Self {
            guid: Regex::new(
                r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$",
            )
            .expect("GUID grammar is a valid regex"),
            dns_label: Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$")
                .expect("DNS label grammar is a valid regex"),
        }
    }

    /// Classifies a raw identifier.
    ///
    /// ## Errors
    ///
    /// Every string that matches none of the grammars is an error; there is
    /// no pass-through for unknown formats.
    pub fn classify(&self, raw: &str) -> Result<Identifier, ClassificationError> {
        if raw.is_empty() {
            return Err(ClassificationError::Empty);
        }

        let mut nearest: Option<(IdentifierFormat, Defect)> = None;
        for format in IdentifierFormat::ALL {
            let attempt = match format {
                IdentifierFormat::DistinguishedName => Self::distinguished_name(raw),
                IdentifierFormat::Guid => self.guid(raw),
                IdentifierFormat::Sid => Self::sid(raw),
                IdentifierFormat::Upn => self.upn(raw),
                IdentifierFormat::DomainQualifiedSam => Self::domain_account(raw),
            };
            match attempt {
                Attempt::Match(identifier) => return Ok(identifier),
                Attempt::Defect(defect) => {
                    nearest.get_or_insert((format, defect));
                }
                Attempt::NotApplicable => {}
            }
        }

        Err(match nearest {
            Some((format, defect)) => ClassificationError::Malformed {
                value: raw.to_string(),
                format,
                defect,
            },
            None => ClassificationError::Unrecognized {
                value: raw.to_string(),
            },
        })
    }

    /// Returns only the format tag of a raw identifier.
    pub fn format_of(&self, raw: &str) -> Result<IdentifierFormat, ClassificationError> {
        self.classify(raw).map(|identifier| identifier.format())
    }

    fn distinguished_name(raw: &str) -> Attempt {
        if !raw.contains('=') {
            return Attempt::NotApplicable;
        }
        match DistinguishedName::parse(raw) {
            Ok(dn) if dn.rdn_count() >= 2 => Attempt::Match(Identifier::DistinguishedName(dn)),
            Ok(_) => Attempt::Defect(Defect::malformed(
                "a single RDN is not a distinguished name; expected components separated by ','",
            )),
            Err(err) => Attempt::Defect(Defect::malformed(format!(
                "{} at offset {}",
                err.reason, err.offset
            ))),
        }
    }

    fn guid(&self, raw: &str) -> Attempt {
        if raw.starts_with('{') && raw.ends_with('}') {
            return Attempt::Defect(Defect::malformed(
                "braced GUIDs are not accepted; use the 36-character hyphenated form",
            ));
        }
        let hex_and_hyphens = raw.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
        if !hex_and_hyphens || !(raw.contains('-') || raw.len() == 32) {
            return Attempt::NotApplicable;
        }

        if self.guid.is_match(raw) {
            return match Uuid::try_parse(raw) {
                Ok(guid) => Attempt::Match(Identifier::Guid(guid)),
                Err(err) => Attempt::Defect(Defect::malformed(err.to_string())),
            };
        }
        if raw.len() != 36 {
            return Attempt::Defect(Defect::BadLength {
                segment: "GUID",
                expected: "exactly 36",
                actual: raw.chars().count(),
            });
        }
        Attempt::Defect(Defect::malformed(
            "hyphens must separate 8-4-4-4-12 hexadecimal digit groups",
        ))
    }

    fn sid(raw: &str) -> Attempt {
        if !(raw.starts_with("S-") || raw.starts_with("s-")) {
            return Attempt::NotApplicable;
        }
        match SecurityIdentifier::parse(raw) {
            Ok(sid) => Attempt::Match(Identifier::Sid(sid)),
            Err(defect) => Attempt::Defect(defect),
        }
    }

    fn upn(&self, raw: &str) -> Attempt {
        let Some((local, domain)) = raw.split_once('@') else {
            return Attempt::NotApplicable;
        };

        if domain.contains('@') {
            return Attempt::Defect(Defect::malformed("expected exactly one '@'"));
        }
        if local.is_empty() {
            return Attempt::Defect(Defect::EmptySegment {
                segment: "local-part",
            });
        }
        if domain.is_empty() {
            return Attempt::Defect(Defect::EmptySegment {
                segment: "domain-part",
            });
        }

        let bad_local: Vec<char> = local
            .chars()
            .filter(|c| c.is_whitespace() || c.is_control() || UPN_LOCAL_FORBIDDEN.contains(c))
            .collect();
        if !bad_local.is_empty() {
            return Attempt::Defect(Defect::InvalidCharacters {
                segment: "local-part",
                chars: quote_chars(bad_local),
            });
        }

        let bad_domain: Vec<char> = domain
            .chars()
            .filter(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
            .collect();
        if !bad_domain.is_empty() {
            return Attempt::Defect(Defect::InvalidCharacters {
                segment: "domain-part",
                chars: quote_chars(bad_domain),
            });
        }
        if !domain.contains('.') {
            return Attempt::Defect(Defect::malformed(
                "domain-part must contain at least one '.'",
            ));
        }
        for label in domain.split('.') {
            if label.is_empty() {
                return Attempt::Defect(Defect::EmptySegment {
                    segment: "domain label",
                });
            }
            if label.len() > 63 {
                return Attempt::Defect(Defect::BadLength {
                    segment: "domain label",
                    expected: "at most 63",
                    actual: label.len(),
                });
            }
            if !self.dns_label.is_match(label) {
                return Attempt::Defect(Defect::malformed(format!(
                    "domain label '{label}' must not start or end with '-'"
                )));
            }
        }

        Attempt::Match(Identifier::Upn(UserPrincipalName {
            local: local.to_string(),
            domain: domain.to_string(),
        }))
    }

    fn domain_account(raw: &str) -> Attempt {
        let Some((domain, account)) = raw.split_once('\\') else {
            return Attempt::NotApplicable;
        };

        if account.contains('\\') {
            return Attempt::Defect(Defect::malformed(
                "expected exactly one '\\' between domain and account",
            ));
        }
        if domain.is_empty() {
            return Attempt::Defect(Defect::EmptySegment { segment: "domain" });
        }
        if account.is_empty() {
            return Attempt::Defect(Defect::EmptySegment {
                segment: "account name",
            });
        }

        let domain_len = domain.chars().count();
        if domain_len > MAX_NETBIOS_DOMAIN_LENGTH {
            return Attempt::Defect(Defect::BadLength {
                segment: "domain",
                expected: "at most 15",
                actual: domain_len,
            });
        }
        let bad_domain: Vec<char> = domain
            .chars()
            .filter(|c| c.is_whitespace() || c.is_control() || NETBIOS_FORBIDDEN.contains(c))
            .collect();
        if !bad_domain.is_empty() {
            return Attempt::Defect(Defect::InvalidCharacters {
                segment: "domain",
                chars: quote_chars(bad_domain),
            });
        }

        let account_len = account.chars().count();
        if account_len > MAX_ACCOUNT_SEGMENT_LENGTH {
            return Attempt::Defect(Defect::BadLength {
                segment: "account name",
                expected: "at most 256",
                actual: account_len,
            });
        }
        let bad_account: Vec<char> = account
            .chars()
            .filter(|c| c.is_control() || ACCOUNT_FORBIDDEN.contains(c))
            .collect();
        if !bad_account.is_empty() {
            return Attempt::Defect(Defect::InvalidCharacters {
                segment: "account name",
                chars: quote_chars(bad_account),
            });
        }

        Attempt::Match(Identifier::DomainQualifiedSam(DomainAccount {
            domain: domain.to_string(),
            account: account.to_string(),
        }))
    }
}
