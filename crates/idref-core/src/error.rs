//! Error taxonomy for the identity-reference engine.
//!
//! Every message names the offending value and the rule it broke, and for
//! length or character-set failures the concrete limit. None of these errors
//! are retryable: they describe input that an operator has to correct.

use thiserror::Error;

use crate::account_name::PrincipalKind;
use crate::identifier::IdentifierFormat;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Any error produced by the pure (no I/O) components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A raw identifier matched none of the supported grammars.
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// A distinguished name could not be parsed.
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// An account name violated its naming policy.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
}

impl Error {
    /// Returns whether callers may recover locally instead of failing.
    ///
    /// Only normalization failures qualify: equality checks fall back to a
    /// plain case-insensitive comparison.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Normalization(_))
    }
}

// ============================================================================
// Classification
// ============================================================================

/// The specific rule an identifier broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Defect {
    /// A required segment is empty.
    #[error("{segment} is empty")]
    EmptySegment {
        /// Name of the empty segment.
        segment: &'static str,
    },

    /// A segment has the wrong length.
    #[error("{segment} is {actual} characters long, expected {expected} characters")]
    BadLength {
        /// Name of the segment.
        segment: &'static str,
        /// Human readable constraint, e.g. `at most 15`.
        expected: &'static str,
        /// Observed length in characters.
        actual: usize,
    },

    /// A segment contains characters outside its character set.
    #[error("{segment} contains invalid characters {chars}")]
    InvalidCharacters {
        /// Name of the segment.
        segment: &'static str,
        /// The offending characters, quoted.
        chars: String,
    },

    /// A numeric component does not fit its field.
    #[error("{segment} value {value} exceeds the maximum of {max}")]
    OutOfRange {
        /// Name of the component.
        segment: &'static str,
        /// The value as written.
        value: String,
        /// Largest accepted value.
        max: u64,
    },

    /// Any other structural problem.
    #[error("{0}")]
    Malformed(String),
}

impl Defect {
    /// Creates a structural defect.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Failure to classify a raw identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// The identifier is the empty string.
    #[error("identifier is empty")]
    Empty,

    /// No grammar applied at all.
    #[error(
        "unrecognized identifier '{value}': expected a distinguished name, GUID, SID, \
         user principal name or DOMAIN\\account name"
    )]
    Unrecognized {
        /// The raw identifier.
        value: String,
    },

    /// The identifier looked like `format` but failed its grammar.
    #[error("invalid {format} '{value}': {defect}")]
    Malformed {
        /// The raw identifier.
        value: String,
        /// The nearest format that was attempted.
        format: IdentifierFormat,
        /// What was wrong with it.
        defect: Defect,
    },
}

impl ClassificationError {
    /// Returns the format that was nearest to matching, if any.
    #[must_use]
    pub const fn attempted_format(&self) -> Option<IdentifierFormat> {
        match self {
            Self::Malformed { format, .. } => Some(*format),
            Self::Empty | Self::Unrecognized { .. } => None,
        }
    }

    /// Returns the specific defect, if any.
    #[must_use]
    pub const fn defect(&self) -> Option<&Defect> {
        match self {
            Self::Malformed { defect, .. } => Some(defect),
            Self::Empty | Self::Unrecognized { .. } => None,
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Structural problem found while parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnDefect {
    /// The input is empty or blank.
    #[error("distinguished name is empty")]
    Empty,

    /// An RDN component is missing (leading, trailing or doubled separator).
    #[error("missing RDN component")]
    MissingComponent,

    /// No `=` after the attribute type.
    #[error("expected '=' after attribute type")]
    MissingEquals,

    /// The attribute type is neither a descriptor nor a numeric OID.
    #[error("invalid attribute type '{0}'")]
    InvalidAttributeType(String),

    /// A backslash escape is incomplete or unknown.
    #[error("invalid escape sequence")]
    InvalidEscape,

    /// A quoted value has no closing quote.
    #[error("unterminated quoted value")]
    UnterminatedQuote,

    /// A `#` value is not an even number of hex digits.
    #[error("invalid hex-encoded value")]
    InvalidHexValue,

    /// Hex escapes decode to bytes that are not UTF-8.
    #[error("escaped bytes are not valid UTF-8")]
    InvalidUtf8,

    /// A character that cannot appear at this position.
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

/// Failure to parse or canonicalize a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed distinguished name '{value}' at offset {offset}: {reason}")]
pub struct NormalizationError {
    /// The DN as supplied.
    pub value: String,
    /// Byte offset where parsing stopped.
    pub offset: usize,
    /// What was wrong.
    pub reason: DnDefect,
}

impl NormalizationError {
    /// Creates a normalization error.
    #[must_use]
    pub fn new(value: impl Into<String>, offset: usize, reason: DnDefect) -> Self {
        Self {
            value: value.into(),
            offset,
            reason,
        }
    }
}

// ============================================================================
// Account-name policy
// ============================================================================

/// An account name that cannot be derived under its policy.
///
/// Terminal: the operator has to supply an explicit account name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// The display name is empty.
    #[error("cannot derive a {kind} account name from an empty display name")]
    Empty {
        /// Principal type the policy applies to.
        kind: PrincipalKind,
    },

    /// The display name is longer than the policy allows.
    #[error(
        "'{value}' is {actual} characters long but {kind} account names are limited to \
         {limit} characters; set the account name explicitly"
    )]
    TooLong {
        /// The display name.
        value: String,
        /// Principal type the policy applies to.
        kind: PrincipalKind,
        /// Character limit of the policy.
        limit: usize,
        /// Observed length in characters.
        actual: usize,
    },

    /// The display name contains characters outside the allowed set.
    #[error(
        "'{value}' contains {invalid}, which are not allowed in account names \
         (allowed: {allowed})"
    )]
    InvalidCharacters {
        /// The display name.
        value: String,
        /// The offending characters, quoted.
        invalid: String,
        /// Description of the allowed set.
        allowed: &'static str,
    },
}

/// Quotes each distinct character once, in order of first appearance.
pub(crate) fn quote_chars(chars: impl IntoIterator<Item = char>) -> String {
    let mut seen = Vec::new();
    for c in chars {
        if !seen.contains(&c) {
            seen.push(c);
        }
    }
    seen.iter()
        .map(|c| format!("'{}'", c.escape_debug()))
        .collect::<Vec<_>>()
        .join(", ")
}
