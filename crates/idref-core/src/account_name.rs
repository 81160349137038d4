//! Plan-time derivation of `sAMAccountName` from a display name.
//!
//! The derived name is the display name verbatim. Nothing is truncated or
//! case-folded: a display name that does not fit the policy is an error and
//! the operator must configure the account name explicitly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{quote_chars, PolicyViolation};

/// Character limit for user and computer account names.
pub const USER_ACCOUNT_NAME_LIMIT: usize = 20;

/// Character limit for group account names.
pub const GROUP_ACCOUNT_NAME_LIMIT: usize = 64;

const ALLOWED_DESCRIPTION: &str = "letters, digits, '.', '_' and '-'";

// ============================================================================
// Principal kinds
// ============================================================================

/// The type of security principal an account name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// A user account.
    User,
    /// A security or distribution group, or an alias.
    Group,
    /// A computer (machine) account.
    Computer,
    /// Trust accounts and anything unrecognized.
    Other,
}

impl PrincipalKind {
    /// Maps an Active Directory `sAMAccountType` value.
    #[must_use]
    pub const fn from_sam_account_type(value: u32) -> Self {
        match value {
            0x1000_0000..=0x1000_0001 | 0x2000_0000..=0x2000_0001 => Self::Group,
            0x3000_0000 => Self::User,
            0x3000_0001 => Self::Computer,
            _ => Self::Other,
        }
    }

    /// Returns the lower-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Computer => "computer",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Length and character-set constraints for one principal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountNamePolicy {
    kind: PrincipalKind,
    character_limit: usize,
}

impl AccountNamePolicy {
    /// The 20-character user policy.
    #[must_use]
    pub const fn user() -> Self {
        Self {
            kind: PrincipalKind::User,
            character_limit: USER_ACCOUNT_NAME_LIMIT,
        }
    }

    /// The 64-character group policy.
    #[must_use]
    pub const fn group() -> Self {
        Self {
            kind: PrincipalKind::Group,
            character_limit: GROUP_ACCOUNT_NAME_LIMIT,
        }
    }

    /// Selects the policy for a principal kind. Computers and unknown kinds
    /// get the user limit.
    #[must_use]
    pub const fn for_kind(kind: PrincipalKind) -> Self {
        match kind {
            PrincipalKind::Group => Self::group(),
            PrincipalKind::User | PrincipalKind::Computer | PrincipalKind::Other => Self {
                kind,
                character_limit: USER_ACCOUNT_NAME_LIMIT,
            },
        }
    }

    /// Returns the principal kind.
    #[must_use]
    pub const fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Returns the maximum length in characters.
    #[must_use]
    pub const fn character_limit(&self) -> usize {
        self.character_limit
    }

    /// Returns whether `c` is in `[A-Za-z0-9._-]`.
    #[must_use]
    pub const fn allows(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
    }
}

// ============================================================================
// Deferred values
// ============================================================================

/// A plan-time value that may not be known yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Planned<T> {
    /// The value is known.
    Known(T),
    /// The value will be computed later in the plan.
    Pending,
    /// No value was configured.
    #[default]
    Absent,
}

impl<T> Planned<T> {
    /// Returns the known value, if any.
    #[must_use]
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Pending | Self::Absent => None,
        }
    }

    /// Borrows the inner value.
    #[must_use]
    pub const fn as_ref(&self) -> Planned<&T> {
        match self {
            Self::Known(value) => Planned::Known(value),
            Self::Pending => Planned::Pending,
            Self::Absent => Planned::Absent,
        }
    }

    /// Maps a known value, keeping `Pending` and `Absent`.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Planned<U> {
        match self {
            Self::Known(value) => Planned::Known(f(value)),
            Self::Pending => Planned::Pending,
            Self::Absent => Planned::Absent,
        }
    }

    /// Returns true for `Pending`.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl<T> From<Option<T>> for Planned<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Known)
    }
}

// ============================================================================
// Derivation
// ============================================================================

/// Derives an account name from a known display name.
///
/// ## Errors
///
/// Fails if the display name is empty, longer than the policy limit, or
/// contains characters outside `[A-Za-z0-9._-]`.
pub fn derive_account_name(
    display_name: &str,
    policy: &AccountNamePolicy,
) -> Result<String, PolicyViolation> {
    if display_name.is_empty() {
        return Err(PolicyViolation::Empty { kind: policy.kind });
    }

    let actual = display_name.chars().count();
    if actual > policy.character_limit {
        return Err(PolicyViolation::TooLong {
            value: display_name.to_string(),
            kind: policy.kind,
            limit: policy.character_limit,
            actual,
        });
    }

    let invalid: Vec<char> = display_name.chars().filter(|c| !policy.allows(*c)).collect();
    if !invalid.is_empty() {
        return Err(PolicyViolation::InvalidCharacters {
            value: display_name.to_string(),
            invalid: quote_chars(invalid),
            allowed: ALLOWED_DESCRIPTION,
        });
    }

    Ok(display_name.to_string())
}

/// Decides the planned account name.
///
/// An explicitly configured name passes through untouched and a pending one
/// stays pending. Otherwise the name is derived from the display name, or
/// deferred while the display name is itself pending.
pub fn plan_account_name(
    configured: Planned<String>,
    display_name: Planned<String>,
    policy: &AccountNamePolicy,
) -> Result<Planned<String>, PolicyViolation> {
    match (configured, display_name) {
        (Planned::Known(name), _) => Ok(Planned::Known(name)),
        (Planned::Pending, _) | (Planned::Absent, Planned::Pending) => Ok(Planned::Pending),
        (Planned::Absent, Planned::Absent) => Ok(Planned::Absent),
        (Planned::Absent, Planned::Known(display)) => {
            derive_account_name(&display, policy).map(Planned::Known)
        }
    }
}
