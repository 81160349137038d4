//! Security Identifiers.
//!
//! String form: `S-1-<authority>-<subauthority>[-<subauthority>...]`.
//! Binary form (as stored in `objectSid`): revision byte, subauthority count,
//! 48-bit big-endian identifier authority, then little-endian 32-bit
//! subauthorities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{quote_chars, Defect};

/// Largest identifier authority (48 bits).
pub const MAX_AUTHORITY: u64 = (1 << 48) - 1;

/// A parsed Security Identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecurityIdentifier {
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl SecurityIdentifier {
    /// Creates a SID from its parts.
    ///
    /// Returns `None` if `sub_authorities` is empty or `authority` exceeds 48 bits.
    #[must_use]
    pub fn new(authority: u64, sub_authorities: Vec<u32>) -> Option<Self> {
        if sub_authorities.is_empty() || authority > MAX_AUTHORITY {
            return None;
        }
        Some(Self {
            authority,
            sub_authorities,
        })
    }

    /// Parses the string form, reporting the specific defect on failure.
    pub fn parse(s: &str) -> Result<Self, Defect> {
        let mut parts = s.split('-');

        match parts.next() {
            Some("S") | Some("s") => {}
            _ => return Err(Defect::malformed("a SID must start with 'S-'")),
        }

        let components: Vec<&str> = parts.collect();
        if components.len() < 3 {
            return Err(Defect::malformed(
                "expected S-1-<authority>-<subauthority>; at least one subauthority is required",
            ));
        }

        for component in &components {
            if component.is_empty() {
                return Err(Defect::EmptySegment {
                    segment: "SID component",
                });
            }
            if !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Defect::InvalidCharacters {
                    segment: "SID component",
                    chars: quote_chars(component.chars().filter(|c| !c.is_ascii_digit())),
                });
            }
        }

        if components[0] != "1" {
            return Err(Defect::malformed(format!(
                "SID revision must be 1, found {}",
                components[0]
            )));
        }

        let authority = components[1]
            .parse::<u64>()
            .ok()
            .filter(|a| *a <= MAX_AUTHORITY)
            .ok_or_else(|| Defect::OutOfRange {
                segment: "identifier authority",
                value: components[1].to_string(),
                max: MAX_AUTHORITY,
            })?;

        let sub_authorities = components[2..]
            .iter()
            .map(|c| {
                c.parse::<u32>().map_err(|_| Defect::OutOfRange {
                    segment: "subauthority",
                    value: (*c).to_string(),
                    max: u64::from(u32::MAX),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            authority,
            sub_authorities,
        })
    }

    /// Decodes the binary `objectSid` layout.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 8 || bytes[0] != 1 {
            return None;
        }
        let count = usize::from(bytes[1]);
        if count == 0 || bytes.len() != 8 + 4 * count {
            return None;
        }

        let authority = bytes[2..8]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

        let sub_authorities = bytes[8..]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Some(Self {
            authority,
            sub_authorities,
        })
    }

    /// Encodes the binary `objectSid` layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 4 * self.sub_authorities.len());
        out.push(1);
        out.push(u8::try_from(self.sub_authorities.len()).unwrap_or(u8::MAX));
        out.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub in self.sub_authorities.iter().take(usize::from(u8::MAX)) {
            out.extend_from_slice(&sub.to_le_bytes());
        }
        out
    }

    /// Returns the identifier authority.
    #[must_use]
    pub const fn authority(&self) -> u64 {
        self.authority
    }

    /// Returns the subauthorities; the last one is the relative identifier.
    #[must_use]
    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// Returns the relative identifier (last subauthority).
    #[must_use]
    pub fn rid(&self) -> u32 {
        self.sub_authorities.last().copied().unwrap_or_default()
    }
}

impl fmt::Display for SecurityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-1-{}", self.authority)?;
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for SecurityIdentifier {
    type Err = Defect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SecurityIdentifier {
    type Error = Defect;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SecurityIdentifier> for String {
    fn from(sid: SecurityIdentifier) -> Self {
        sid.to_string()
    }
}
