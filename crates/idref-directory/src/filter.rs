//! LDAP filter construction for batch lookups.

use idref_core::guid::guid_filter_value;
use idref_core::{Identifier, IdentifierFormat};

/// Returns the indexed attribute used to look up a format.
///
/// Distinguished names need no lookup.
#[must_use]
pub const fn lookup_attribute(format: IdentifierFormat) -> Option<&'static str> {
    match format {
        IdentifierFormat::DistinguishedName => None,
        IdentifierFormat::Guid => Some("objectGUID"),
        IdentifierFormat::Sid => Some("objectSid"),
        IdentifierFormat::Upn => Some("userPrincipalName"),
        IdentifierFormat::DomainQualifiedSam => Some("sAMAccountName"),
    }
}

/// Escapes a value for an LDAP filter assertion (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(c),
        }
    }
    result
}

/// Returns the filter assertion value for an identifier, already escaped.
#[must_use]
pub fn assertion_value(identifier: &Identifier) -> Option<String> {
    match identifier {
        Identifier::DistinguishedName(_) => None,
        Identifier::Guid(guid) => Some(guid_filter_value(guid)),
        Identifier::Sid(sid) => Some(sid.to_string()),
        Identifier::Upn(upn) => Some(escape_filter_value(&upn.to_string())),
        Identifier::DomainQualifiedSam(account) => Some(escape_filter_value(account.account())),
    }
}

/// Builds an equality filter, OR-combining several values.
///
/// Values are sent once each, compared case-insensitively. Returns `None`
/// for an empty value list.
#[must_use]
pub fn any_of(attribute: &str, values: &[String]) -> Option<String> {
    let mut distinct: Vec<&str> = Vec::with_capacity(values.len());
    for value in values {
        if !distinct.iter().any(|seen| seen.eq_ignore_ascii_case(value)) {
            distinct.push(value);
        }
    }

    match distinct.as_slice() {
        [] => None,
        [single] => Some(format!("({attribute}={single})")),
        many => {
            let terms: String = many
                .iter()
                .map(|value| format!("({attribute}={value})"))
                .collect();
            Some(format!("(|{terms})"))
        }
    }
}
