//! Distinguished Name parsing and canonicalization.
//!
//! Normalization fixes structure, never value case:
//!
//! - attribute type descriptors are lower-cased (`CN` -> `cn`), numeric OIDs
//!   are kept as written;
//! - whitespace around `=`, `,` and `+` is dropped, `;` becomes `,`;
//! - values are unescaped and re-escaped minimally (RFC 4514);
//! - components of a multi-valued RDN are sorted.
//!
//! Two names that differ only in value case stay distinct here; the
//! [`equality`](crate::equality) module folds case.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DnDefect, NormalizationError};

// ============================================================================
// Components
// ============================================================================

/// Value half of an attribute type and value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// An unescaped string value.
    Text(String),
    /// A `#`-prefixed BER encoding, kept as lower-case hex digits.
    Ber(String),
}

impl AttributeValue {
    /// Returns the string value, if this is not a BER encoding.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Ber(_) => None,
        }
    }

    fn write_escaped(&self, out: &mut String) {
        match self {
            Self::Text(s) => escape_into(s, out),
            Self::Ber(hex) => {
                out.push('#');
                out.push_str(hex);
            }
        }
    }
}

/// One `type=value` component of an RDN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeTypeAndValue {
    attribute_type: String,
    value: AttributeValue,
}

impl AttributeTypeAndValue {
    /// Returns the canonical attribute type.
    #[must_use]
    pub fn attribute_type(&self) -> &str {
        &self.attribute_type
    }

    /// Returns the value.
    #[must_use]
    pub const fn value(&self) -> &AttributeValue {
        &self.value
    }

    fn rendered_value(&self) -> String {
        let mut out = String::new();
        self.value.write_escaped(&mut out);
        out
    }

    fn canonical_order(&self, other: &Self) -> Ordering {
        let (a, b) = (self.rendered_value(), other.rendered_value());
        self.attribute_type
            .cmp(&other.attribute_type)
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
            .then_with(|| a.cmp(&b))
    }
}

impl fmt::Display for AttributeTypeAndValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute_type, self.rendered_value())
    }
}

/// A relative distinguished name: one or more components joined by `+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rdn {
    avas: Vec<AttributeTypeAndValue>,
}

impl Rdn {
    fn new(mut avas: Vec<AttributeTypeAndValue>) -> Self {
        avas.sort_by(AttributeTypeAndValue::canonical_order);
        Self { avas }
    }

    /// Returns the components in canonical order.
    #[must_use]
    pub fn components(&self) -> &[AttributeTypeAndValue] {
        &self.avas
    }

    fn folded(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ava) in self.avas.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{ava}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Distinguished Name
// ============================================================================

/// A parsed distinguished name, most specific RDN first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DistinguishedName {
    rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parses a DN string.
    ///
    /// ## Errors
    ///
    /// Returns a [`NormalizationError`] with the byte offset of the first
    /// structural problem.
    pub fn parse(input: &str) -> Result<Self, NormalizationError> {
        Parser::new(input).distinguished_name()
    }

    /// Returns the RDNs, most specific first.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Returns the number of RDNs.
    #[must_use]
    pub fn rdn_count(&self) -> usize {
        self.rdns.len()
    }

    /// Returns the DN of the containing entry, or `None` for a single RDN.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.len() < 2 {
            return None;
        }
        Some(Self {
            rdns: self.rdns[1..].to_vec(),
        })
    }

    /// Returns true if `self` equals `ancestor` or lies below it, ignoring case.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        let Some(offset) = self.rdns.len().checked_sub(ancestor.rdns.len()) else {
            return false;
        };
        self.rdns[offset..]
            .iter()
            .zip(&ancestor.rdns)
            .all(|(a, b)| a.folded() == b.folded())
    }

    /// Returns the left-most text value of the given attribute type.
    #[must_use]
    pub fn first_value_of(&self, attribute_type: &str) -> Option<&str> {
        self.rdns
            .iter()
            .flat_map(|rdn| rdn.avas.iter())
            .find(|ava| ava.attribute_type.eq_ignore_ascii_case(attribute_type))
            .and_then(|ava| ava.value.as_text())
    }

    /// Renders the canonical form.
    #[must_use]
    pub fn to_canonical(&self) -> CanonicalDn {
        CanonicalDn(self.to_string())
    }

    /// Returns the case-folded canonical form used for comparisons.
    #[must_use]
    pub fn folded(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl FromStr for DistinguishedName {
    type Err = NormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Canonical DN
// ============================================================================

/// A structurally normalized DN string.
///
/// This is the only representation persisted into reconciliation state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalDn(String);

impl CanonicalDn {
    /// Returns the canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the case-folded comparison key.
    #[must_use]
    pub fn folded(&self) -> String {
        self.0.to_lowercase()
    }

    /// Parses the canonical string back into its components.
    pub fn to_dn(&self) -> Result<DistinguishedName, NormalizationError> {
        DistinguishedName::parse(&self.0)
    }

    /// Consumes the value, returning the string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalDn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalDn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CanonicalDn {
    type Err = NormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl TryFrom<String> for CanonicalDn {
    type Error = NormalizationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<CanonicalDn> for String {
    fn from(dn: CanonicalDn) -> Self {
        dn.0
    }
}

/// Normalizes a single DN.
pub fn normalize(dn: &str) -> Result<CanonicalDn, NormalizationError> {
    DistinguishedName::parse(dn).map(|parsed| parsed.to_canonical())
}

/// Normalizes every DN, stopping at the first malformed one.
pub fn normalize_batch<I, S>(dns: I) -> Result<Vec<CanonicalDn>, NormalizationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dns.into_iter().map(|dn| normalize(dn.as_ref())).collect()
}

/// Escapes a string for use as an RDN value.
#[must_use]
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    escape_into(value, &mut out);
    out
}

fn escape_into(value: &str, out: &mut String) {
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            '"' | '+' | ',' | ';' | '<' | '>' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '#' if i == 0 => out.push_str("\\#"),
            ' ' if i == 0 || i == last => out.push_str("\\ "),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(' ') {
            self.pos += 1;
        }
    }

    fn at_separator(&self) -> bool {
        matches!(self.peek(), None | Some(',' | ';' | '+'))
    }

    fn error(&self, reason: DnDefect) -> NormalizationError {
        self.error_at(self.pos, reason)
    }

    fn error_at(&self, offset: usize, reason: DnDefect) -> NormalizationError {
        NormalizationError::new(self.input, offset, reason)
    }

    fn distinguished_name(&mut self) -> Result<DistinguishedName, NormalizationError> {
        if self.input.trim().is_empty() {
            return Err(self.error(DnDefect::Empty));
        }

        let mut rdns = Vec::new();
        loop {
            rdns.push(self.rdn()?);
            self.skip_spaces();
            match self.peek() {
                None => break,
                Some(',' | ';') => {
                    self.bump();
                }
                Some(c) => return Err(self.error(DnDefect::UnexpectedCharacter(c))),
            }
        }

        Ok(DistinguishedName { rdns })
    }

    fn rdn(&mut self) -> Result<Rdn, NormalizationError> {
        let mut avas = vec![self.attribute_type_and_value()?];
        loop {
            self.skip_spaces();
            if self.peek() != Some('+') {
                break;
            }
            self.bump();
            avas.push(self.attribute_type_and_value()?);
        }
        Ok(Rdn::new(avas))
    }

    fn attribute_type_and_value(&mut self) -> Result<AttributeTypeAndValue, NormalizationError> {
        self.skip_spaces();
        if self.at_separator() {
            return Err(self.error(DnDefect::MissingComponent));
        }

        let input = self.input;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '-' || c == '.') {
            self.pos += 1;
        }
        let raw_type = &input[start..self.pos];
        if raw_type.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.error(DnDefect::UnexpectedCharacter(c)),
                None => self.error(DnDefect::MissingComponent),
            });
        }
        let attribute_type = canonical_attribute_type(raw_type).ok_or_else(|| {
            self.error_at(start, DnDefect::InvalidAttributeType(raw_type.to_string()))
        })?;

        self.skip_spaces();
        if self.peek() != Some('=') {
            return Err(self.error(DnDefect::MissingEquals));
        }
        self.bump();
        self.skip_spaces();

        let value = match self.peek() {
            Some('"') => self.quoted_value()?,
            Some('#') => self.ber_value()?,
            _ => self.string_value()?,
        };

        Ok(AttributeTypeAndValue {
            attribute_type,
            value,
        })
    }

    fn string_value(&mut self) -> Result<AttributeValue, NormalizationError> {
        let start = self.pos;
        let mut bytes = Vec::new();
        // Unescaped trailing spaces are insignificant.
        let mut significant = 0;

        loop {
            match self.peek() {
                None | Some(',' | ';' | '+') => break,
                Some('\\') => {
                    self.bump();
                    self.escape(&mut bytes)?;
                    significant = bytes.len();
                }
                Some(c) => {
                    self.bump();
                    push_char(&mut bytes, c);
                    if c != ' ' {
                        significant = bytes.len();
                    }
                }
            }
        }

        bytes.truncate(significant);
        String::from_utf8(bytes)
            .map(AttributeValue::Text)
            .map_err(|_| self.error_at(start, DnDefect::InvalidUtf8))
    }

    fn quoted_value(&mut self) -> Result<AttributeValue, NormalizationError> {
        let start = self.pos;
        self.bump();

        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, DnDefect::UnterminatedQuote)),
                Some('"') => break,
                Some('\\') => self.escape(&mut bytes)?,
                Some(c) => push_char(&mut bytes, c),
            }
        }

        String::from_utf8(bytes)
            .map(AttributeValue::Text)
            .map_err(|_| self.error_at(start, DnDefect::InvalidUtf8))
    }

    fn ber_value(&mut self) -> Result<AttributeValue, NormalizationError> {
        let start = self.pos;
        self.bump();

        let input = self.input;
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let digits = &input[digits_start..self.pos];

        self.skip_spaces();
        if digits.is_empty() || digits.len() % 2 != 0 || !self.at_separator() {
            return Err(self.error_at(start, DnDefect::InvalidHexValue));
        }
        Ok(AttributeValue::Ber(digits.to_ascii_lowercase()))
    }

    /// Consumes the part after a backslash: a hex pair or an escaped symbol.
    fn escape(&mut self, bytes: &mut Vec<u8>) -> Result<(), NormalizationError> {
        match self.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                let input = self.input;
                let pair = input[self.pos..]
                    .get(..2)
                    .filter(|p| p.bytes().all(|b| b.is_ascii_hexdigit()))
                    .ok_or_else(|| self.error(DnDefect::InvalidEscape))?;
                let byte =
                    u8::from_str_radix(pair, 16).map_err(|_| self.error(DnDefect::InvalidEscape))?;
                self.pos += 2;
                bytes.push(byte);
                Ok(())
            }
            Some(c) if c == ' ' || c.is_ascii_punctuation() => {
                self.bump();
                push_char(bytes, c);
                Ok(())
            }
            _ => Err(self.error(DnDefect::InvalidEscape)),
        }
    }
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn canonical_attribute_type(raw: &str) -> Option<String> {
    let oid = raw
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("oid."))
        .map_or(raw, |_| &raw[4..]);
    if is_numeric_oid(oid) {
        return Some(oid.to_string());
    }

    let mut chars = raw.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric() || c == '-') {
        Some(raw.to_ascii_lowercase())
    } else {
        None
    }
}

fn is_numeric_oid(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(dn: &str) -> String {
        normalize(dn).unwrap().into_string()
    }

    fn defect(dn: &str) -> DnDefect {
        normalize(dn).unwrap_err().reason
    }

    #[test]
    fn lower_cases_attribute_types_and_keeps_value_case() {
        assert_eq!(
            canon("CN=Test,DC=example,DC=com"),
            "cn=Test,dc=example,dc=com"
        );
        assert_eq!(canon("CN=Jane Doe,OU=Sales"), "cn=Jane Doe,ou=Sales");
    }

    #[test]
    fn strips_separator_whitespace() {
        assert_eq!(
            canon("CN = Jane Doe , OU= Sales ;DC =example"),
            "cn=Jane Doe,ou=Sales,dc=example"
        );
    }

    #[test]
    fn reescapes_values_minimally() {
        assert_eq!(canon(r"CN=Doe\2C John,DC=com"), r"cn=Doe\, John,dc=com");
        assert_eq!(canon(r"CN=\41lice,DC=com"), "cn=Alice,dc=com");
        assert_eq!(canon(r"CN=a\=b,DC=com"), "cn=a=b,dc=com");
        assert_eq!(canon(r"CN=\#1,DC=com"), r"cn=\#1,dc=com");
        assert_eq!(canon(r"CN=\ padded\ ,DC=com"), r"cn=\ padded\ ,dc=com");
    }

    #[test]
    fn decodes_utf8_hex_escapes() {
        assert_eq!(canon(r"CN=Ren\C3\A9,DC=com"), "cn=René,dc=com");
        assert_eq!(defect(r"CN=Ren\C3,DC=com"), DnDefect::InvalidUtf8);
    }

    #[test]
    fn accepts_quoted_values() {
        assert_eq!(canon(r#"CN="Doe, John",DC=com"#), r"cn=Doe\, John,dc=com");
        assert_eq!(defect(r#"CN="Doe, John,DC=com"#), DnDefect::UnterminatedQuote);
    }

    #[test]
    fn keeps_ber_values() {
        assert_eq!(
            canon("1.3.6.1.4.1.1466.0=#04024869,DC=com"),
            "1.3.6.1.4.1.1466.0=#04024869,dc=com"
        );
        assert_eq!(canon("OID.2.5.4.3=#0A0B,DC=com"), "2.5.4.3=#0a0b,dc=com");
        assert_eq!(defect("CN=#abc,DC=com"), DnDefect::InvalidHexValue);
    }

    #[test]
    fn sorts_multi_valued_rdns() {
        assert_eq!(
            canon("UID=jdoe+CN=John,DC=com"),
            canon("cn=John + uid=jdoe,dc=com")
        );
        assert_eq!(canon("UID=jdoe+CN=John,DC=com"), "cn=John+uid=jdoe,dc=com");
    }

    #[test]
    fn permits_empty_values() {
        assert_eq!(canon("CN=,DC=com"), "cn=,dc=com");
    }

    #[test]
    fn rejects_structural_defects() {
        assert_eq!(defect(""), DnDefect::Empty);
        assert_eq!(defect("   "), DnDefect::Empty);
        assert_eq!(defect("CN=a,"), DnDefect::MissingComponent);
        assert_eq!(defect(",CN=a"), DnDefect::MissingComponent);
        assert_eq!(defect("CN=a,,DC=com"), DnDefect::MissingComponent);
        assert_eq!(defect("CN"), DnDefect::MissingEquals);
        assert_eq!(defect("CN=a\\"), DnDefect::InvalidEscape);
        assert_eq!(defect("CN=a\\4"), DnDefect::InvalidEscape);
        assert!(matches!(defect("1cn=a"), DnDefect::InvalidAttributeType(_)));
        assert!(matches!(defect("=a"), DnDefect::UnexpectedCharacter('=')));
    }

    #[test]
    fn error_reports_offset() {
        let err = normalize("CN=a,DC=com,").unwrap_err();
        assert_eq!(err.offset, 12);
        assert_eq!(err.value, "CN=a,DC=com,");
    }

    #[test]
    fn normalization_is_idempotent() {
        for dn in [
            "CN=Test,DC=example,DC=com",
            r"CN=Doe\2C John+UID=jd,OU=A\+B,DC=com",
            r#"CN=" leading and trailing ",DC=com"#,
            r"CN=\#hash\;semi\<lt\>,DC=com",
            "CN=,DC=com",
            r"CN=nul\00byte,DC=com",
        ] {
            let once = canon(dn);
            assert_eq!(canon(&once), once, "not idempotent for {dn}");
        }
    }

    #[test]
    fn batch_is_fail_fast() {
        let ok = normalize_batch(["CN=a,DC=com", "CN=b,DC=com"]).unwrap();
        assert_eq!(ok.len(), 2);

        let err = normalize_batch(["CN=a,DC=com", "CN=b,", "garbage"]).unwrap_err();
        assert_eq!(err.value, "CN=b,");
    }

    #[test]
    fn hierarchy_helpers() {
        let user = DistinguishedName::parse("CN=Jane,OU=Users,DC=Example,DC=com").unwrap();
        let domain = DistinguishedName::parse("dc=example,dc=COM").unwrap();
        let other = DistinguishedName::parse("DC=other,DC=com").unwrap();

        assert!(user.is_descendant_of(&domain));
        assert!(domain.is_descendant_of(&domain));
        assert!(!user.is_descendant_of(&other));
        assert!(!domain.is_descendant_of(&user));

        assert_eq!(user.rdn_count(), 4);
        assert_eq!(user.parent().unwrap().to_string(), "ou=Users,dc=Example,dc=com");
        assert_eq!(user.first_value_of("DC"), Some("Example"));
        assert!(DistinguishedName::parse("DC=com").unwrap().parent().is_none());
    }

    #[test]
    fn escape_value_round_trips_through_parser() {
        let value = " Smith, John #2 ";
        let dn = format!("CN={},DC=com", escape_value(value));
        let parsed = DistinguishedName::parse(&dn).unwrap();
        assert_eq!(
            parsed.rdns()[0].components()[0].value().as_text(),
            Some(value)
        );
    }

    #[test]
    fn canonical_dn_serde_normalizes() {
        let dn: CanonicalDn = serde_json::from_str("\"CN=Test, DC=com\"").unwrap();
        assert_eq!(dn.as_str(), "cn=Test,dc=com");
        assert!(serde_json::from_str::<CanonicalDn>("\"not a dn\"").is_err());
        assert_eq!(serde_json::to_string(&dn).unwrap(), "\"cn=Test,dc=com\"");
    }
}
