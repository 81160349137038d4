//! Common test utilities and fixtures.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use idref_core::guid::guid_from_ad_bytes;
use idref_core::{DistinguishedName, SecurityIdentifier};
use idref_directory::{
    BatchResolver, DirectoryError, DirectoryRecord, DirectoryResult, DirectorySearch,
    ResolverConfig, SearchScope,
};
use uuid::Uuid;

pub const JANE_GUID: &str = "550e8400-e29b-41d4-a716-446655440000";
pub const BOB_GUID: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";
pub const ADMINS_SID: &str = "S-1-5-21-123456789-123456789-123456789-512";
pub const HELPDESK_SID: &str = "S-1-5-21-123456789-123456789-123456789-1105";

/// Initializes tracing once for the whole test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("idref_directory=debug,idref_core=debug")
        .with_test_writer()
        .try_init();
}

/// An in-memory directory that evaluates equality and OR filters.
#[derive(Default)]
pub struct InMemoryDirectory {
    records: Vec<DirectoryRecord>,
    failing_attributes: HashSet<String>,
    queries: AtomicUsize,
    filters: Mutex<Vec<String>>,
}

impl InMemoryDirectory {
    pub fn new(records: Vec<DirectoryRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Makes every query on `attribute` fail with a timeout.
    pub fn fail_attribute(mut self, attribute: &str) -> Self {
        self.failing_attributes.insert(attribute.to_lowercase());
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn filters(&self) -> Vec<String> {
        self.filters.lock().expect("filter log poisoned").clone()
    }

    fn matches(record: &DirectoryRecord, attribute: &str, value: &[u8]) -> bool {
        match attribute.to_lowercase().as_str() {
            "objectguid" => {
                guid_from_ad_bytes(value).is_some_and(|guid| record.object_guid == Some(guid))
            }
            "objectsid" => std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.parse::<SecurityIdentifier>().ok())
                .is_some_and(|sid| record.object_sid.as_ref() == Some(&sid)),
            "userprincipalname" => text_eq(record.user_principal_name.as_deref(), value),
            "samaccountname" => text_eq(record.sam_account_name.as_deref(), value),
            _ => false,
        }
    }
}

#[async_trait]
impl DirectorySearch for InMemoryDirectory {
    async fn search(
        &self,
        base_dn: &str,
        filter: &str,
        scope: SearchScope,
    ) -> DirectoryResult<Vec<DirectoryRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.filters
            .lock()
            .expect("filter log poisoned")
            .push(filter.to_string());

        let assertions = parse_filter(filter)?;
        if assertions
            .iter()
            .any(|(attribute, _)| self.failing_attributes.contains(&attribute.to_lowercase()))
        {
            return Err(DirectoryError::timeout("simulated search timeout"));
        }

        let base = DistinguishedName::parse(base_dn)
            .map_err(|e| DirectoryError::protocol(format!("invalid base DN: {e}")))?;
        let in_scope = |record: &DirectoryRecord| {
            DistinguishedName::parse(&record.distinguished_name).map_or(true, |dn| match scope {
                SearchScope::Base => dn.folded() == base.folded(),
                SearchScope::OneLevel => dn.parent().is_some_and(|p| p.folded() == base.folded()),
                SearchScope::Subtree => dn.is_descendant_of(&base),
            })
        };

        Ok(self
            .records
            .iter()
            .filter(|record| in_scope(record))
            .filter(|record| {
                assertions
                    .iter()
                    .any(|(attribute, value)| Self::matches(record, attribute, value))
            })
            .cloned()
            .collect())
    }
}

fn text_eq(actual: Option<&str>, value: &[u8]) -> bool {
    match (actual, std::str::from_utf8(value)) {
        (Some(actual), Ok(value)) => actual.to_lowercase() == value.to_lowercase(),
        _ => false,
    }
}

/// Parses `(attr=value)` or `(|(attr=value)...)` into unescaped assertions.
fn parse_filter(filter: &str) -> DirectoryResult<Vec<(String, Vec<u8>)>> {
    let invalid = || DirectoryError::protocol(format!("unsupported filter {filter}"));

    let body = filter
        .strip_prefix("(|")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(filter);

    let mut assertions = Vec::new();
    for term in body.split_terminator(')') {
        let term = term.strip_prefix('(').ok_or_else(invalid)?;
        let (attribute, value) = term.split_once('=').ok_or_else(invalid)?;
        assertions.push((attribute.to_string(), unescape(value).ok_or_else(invalid)?));
    }
    if assertions.is_empty() {
        return Err(invalid());
    }
    Ok(assertions)
}

fn unescape(value: &str) -> Option<Vec<u8>> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let hex = value.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

/// A small Active Directory forest with two domains.
pub fn sample_records() -> Vec<DirectoryRecord> {
    vec![
        DirectoryRecord::new("CN=Jane Doe,OU=Users,DC=example,DC=com")
            .with_guid(Uuid::parse_str(JANE_GUID).expect("valid GUID"))
            .with_upn("jane.doe@example.com")
            .with_sam_account_name("jdoe")
            .with_sam_account_type(0x3000_0000),
        DirectoryRecord::new("CN=Bob Smith,OU=Users,DC=example,DC=com")
            .with_guid(Uuid::parse_str(BOB_GUID).expect("valid GUID"))
            .with_upn("bob.smith@example.com")
            .with_sam_account_name("bsmith")
            .with_sam_account_type(0x3000_0000),
        DirectoryRecord::new("CN=Domain Admins,CN=Users,DC=example,DC=com")
            .with_sid(ADMINS_SID.parse().expect("valid SID"))
            .with_sam_account_name("Domain Admins")
            .with_sam_account_type(0x1000_0000),
        DirectoryRecord::new("CN=Help Desk Operators,OU=Groups,DC=example,DC=com")
            .with_sid(HELPDESK_SID.parse().expect("valid SID"))
            .with_sam_account_name("helpdesk")
            .with_sam_account_type(0x1000_0000),
        DirectoryRecord::new("CN=WKS-042,OU=Computers,DC=example,DC=com")
            .with_sam_account_name("WKS-042$")
            .with_sam_account_type(0x3000_0001),
        DirectoryRecord::new("CN=Jane Doe,OU=Staff,DC=emea,DC=example,DC=com")
            .with_upn("jane.doe@emea.example.com")
            .with_sam_account_name("jdoe")
            .with_sam_account_type(0x3000_0000),
    ]
}

pub fn config() -> ResolverConfig {
    ResolverConfig::builder()
        .base_dn("DC=example,DC=com")
        .build()
        .expect("valid resolver config")
}

pub fn resolver(directory: InMemoryDirectory) -> BatchResolver<InMemoryDirectory> {
    init_tracing();
    BatchResolver::new(directory, config())
}
