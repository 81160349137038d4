//! Decoding of LDAP search entries into directory records.

use std::collections::HashMap;

use idref_core::guid::guid_from_ad_bytes;
use idref_core::SecurityIdentifier;
use idref_directory::DirectoryRecord;
use ldap3::SearchEntry;
use tracing::debug;
use uuid::Uuid;

/// An LDAP entry with its attributes.
#[derive(Debug, Clone, Default)]
pub struct LdapEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Text attributes (all values are multi-valued).
    pub attributes: HashMap<String, Vec<String>>,

    /// Attributes with at least one non-UTF-8 value.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdapEntry {
    /// Creates an entry from a search result.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
            binary_attributes: entry.bin_attrs,
        }
    }

    /// Gets the first value of a text attribute, ignoring name case.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Gets the first raw value of an attribute, whichever map holds it.
    ///
    /// `ldap3` files binary values under text attributes when the bytes
    /// happen to be valid UTF-8.
    #[must_use]
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.binary_attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(Vec::as_slice)
            .or_else(|| self.get_attr(name).map(str::as_bytes))
    }

    /// Decodes the binary `objectGUID`.
    #[must_use]
    pub fn object_guid(&self) -> Option<Uuid> {
        self.get_bytes("objectGUID").and_then(guid_from_ad_bytes)
    }

    /// Decodes the binary `objectSid`.
    #[must_use]
    pub fn object_sid(&self) -> Option<SecurityIdentifier> {
        self.get_bytes("objectSid")
            .and_then(SecurityIdentifier::from_bytes)
    }

    /// Converts into a directory record.
    #[must_use]
    pub fn into_record(self) -> DirectoryRecord {
        let sam_account_type = self.get_attr("sAMAccountType").and_then(|value| {
            let parsed = value.parse::<u32>().ok();
            if parsed.is_none() {
                debug!(dn = %self.dn, value, "ignoring unparseable sAMAccountType");
            }
            parsed
        });

        DirectoryRecord {
            object_guid: self.object_guid(),
            object_sid: self.object_sid(),
            user_principal_name: self.get_attr("userPrincipalName").map(str::to_string),
            sam_account_name: self.get_attr("sAMAccountName").map(str::to_string),
            sam_account_type,
            distinguished_name: self.dn,
        }
    }
}
