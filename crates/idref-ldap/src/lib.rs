//! # idref-ldap
//!
//! LDAPS-backed [`DirectorySearch`](idref_directory::DirectorySearch) using `ldap3`.
//!
//! ## Security
//!
//! - Only `ldaps://` URLs are accepted; plain LDAP and STARTTLS are rejected
//! - The bind credential is never serialized or logged
//!
//! ## Example
//!
//! ```ignore
//! use idref_directory::{BatchResolver, ResolverConfig};
//! use idref_ldap::LdapDirectory;
//!
//! let directory = LdapDirectory::from_env()?;
//! let config = ResolverConfig::builder().base_dn("DC=example,DC=com").build()?;
//! let resolver = BatchResolver::new(directory, config);
//! ```

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod search;

pub use config::{LdapConfig, LdapConfigBuilder};
pub use connection::{LdapConnection, LdapConnectionPool};
pub use directory::LdapDirectory;
pub use error::{LdapError, LdapResult};
pub use search::LdapEntry;
