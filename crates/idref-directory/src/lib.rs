//! # idref-directory
//!
//! Resolution of identity references against a directory.
//!
//! This crate defines the single capability the engine needs from a
//! directory ([`DirectorySearch`]) and the [`BatchResolver`] that turns raw
//! identifiers into canonical DNs with at most one query per identifier
//! format.
//!
//! ## Example
//!
//! ```ignore
//! use idref_directory::{BatchResolver, ResolverConfig};
//!
//! let config = ResolverConfig::builder()
//!     .base_dn("DC=example,DC=com")
//!     .domain_context("EXAMPLE", "DC=example,DC=com")
//!     .build()?;
//!
//! let resolver = BatchResolver::new(directory, config);
//! let result = resolver
//!     .resolve(&["EXAMPLE\\jdoe", "jane@example.com", "CN=Admins,DC=example,DC=com"])
//!     .await;
//! let members = result.into_membership_set()?;
//! ```

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod filter;
pub mod resolver;
pub mod result;
pub mod search;

pub use config::{ResolverConfig, ResolverConfigBuilder};
pub use error::{DirectoryError, DirectoryResult, ResolutionError};
pub use resolver::BatchResolver;
pub use result::{ResolutionEntry, ResolutionResult, ResolvedReference};
pub use search::{DirectoryRecord, DirectorySearch, SearchScope, RECORD_ATTRIBUTES};
