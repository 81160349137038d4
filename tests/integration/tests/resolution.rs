//! Batch resolution against an in-memory directory.

use std::sync::Arc;

use anyhow::{Context, Result};
use idref_core::{IdentifierFormat, PrincipalKind};
use idref_directory::{BatchResolver, ResolutionError, ResolverConfig};

use crate::common::{
    init_tracing, resolver, sample_records, InMemoryDirectory, ADMINS_SID, BOB_GUID, HELPDESK_SID,
    JANE_GUID,
};

#[tokio::test]
async fn mixed_batch_uses_one_query_per_looked_up_format() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let raws = [
        "cn=Help Desk Operators, ou=Groups, dc=example, dc=com",
        JANE_GUID,
        "bob.smith@EXAMPLE.com",
        "EXAMPLE\\wks-042$",
    ];
    let result = resolver.resolve(&raws).await;

    assert_eq!(result.len(), 4);
    assert_eq!(result.query_count(), 3);
    assert_eq!(resolver.directory().query_count(), 3);
    assert!(result.is_complete());

    let dns: Vec<&str> = result
        .iter()
        .map(|entry| {
            entry
                .outcome
                .as_ref()
                .map(|resolved| resolved.dn.as_str())
                .map_err(Clone::clone)
        })
        .collect::<Result<_, _>>()?;
    assert_eq!(
        dns,
        vec![
            "cn=Help Desk Operators,ou=Groups,dc=example,dc=com",
            "cn=Jane Doe,ou=Users,dc=example,dc=com",
            "cn=Bob Smith,ou=Users,dc=example,dc=com",
            "cn=WKS-042,ou=Computers,dc=example,dc=com",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn all_lookup_formats_cost_four_queries() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let raws = [
        "CN=Domain Admins,CN=Users,DC=example,DC=com",
        JANE_GUID,
        BOB_GUID,
        ADMINS_SID,
        HELPDESK_SID,
        "jane.doe@example.com",
        "bob.smith@example.com",
        "EXAMPLE\\jdoe",
        "EMEA\\jdoe",
        "EXAMPLE\\helpdesk",
    ];
    let result = resolver.resolve(&raws).await;

    assert_eq!(result.len(), raws.len());
    assert_eq!(result.query_count(), 4);
    assert_eq!(resolver.directory().query_count(), 4);
    assert!(result.is_complete());

    let filters = resolver.directory().filters();
    for attribute in ["objectGUID", "objectSid", "userPrincipalName", "sAMAccountName"] {
        assert_eq!(
            filters.iter().filter(|f| f.contains(attribute)).count(),
            1,
            "one query for {attribute}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn identifiers_of_one_format_share_a_query() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let upper = JANE_GUID.to_uppercase();
    let raws = [JANE_GUID, BOB_GUID, upper.as_str()];
    let result = resolver.resolve(&raws).await;

    assert_eq!(result.query_count(), 1);
    let filters = resolver.directory().filters();
    assert_eq!(filters.len(), 1);
    assert!(filters[0].starts_with("(|(objectGUID="));
    assert_eq!(filters[0].matches("(objectGUID=").count(), 2);

    assert_eq!(result.dn(JANE_GUID), result.dn(&upper));
    assert!(result.dn(BOB_GUID).is_some());
    Ok(())
}

#[tokio::test]
async fn principal_kind_comes_from_the_directory() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let raws = [ADMINS_SID, "jane.doe@example.com", "CN=Jane Doe,OU=Users,DC=example,DC=com"];
    let result = resolver.resolve(&raws).await;

    let kind = |raw: &str| {
        result
            .get(raw)
            .and_then(|outcome| outcome.as_ref().ok())
            .map(|resolved| resolved.kind)
    };
    assert_eq!(kind(ADMINS_SID), Some(Some(PrincipalKind::Group)));
    assert_eq!(kind("jane.doe@example.com"), Some(Some(PrincipalKind::User)));
    assert_eq!(kind("CN=Jane Doe,OU=Users,DC=example,DC=com"), Some(None));
    Ok(())
}

#[tokio::test]
async fn failures_are_reported_per_entry() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let raws = [
        "nobody@example.com",
        "not an identifier",
        "S-1-5-21-1-2-3-999",
        "jane.doe@example.com",
    ];
    let result = resolver.resolve(&raws).await;

    assert_eq!(result.len(), 4);
    assert!(!result.is_complete());
    assert!(matches!(
        result.get("nobody@example.com"),
        Some(Err(ResolutionError::NotFound { format: IdentifierFormat::Upn, .. }))
    ));
    assert!(matches!(
        result.get("not an identifier"),
        Some(Err(ResolutionError::Invalid(_)))
    ));
    assert!(matches!(
        result.get("S-1-5-21-1-2-3-999"),
        Some(Err(ResolutionError::NotFound { format: IdentifierFormat::Sid, .. }))
    ));
    assert!(result.dn("jane.doe@example.com").is_some());
    assert_eq!(result.failures().count(), 3);
    Ok(())
}

#[tokio::test]
async fn a_failed_query_fails_only_its_format() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()).fail_attribute("objectSid"));

    let raws = [ADMINS_SID, "jane.doe@example.com", "EXAMPLE\\bsmith"];
    let result = resolver.resolve(&raws).await;

    match result.get(ADMINS_SID) {
        Some(Err(err @ ResolutionError::DirectoryFailure { format, .. })) => {
            assert_eq!(*format, IdentifierFormat::Sid);
            assert!(err.is_retryable());
        }
        other => anyhow::bail!("expected a directory failure, got {other:?}"),
    }
    assert!(result.dn("jane.doe@example.com").is_some());
    assert!(result.dn("EXAMPLE\\bsmith").is_some());
    Ok(())
}

#[tokio::test]
async fn netbios_name_selects_the_domain() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let raws = ["EXAMPLE\\jdoe", "emea\\JDOE"];
    let result = resolver.resolve(&raws).await;

    assert_eq!(result.query_count(), 1);
    assert_eq!(
        result.dn("EXAMPLE\\jdoe").map(|dn| dn.as_str()),
        Some("cn=Jane Doe,ou=Users,dc=example,dc=com")
    );
    assert_eq!(
        result.dn("emea\\JDOE").map(|dn| dn.as_str()),
        Some("cn=Jane Doe,ou=Staff,dc=emea,dc=example,dc=com")
    );
    Ok(())
}

#[tokio::test]
async fn forest_wide_domain_context_is_ambiguous() -> Result<()> {
    init_tracing();
    let config = ResolverConfig::builder()
        .base_dn("DC=example,DC=com")
        .domain_context("EXAMPLE", "DC=example,DC=com")
        .build()?;
    let resolver = BatchResolver::new(InMemoryDirectory::new(sample_records()), config);

    let result = resolver.resolve(&["EXAMPLE\\jdoe"]).await;

    match result.get("EXAMPLE\\jdoe") {
        Some(Err(err @ ResolutionError::Ambiguous { candidates, .. })) => {
            assert_eq!(candidates.len(), 2);
            assert!(err.is_terminal());
        }
        other => anyhow::bail!("expected ambiguity, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn shared_resolver_serves_concurrent_batches() -> Result<()> {
    let resolver = Arc::new(resolver(InMemoryDirectory::new(sample_records())));

    let batches: [&[&str]; 3] = [
        &[JANE_GUID, "bob.smith@example.com"],
        &[ADMINS_SID, "EXAMPLE\\jdoe"],
        &["EMEA\\jdoe", BOB_GUID],
    ];
    let handles: Vec<_> = batches
        .iter()
        .map(|batch| {
            let resolver = Arc::clone(&resolver);
            let batch: Vec<String> = batch.iter().map(ToString::to_string).collect();
            tokio::spawn(async move { resolver.resolve(&batch).await })
        })
        .collect();

    let mut total_queries = 0;
    for handle in handles {
        let result = handle.await.context("resolution task panicked")?;
        assert!(result.is_complete());
        total_queries += result.query_count();
    }
    assert_eq!(total_queries, 6);
    assert_eq!(resolver.directory().query_count(), 6);
    Ok(())
}
