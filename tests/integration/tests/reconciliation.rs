//! Resolution feeding change detection and account-name planning.

use anyhow::Result;
use idref_core::{
    dn_values_equal, plan_account_name, sets_equal, AccountNamePolicy, MembershipSet, Planned,
    PolicyViolation, PrincipalKind,
};
use idref_directory::ResolutionError;

use crate::common::{resolver, sample_records, InMemoryDirectory, ADMINS_SID, JANE_GUID};

#[tokio::test]
async fn resolved_members_match_observed_spelling() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let desired = resolver
        .resolve_membership(&[JANE_GUID, "EXAMPLE\\bsmith"])
        .await?;

    let observed_raw = [
        "CN=BOB SMITH,OU=USERS,DC=EXAMPLE,DC=COM",
        "cn=jane doe, ou=users, dc=example, dc=com",
    ];
    let observed = MembershipSet::from_raw(observed_raw)?;

    assert!(desired.same_members(&observed));
    assert!(MembershipSet::diff(&desired, &observed).is_empty());

    let desired_raw: Vec<String> = desired.iter().map(ToString::to_string).collect();
    let observed_raw: Vec<String> = observed_raw.iter().map(ToString::to_string).collect();
    assert!(sets_equal(&desired_raw, &observed_raw));
    Ok(())
}

#[tokio::test]
async fn diff_lists_members_to_add_and_remove() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let desired = resolver
        .resolve_membership(&["jane.doe@example.com", ADMINS_SID])
        .await?;
    let observed = MembershipSet::from_raw([
        "cn=Jane Doe,ou=Users,dc=example,dc=com",
        "CN=Bob Smith,OU=Users,DC=example,DC=com",
    ])?;

    let diff = MembershipSet::diff(&desired, &observed);
    assert_eq!(diff.to_add.len(), 1);
    assert!(dn_values_equal(
        diff.to_add[0].as_str(),
        "CN=Domain Admins,CN=Users,DC=example,DC=com"
    ));
    assert_eq!(diff.to_remove.len(), 1);
    assert_eq!(diff.to_remove[0].as_str(), "cn=Bob Smith,ou=Users,dc=example,dc=com");
    Ok(())
}

#[tokio::test]
async fn partial_batch_never_becomes_a_membership_set() {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let err = resolver
        .resolve_membership(&[JANE_GUID, "ghost@example.com"])
        .await
        .unwrap_err();

    assert!(matches!(err, ResolutionError::NotFound { .. }));
    assert!(err.to_string().contains("ghost@example.com"));
}

#[tokio::test]
async fn principal_kind_selects_account_name_policy() -> Result<()> {
    let resolver = resolver(InMemoryDirectory::new(sample_records()));

    let result = resolver.resolve(&[ADMINS_SID, JANE_GUID]).await;
    let kind = |raw: &str| {
        result
            .get(raw)
            .and_then(|outcome| outcome.as_ref().ok())
            .and_then(|resolved| resolved.kind)
    };

    let group_kind = kind(ADMINS_SID).unwrap_or(PrincipalKind::Other);
    let user_kind = kind(JANE_GUID).unwrap_or(PrincipalKind::Other);
    assert_eq!(group_kind, PrincipalKind::Group);
    assert_eq!(user_kind, PrincipalKind::User);

    let display = "Regional-Service-Desk-Team";
    let planned = plan_account_name(
        Planned::Absent,
        Planned::Known(display.to_string()),
        &AccountNamePolicy::for_kind(group_kind),
    )?;
    assert_eq!(planned, Planned::Known(display.to_string()));

    let err = plan_account_name(
        Planned::Absent,
        Planned::Known(display.to_string()),
        &AccountNamePolicy::for_kind(user_kind),
    )
    .unwrap_err();
    assert!(matches!(err, PolicyViolation::TooLong { limit: 20, .. }));

    let deferred = plan_account_name(
        Planned::Absent,
        Planned::Pending,
        &AccountNamePolicy::for_kind(user_kind),
    )?;
    assert!(deferred.is_pending());
    Ok(())
}
