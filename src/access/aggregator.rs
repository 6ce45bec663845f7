//! Role → access-right expansion and cross-department union.
//!
//! Rights are kept verbatim: a wildcard such as `content:*` is stored as-is
//! and never enumerated into concrete rights. Authorization checks go
//! through [`right_permits`], which understands the trailing `*`.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::error;

use super::catalog::{CatalogHandle, RoleCatalog};
use super::error::{AccessError, AccessResult};
use crate::types::PrincipalKind;

pub type RightSet = BTreeSet<String>;

/// Does a single held right grant `requested`?
pub fn right_permits(held: &str, requested: &str) -> bool {
    match held.strip_suffix('*') {
        Some(prefix) => requested.starts_with(prefix),
        None => held == requested,
    }
}

/// Does any held right grant `requested`?
pub fn rights_permit<'a>(held: impl IntoIterator<Item = &'a String>, requested: &str) -> bool {
    held.into_iter().any(|h| right_permits(h, requested))
}

#[derive(Clone)]
pub struct AccessRightAggregator {
    catalog: CatalogHandle,
}

impl AccessRightAggregator {
    pub fn new(catalog: CatalogHandle) -> Self {
        Self { catalog }
    }

    pub async fn snapshot(&self) -> Arc<RoleCatalog> {
        self.catalog.snapshot().await
    }

    /// Union of the catalog rights of every named role. An unknown role
    /// fails the whole expansion rather than silently dropping its rights.
    pub fn expand_roles<'a>(
        catalog: &RoleCatalog,
        role_names: impl IntoIterator<Item = &'a String>,
    ) -> AccessResult<RightSet> {
        let mut rights = RightSet::new();
        for name in role_names {
            let role = catalog.get(name).ok_or_else(|| {
                error!(role = %name, "role referenced by a membership is missing from the catalog");
                AccessError::UnknownRole(name.clone())
            })?;
            rights.extend(role.access_rights.iter().cloned());
        }
        Ok(rights)
    }

    /// Like [`Self::expand_roles`], and also requires every role to belong to `kind`.
    pub fn expand_roles_for_kind<'a>(
        catalog: &RoleCatalog,
        kind: PrincipalKind,
        role_names: impl IntoIterator<Item = &'a String>,
    ) -> AccessResult<RightSet> {
        let names: Vec<&String> = role_names.into_iter().collect();
        for name in &names {
            if let Some(role) = catalog.get(name) {
                if role.principal_kind != kind {
                    error!(role = %name, expected = %role.principal_kind, found = %kind, "role attached to the wrong principal kind");
                    return Err(AccessError::RoleKindMismatch {
                        role: (*name).clone(),
                        expected: role.principal_kind,
                        found: kind,
                    });
                }
            }
        }
        Self::expand_roles(catalog, names)
    }

    /// Union of the rights of each resolved department's role set.
    ///
    /// Cascaded descendants carry their ancestor membership's roles, so one
    /// entry per direct membership covers them too.
    pub fn union_across_departments<'a>(
        catalog: &RoleCatalog,
        role_sets: impl IntoIterator<Item = (PrincipalKind, &'a BTreeSet<String>)>,
    ) -> AccessResult<RightSet> {
        let mut rights = RightSet::new();
        for (kind, roles) in role_sets {
            rights.extend(Self::expand_roles_for_kind(catalog, kind, roles)?);
        }
        Ok(rights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;

    fn catalog() -> RoleCatalog {
        RoleCatalog::from_roles(vec![
            Role::new(
                "instructor",
                PrincipalKind::Staff,
                ["content:courses:read", "content:lessons:read", "grades:own-classes:manage"],
            ),
            Role::new(
                "content-admin",
                PrincipalKind::Staff,
                ["content:courses:manage", "content:lessons:manage", "content:materials:manage"],
            ),
            Role::new("reviewer", PrincipalKind::Staff, ["content:*", "content:courses:read"]),
            Role::new("student", PrincipalKind::Learner, ["content:courses:read"]),
        ])
        .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn set(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn expands_two_roles_into_six_rights() {
        let rights =
            AccessRightAggregator::expand_roles(&catalog(), &names(&["instructor", "content-admin"]))
                .unwrap();
        assert_eq!(rights.len(), 6);
        assert!(rights.contains("grades:own-classes:manage"));
        assert!(rights.contains("content:materials:manage"));
    }

    #[test]
    fn unknown_role_fails_instead_of_dropping() {
        let err = AccessRightAggregator::expand_roles(&catalog(), &names(&["instructor", "ghost"]))
            .unwrap_err();
        assert!(matches!(err, AccessError::UnknownRole(name) if name == "ghost"));
    }

    #[test]
    fn wildcard_and_concrete_rights_both_kept() {
        let rights = AccessRightAggregator::expand_roles(&catalog(), &names(&["reviewer"])).unwrap();
        assert!(rights.contains("content:*"));
        assert!(rights.contains("content:courses:read"));
        assert_eq!(rights.len(), 2);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let err = AccessRightAggregator::expand_roles_for_kind(
            &catalog(),
            PrincipalKind::Learner,
            &names(&["instructor"]),
        )
        .unwrap_err();
        assert!(matches!(err, AccessError::RoleKindMismatch { .. }));
    }

    #[test]
    fn union_has_no_duplicates() {
        let instructor = set(&["instructor"]);
        let both = set(&["instructor", "content-admin"]);
        let student = set(&["student"]);

        let rights = AccessRightAggregator::union_across_departments(
            &catalog(),
            [
                (PrincipalKind::Staff, &instructor),
                (PrincipalKind::Staff, &both),
                (PrincipalKind::Learner, &student),
            ],
        )
        .unwrap();
        assert_eq!(rights.len(), 6);
        assert!(!rights.contains("content:*"));
    }

    #[test]
    fn wildcard_matching() {
        assert!(right_permits("content:*", "content:courses:read"));
        assert!(right_permits("content:courses:read", "content:courses:read"));
        assert!(!right_permits("content:courses:read", "content:courses:manage"));
        assert!(!right_permits("content:*", "grades:own-classes:manage"));
        assert!(right_permits("*", "anything:at:all"));

        let held: RightSet = ["grades:*".to_string()].into_iter().collect();
        assert!(rights_permit(&held, "grades:own-classes:manage"));
        assert!(!rights_permit(&held, "content:courses:read"));
    }
}
