//! Department role resolution.
//!
//! A principal reaches a department either through an active membership in
//! that department, or by cascading from the nearest ancestor holding one.
//! A department flagged `require_explicit_membership` is a one-way wall:
//! nothing above it cascades into it or anything beneath it.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error};

use super::error::{AccessError, AccessResult};
use crate::database::models::{Department, DepartmentId, Principal};
use crate::database::DepartmentStore;

/// Outcome of resolving one department for one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoles {
    pub department_id: DepartmentId,
    pub roles: BTreeSet<String>,
    pub is_direct_member: bool,
    pub inherited_from: Option<DepartmentId>,
    pub is_primary: bool,
}

/// A descendant reached by cascading from a direct membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadedChild {
    pub department: Department,
    /// Index of the parent within the returned list, `None` for direct children
    pub parent: Option<usize>,
}

#[derive(Clone)]
pub struct RoleResolver {
    departments: Arc<dyn DepartmentStore>,
    max_depth: usize,
}

impl RoleResolver {
    pub fn new(departments: Arc<dyn DepartmentStore>, max_depth: usize) -> Self {
        Self {
            departments,
            max_depth: max_depth.max(1),
        }
    }

    pub async fn department(&self, id: DepartmentId) -> AccessResult<Department> {
        self.departments
            .get_department(id)
            .await?
            .ok_or(AccessError::UnknownDepartment(id))
    }

    /// Effective roles of `principal` in `target`.
    pub async fn resolve_roles(
        &self,
        principal: &Principal,
        target: DepartmentId,
    ) -> AccessResult<ResolvedRoles> {
        if let Some(membership) = principal.active_membership_in(target) {
            return Ok(ResolvedRoles {
                department_id: target,
                roles: membership.roles.clone(),
                is_direct_member: true,
                inherited_from: None,
                is_primary: membership.is_primary,
            });
        }

        let target_dept = self.department(target).await?;
        if target_dept.require_explicit_membership {
            debug!(department = %target, kind = %principal.kind(), "explicit membership required");
            return Err(AccessError::NotAMember(target));
        }

        let mut visited = HashSet::from([target]);
        let mut next = target_dept.parent_id;

        while let Some(ancestor_id) = next {
            if !visited.insert(ancestor_id) || visited.len() > self.max_depth {
                error!(start = %target, at = %ancestor_id, "department ancestry does not terminate");
                return Err(AccessError::DepartmentCycle {
                    start: target,
                    limit: self.max_depth,
                });
            }

            if let Some(membership) = principal.active_membership_in(ancestor_id) {
                debug!(department = %target, inherited_from = %ancestor_id, "roles cascaded");
                return Ok(ResolvedRoles {
                    department_id: target,
                    roles: membership.roles.clone(),
                    is_direct_member: false,
                    inherited_from: Some(ancestor_id),
                    is_primary: false,
                });
            }

            let ancestor = self.department(ancestor_id).await?;
            if ancestor.require_explicit_membership {
                // Anything above a wall can't reach below it
                return Err(AccessError::NotAMember(target));
            }
            next = ancestor.parent_id;
        }

        Err(AccessError::NotAMember(target))
    }

    /// Descendants of `root` that inherit a membership held directly in `root`.
    ///
    /// Breadth-first with a visited set. A descendant is left out, together
    /// with its subtree, when it is walled or when the principal holds its
    /// own active membership there (that one is listed as a direct entry).
    pub async fn cascaded_children(
        &self,
        principal: &Principal,
        root: DepartmentId,
    ) -> AccessResult<Vec<CascadedChild>> {
        let mut out: Vec<CascadedChild> = Vec::new();
        let mut visited = HashSet::from([root]);
        let mut queue: VecDeque<(DepartmentId, Option<usize>, usize)> = VecDeque::from([(root, None, 0)]);

        while let Some((id, parent_idx, depth)) = queue.pop_front() {
            if depth >= self.max_depth {
                error!(start = %root, at = %id, "department subtree exceeds depth bound");
                return Err(AccessError::DepartmentCycle {
                    start: root,
                    limit: self.max_depth,
                });
            }

            for child in self.departments.get_children(id).await? {
                if !visited.insert(child.id) {
                    error!(start = %root, at = %child.id, "department revisited while walking subtree");
                    return Err(AccessError::DepartmentCycle {
                        start: root,
                        limit: self.max_depth,
                    });
                }
                if child.require_explicit_membership || principal.active_membership_in(child.id).is_some() {
                    continue;
                }
                let child_id = child.id;
                out.push(CascadedChild {
                    department: child,
                    parent: parent_idx,
                });
                queue.push_back((child_id, Some(out.len() - 1), depth + 1));
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{DepartmentMembership, PrincipalRecord};
    use crate::database::InMemoryStore;
    use crate::testing::Tree;
    use uuid::Uuid;

    fn child_ids(children: &[CascadedChild]) -> Vec<Uuid> {
        children.iter().map(|c| c.department.id).collect()
    }

    fn staff(memberships: Vec<DepartmentMembership>) -> Principal {
        Principal::Staff(PrincipalRecord::new(Uuid::new_v4(), memberships))
    }

    async fn chain(walled: &[&str]) -> (Tree, RoleResolver) {
        let tree = Tree::chain(&["Grandparent", "Parent", "Child", "Grandchild"], walled).await;
        let resolver = RoleResolver::new(Arc::new(tree.store.clone()), 16);
        (tree, resolver)
    }

    #[tokio::test]
    async fn direct_membership_wins() {
        let (tree, resolver) = chain(&[]).await;
        let p = staff(vec![
            DepartmentMembership::new(tree.id("Grandparent"), ["content-admin"]),
            DepartmentMembership::new(tree.id("Child"), ["instructor"]).primary(),
        ]);

        let resolved = resolver.resolve_roles(&p, tree.id("Child")).await.unwrap();
        assert!(resolved.is_direct_member);
        assert!(resolved.is_primary);
        assert_eq!(resolved.inherited_from, None);
        assert_eq!(resolved.roles, BTreeSet::from(["instructor".to_string()]));
    }

    #[tokio::test]
    async fn cascades_from_grandparent_to_grandchild() {
        let (tree, resolver) = chain(&[]).await;
        let p = staff(vec![DepartmentMembership::new(
            tree.id("Grandparent"),
            ["instructor", "content-admin"],
        )]);

        let resolved = resolver.resolve_roles(&p, tree.id("Grandchild")).await.unwrap();
        assert!(!resolved.is_direct_member);
        assert_eq!(resolved.inherited_from, Some(tree.id("Grandparent")));
        assert_eq!(resolved.roles.len(), 2);
        assert!(resolved.roles.contains("content-admin"));
    }

    #[tokio::test]
    async fn nearest_ancestor_wins() {
        let (tree, resolver) = chain(&[]).await;
        let p = staff(vec![
            DepartmentMembership::new(tree.id("Grandparent"), ["content-admin"]),
            DepartmentMembership::new(tree.id("Parent"), ["instructor"]),
        ]);

        let resolved = resolver.resolve_roles(&p, tree.id("Grandchild")).await.unwrap();
        assert_eq!(resolved.inherited_from, Some(tree.id("Parent")));
        assert_eq!(resolved.roles, BTreeSet::from(["instructor".to_string()]));
    }

    #[tokio::test]
    async fn inactive_ancestor_membership_is_skipped() {
        let (tree, resolver) = chain(&[]).await;
        let p = staff(vec![
            DepartmentMembership::new(tree.id("Grandparent"), ["content-admin"]),
            DepartmentMembership::new(tree.id("Parent"), ["instructor"]).inactive(),
        ]);

        let resolved = resolver.resolve_roles(&p, tree.id("Child")).await.unwrap();
        assert_eq!(resolved.inherited_from, Some(tree.id("Grandparent")));
    }

    #[tokio::test]
    async fn walled_target_rejects_ancestor_membership() {
        let (tree, resolver) = chain(&["Child"]).await;
        let p = staff(vec![DepartmentMembership::new(tree.id("Grandparent"), ["instructor"])]);

        let err = resolver.resolve_roles(&p, tree.id("Child")).await.unwrap_err();
        assert!(matches!(err, AccessError::NotAMember(id) if id == tree.id("Child")));
    }

    #[tokio::test]
    async fn wall_on_the_path_blocks_descendants() {
        let (tree, resolver) = chain(&["Child"]).await;
        let p = staff(vec![DepartmentMembership::new(tree.id("Grandparent"), ["instructor"])]);

        let err = resolver.resolve_roles(&p, tree.id("Grandchild")).await.unwrap_err();
        assert!(matches!(err, AccessError::NotAMember(_)));
        // Parent sits above the wall and still inherits
        assert!(resolver.resolve_roles(&p, tree.id("Parent")).await.is_ok());
    }

    #[tokio::test]
    async fn membership_in_walled_department_cascades_below_it() {
        let (tree, resolver) = chain(&["Child"]).await;
        let p = staff(vec![DepartmentMembership::new(tree.id("Child"), ["instructor"])]);

        let resolved = resolver.resolve_roles(&p, tree.id("Grandchild")).await.unwrap();
        assert_eq!(resolved.inherited_from, Some(tree.id("Child")));
    }

    #[tokio::test]
    async fn explicit_membership_inside_walled_department_works() {
        let (tree, resolver) = chain(&["Child"]).await;
        let p = staff(vec![DepartmentMembership::new(tree.id("Child"), ["instructor"])]);
        assert!(resolver.resolve_roles(&p, tree.id("Child")).await.unwrap().is_direct_member);
    }

    #[tokio::test]
    async fn no_membership_anywhere_fails() {
        let (tree, resolver) = chain(&[]).await;
        let p = staff(vec![]);
        assert!(matches!(
            resolver.resolve_roles(&p, tree.id("Grandchild")).await,
            Err(AccessError::NotAMember(_))
        ));
    }

    #[tokio::test]
    async fn unknown_department_is_reported() {
        let (_tree, resolver) = chain(&[]).await;
        let p = staff(vec![]);
        assert!(matches!(
            resolver.resolve_roles(&p, Uuid::new_v4()).await,
            Err(AccessError::UnknownDepartment(_))
        ));
    }

    #[tokio::test]
    async fn cycle_is_an_error_not_a_hang() {
        let store = InMemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.insert_department(Department::new(a, "A", Some(b))).await;
        store.insert_department(Department::new(b, "B", Some(a))).await;
        let resolver = RoleResolver::new(Arc::new(store), 16);
        let p = staff(vec![DepartmentMembership::new(Uuid::new_v4(), ["instructor"])]);

        assert!(matches!(
            resolver.resolve_roles(&p, a).await,
            Err(AccessError::DepartmentCycle { .. })
        ));
    }

    #[tokio::test]
    async fn cascaded_children_stop_at_walls_and_direct_memberships() {
        let tree = Tree::new().await;
        let root = tree.add("Faculty", None, false).await;
        let open = tree.add("Open", Some(root), false).await;
        let deep = tree.add("Deep", Some(open), false).await;
        let walled = tree.add("Walled", Some(root), true).await;
        let _below_wall = tree.add("BelowWall", Some(walled), false).await;
        let own = tree.add("Own", Some(root), false).await;
        let _below_own = tree.add("BelowOwn", Some(own), false).await;
        let resolver = RoleResolver::new(Arc::new(tree.store.clone()), 16);

        let p = staff(vec![
            DepartmentMembership::new(root, ["instructor"]),
            DepartmentMembership::new(own, ["content-admin"]),
        ]);

        let children = resolver.cascaded_children(&p, root).await.unwrap();
        assert_eq!(child_ids(&children), vec![open, deep]);
        assert_eq!(children[0].parent, None);
        assert_eq!(children[1].parent, Some(0));
    }
}
