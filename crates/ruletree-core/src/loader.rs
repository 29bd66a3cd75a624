//! Tree loading and orphan pruning
//!
//! The tree is always rebuilt from the backend by walking from the roots down
//! through `list_children`. Anything the backend holds for the scope that the
//! walk never reached has a dangling parent chain; it is deleted on the spot
//! and logged as a warning. Cascading deletes and imports from earlier
//! sessions leave such rules behind, so this is routine maintenance.

use ruletree_core_types::schema::{EVENT_DUPLICATE_NODE, EVENT_ORPHAN_PRUNED, EVENT_PRUNE_FAILED};

use crate::errors::Result;
use crate::presentation::{present, RuleLabeler};
use crate::tree::RuleTree;
use crate::variant::RuleVariantOperations;

/// Outcome of a full load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Nodes placed in the tree
    pub loaded: usize,
    /// Unreachable rules deleted from the backend
    pub pruned: Vec<String>,
    /// Unreachable rules whose delete failed; they stay in the backend
    pub prune_failures: Vec<String>,
}

/// Build the tree for the bound scope and prune unreachable rules
///
/// # Errors
///
/// Fails only when listing the hierarchy fails. Individual prune failures are
/// logged and reported in `LoadReport::prune_failures`.
pub fn load_tree(
    ops: &mut dyn RuleVariantOperations,
    labeler: &dyn RuleLabeler,
) -> Result<(RuleTree, LoadReport)> {
    let mut tree = RuleTree::new();
    let loaded = attach_descendants(&*ops, labeler, &mut tree, None)?;
    tracing::debug!(
        scope = ops.scope(),
        variant = %ops.variant(),
        loaded,
        "hierarchy walk complete"
    );

    let mut report = LoadReport {
        loaded,
        ..LoadReport::default()
    };

    let unreachable: Vec<String> = ops
        .list_all()?
        .into_iter()
        .map(|record| record.id)
        .filter(|id| !tree.contains(id))
        .collect();

    for id in unreachable {
        match ops.delete(&id) {
            Ok(()) => {
                tracing::warn!(
                    event = EVENT_ORPHAN_PRUNED,
                    rule_id = %id,
                    scope = ops.scope(),
                    variant = %ops.variant(),
                    "Deleting unlinked rule"
                );
                report.pruned.push(id);
            }
            Err(err) => {
                tracing::warn!(
                    event = EVENT_PRUNE_FAILED,
                    rule_id = %id,
                    scope = ops.scope(),
                    variant = %ops.variant(),
                    error = %err,
                    "Could not delete unlinked rule"
                );
                report.prune_failures.push(id);
            }
        }
    }

    Ok((tree, report))
}

/// Add every descendant of `start` (the roots for `None`) to `tree`
///
/// `start` itself must already be in the tree. Children are added in the
/// backend's sibling order; a rule returned twice is skipped with a warning.
/// Returns the number of nodes added.
///
/// # Errors
///
/// Propagates backend listing errors and tree insertion errors.
pub fn attach_descendants(
    ops: &dyn RuleVariantOperations,
    labeler: &dyn RuleLabeler,
    tree: &mut RuleTree,
    start: Option<&str>,
) -> Result<usize> {
    let mut added = 0;
    let mut pending: Vec<Option<String>> = vec![start.map(str::to_string)];

    while let Some(parent) = pending.pop() {
        let children = ops.list_children(parent.as_deref())?;
        let mut next_level = Vec::with_capacity(children.len());

        for record in children {
            if tree.contains(&record.id) {
                tracing::warn!(
                    event = EVENT_DUPLICATE_NODE,
                    rule_id = %record.id,
                    scope = ops.scope(),
                    "Rule listed under more than one parent, keeping first occurrence"
                );
                continue;
            }
            let mut node = present(&record, labeler);
            node.parent_id = parent.clone();
            next_level.push(Some(node.id.clone()));
            tree.insert(node)?;
            added += 1;
        }

        pending.extend(next_level.into_iter().rev());
    }

    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RuleRecord, VariantTag};
    use crate::presentation::ConditionLabeler;
    use crate::repository::{MemoryRuleRepository, RuleHierarchyRepository};
    use crate::variant::resolve;

    #[test]
    fn test_load_keeps_sibling_order_and_depth() {
        let mut repo = MemoryRuleRepository::new(VariantTag::ReplySub);
        let a = repo.create("s", None).unwrap();
        let a1 = repo.create("s", Some(&a.id)).unwrap();
        let a2 = repo.create("s", Some(&a.id)).unwrap();
        let b = repo.create("s", None).unwrap();
        let mut ops = resolve(VariantTag::ReplySub, "s", Box::new(repo)).unwrap();

        let (tree, report) = load_tree(ops.as_mut(), &ConditionLabeler).unwrap();

        assert_eq!(report.loaded, 4);
        assert!(report.pruned.is_empty());
        assert_eq!(tree.roots(), [a.id.clone(), b.id]);
        assert_eq!(tree.children_of(Some(&a.id)), [a1.id, a2.id]);
    }

    #[test]
    fn test_load_prunes_orphans() {
        let mut repo = MemoryRuleRepository::new(VariantTag::TopLevel);
        let root = repo.create("s", None).unwrap();
        repo.insert_record(RuleRecord::new(
            "orphan",
            "s",
            VariantTag::TopLevel,
            Some("deleted-parent".to_string()),
        ));
        repo.insert_record(RuleRecord::new(
            "orphan-child",
            "s",
            VariantTag::TopLevel,
            Some("orphan".to_string()),
        ));
        let mut ops = resolve(VariantTag::TopLevel, "s", Box::new(repo)).unwrap();

        let (tree, report) = load_tree(ops.as_mut(), &ConditionLabeler).unwrap();

        assert_eq!(tree.len(), 1);
        assert!(tree.contains(&root.id));
        assert_eq!(report.pruned, vec!["orphan", "orphan-child"]);
        assert_eq!(ops.list_all().unwrap().len(), 1);
        assert_eq!(ops.repository().get_by_id("orphan-child").unwrap(), None);
    }

    #[test]
    fn test_attach_descendants_under_existing_node() {
        let mut repo = MemoryRuleRepository::new(VariantTag::DialogStep);
        let a = repo.create("s", None).unwrap();
        let ops = resolve(VariantTag::DialogStep, "s", Box::new(repo)).unwrap();
        let mut tree = RuleTree::new();
        attach_descendants(ops.as_ref(), &ConditionLabeler, &mut tree, None).unwrap();

        // Nothing below a yet
        assert_eq!(
            attach_descendants(ops.as_ref(), &ConditionLabeler, &mut tree, Some(&a.id)).unwrap(),
            0
        );
    }
}
