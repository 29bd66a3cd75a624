//! Drag-and-drop reordering
//!
//! A drop gesture becomes one structural change of the in-memory tree plus
//! one backend move call. The tree only knows "insert after sibling", so a
//! drop above a target is expressed as two such steps.

use crate::errors::Result;
use crate::model::{MoveKind, VerticalZone};
use crate::tree::RuleTree;

/// Why a drop gesture was refused without touching anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    /// Source and target are the same node
    SelfDrop,
    /// The variant does not allow dragging this rule
    NotDragEligible,
    /// The drop would place the source under itself or its own descendant
    TargetIsDescendant,
    /// Source or target is not in the tree
    UnknownNode,
}

impl DropRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropRejection::SelfDrop => "self_drop",
            DropRejection::NotDragEligible => "not_drag_eligible",
            DropRejection::TargetIsDescendant => "target_is_descendant",
            DropRejection::UnknownNode => "unknown_node",
        }
    }
}

/// A move derived from a drop gesture, exactly as it is sent to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub kind: MoveKind,
    pub source_id: String,
    /// New parent (None = root level)
    pub parent_id: Option<String>,
    /// Target of an Above/Below move; None for AsChild
    pub sibling_ref_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Moved(PlannedMove),
    Rejected(DropRejection),
}

/// Translate a gesture into a move against the current tree
///
/// # Errors
///
/// Returns `UnknownNode` when either id is missing from the tree.
pub fn plan_drop(
    tree: &RuleTree,
    source_id: &str,
    target_id: &str,
    zone: VerticalZone,
) -> std::result::Result<PlannedMove, DropRejection> {
    if !tree.contains(source_id) {
        return Err(DropRejection::UnknownNode);
    }
    let target_parent = tree
        .parent_of(target_id)
        .map_err(|_| DropRejection::UnknownNode)?;

    let kind = zone.move_kind();
    let (parent_id, sibling_ref_id) = match kind {
        MoveKind::AsChild => (Some(target_id.to_string()), None),
        MoveKind::Above | MoveKind::Below => (
            target_parent.map(str::to_string),
            Some(target_id.to_string()),
        ),
    };

    Ok(PlannedMove {
        kind,
        source_id: source_id.to_string(),
        parent_id,
        sibling_ref_id,
    })
}

/// True when the planned parent is the source itself or one of its descendants
pub fn creates_cycle(tree: &RuleTree, plan: &PlannedMove) -> bool {
    match plan.parent_id.as_deref() {
        None => false,
        Some(pid) => pid == plan.source_id || tree.is_ancestor(&plan.source_id, pid),
    }
}

/// Apply a planned move to the in-memory tree
///
/// - `AsChild`: source becomes the first child of the new parent
/// - `Above`: source lands immediately before the reference sibling
/// - `Below`: source lands immediately after the reference sibling
///
/// # Errors
///
/// Propagates tree errors; a cycle is refused before anything changes.
pub fn apply_local(tree: &mut RuleTree, plan: &PlannedMove) -> Result<()> {
    let source = plan.source_id.as_str();
    tree.set_parent(source, plan.parent_id.as_deref())?;

    match (plan.kind, plan.sibling_ref_id.as_deref()) {
        (MoveKind::AsChild, _) | (_, None) => tree.move_after_sibling(source, None),
        (MoveKind::Above, Some(target)) => {
            tree.move_after_sibling(source, Some(target))?;
            tree.move_after_sibling(target, Some(source))
        }
        (MoveKind::Below, Some(target)) => tree.move_after_sibling(source, Some(target)),
    }
}

/// Single-slot cache for the drag-eligibility predicate
///
/// Hosts poll eligibility for the same node on every frame of one drag, so
/// remembering the last answer is enough. Any tree mutation invalidates it.
#[derive(Debug, Clone, Default)]
pub struct DragEligibilityMemo {
    enabled: bool,
    last: Option<(String, bool)>,
}

impl DragEligibilityMemo {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last: None,
        }
    }

    /// Return the cached answer for `id` or compute and remember it
    ///
    /// # Errors
    ///
    /// Propagates errors from `compute`; errors are not cached.
    pub fn get_or_compute<F>(&mut self, id: &str, compute: F) -> Result<bool>
    where
        F: FnOnce() -> Result<bool>,
    {
        if self.enabled {
            if let Some((last_id, answer)) = &self.last {
                if last_id == id {
                    return Ok(*answer);
                }
            }
        }
        let answer = compute()?;
        if self.enabled {
            self.last = Some((id.to_string(), answer));
        }
        Ok(answer)
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RuleTreeError;
    use crate::model::{IconCategory, RuleNode, RulePayload, VariantTag};
    use proptest::prelude::*;

    fn node(id: &str, parent: Option<&str>) -> RuleNode {
        RuleNode {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            variant: VariantTag::ReplySub,
            payload: RulePayload::default(),
            label: String::new(),
            icon: IconCategory::Default,
        }
    }

    fn flat(n: usize) -> RuleTree {
        let mut tree = RuleTree::new();
        for i in 0..n {
            tree.insert(node(&format!("r{}", i), None)).unwrap();
        }
        tree
    }

    fn drop(tree: &mut RuleTree, source: &str, target: &str, zone: VerticalZone) -> PlannedMove {
        let plan = plan_drop(tree, source, target, zone).unwrap();
        apply_local(tree, &plan).unwrap();
        plan
    }

    #[test]
    fn test_middle_plans_as_child_without_reference() {
        let tree = flat(2);
        let plan = plan_drop(&tree, "r0", "r1", VerticalZone::Middle).unwrap();
        assert_eq!(plan.kind, MoveKind::AsChild);
        assert_eq!(plan.parent_id.as_deref(), Some("r1"));
        assert_eq!(plan.sibling_ref_id, None);
    }

    #[test]
    fn test_top_and_bottom_use_target_parent() {
        let mut tree = flat(2);
        tree.insert(node("c", Some("r1"))).unwrap();
        let plan = plan_drop(&tree, "r0", "c", VerticalZone::Top).unwrap();
        assert_eq!(plan.kind, MoveKind::Above);
        assert_eq!(plan.parent_id.as_deref(), Some("r1"));
        assert_eq!(plan.sibling_ref_id.as_deref(), Some("c"));
    }

    #[test]
    fn test_unknown_nodes_are_rejected() {
        let tree = flat(1);
        assert_eq!(
            plan_drop(&tree, "r0", "ghost", VerticalZone::Top),
            Err(DropRejection::UnknownNode)
        );
        assert_eq!(
            plan_drop(&tree, "ghost", "r0", VerticalZone::Top),
            Err(DropRejection::UnknownNode)
        );
    }

    #[test]
    fn test_middle_drop_becomes_first_child() {
        let mut tree = flat(3);
        tree.insert(node("c", Some("r2"))).unwrap();
        drop(&mut tree, "r0", "r2", VerticalZone::Middle);
        assert_eq!(tree.children_of(Some("r2")), ["r0", "c"]);
        assert_eq!(tree.roots(), ["r1", "r2"]);
    }

    #[test]
    fn test_top_drop_lands_before_target() {
        let mut tree = flat(4);
        drop(&mut tree, "r3", "r1", VerticalZone::Top);
        assert_eq!(tree.roots(), ["r0", "r3", "r1", "r2"]);
    }

    #[test]
    fn test_bottom_drop_lands_after_target() {
        let mut tree = flat(4);
        drop(&mut tree, "r0", "r2", VerticalZone::Bottom);
        assert_eq!(tree.roots(), ["r1", "r2", "r0", "r3"]);
    }

    #[test]
    fn test_cycle_detection() {
        let mut tree = flat(1);
        tree.insert(node("child", Some("r0"))).unwrap();
        tree.insert(node("grandchild", Some("child"))).unwrap();

        let onto_descendant = plan_drop(&tree, "r0", "grandchild", VerticalZone::Middle).unwrap();
        assert!(creates_cycle(&tree, &onto_descendant));

        let beside_child = plan_drop(&tree, "r0", "child", VerticalZone::Bottom).unwrap();
        assert!(creates_cycle(&tree, &beside_child));

        let harmless = plan_drop(&tree, "grandchild", "r0", VerticalZone::Top).unwrap();
        assert!(!creates_cycle(&tree, &harmless));

        let before = tree.clone();
        assert!(matches!(
            apply_local(&mut tree, &onto_descendant),
            Err(RuleTreeError::CycleDetected { .. })
        ));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_memo_caches_single_slot() {
        let mut memo = DragEligibilityMemo::new(true);
        let mut calls = 0;
        for _ in 0..5 {
            memo.get_or_compute("a", || {
                calls += 1;
                Ok(true)
            })
            .unwrap();
        }
        assert_eq!(calls, 1);

        memo.get_or_compute("b", || {
            calls += 1;
            Ok(false)
        })
        .unwrap();
        memo.get_or_compute("a", || {
            calls += 1;
            Ok(true)
        })
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_memo_disabled_always_computes() {
        let mut memo = DragEligibilityMemo::new(false);
        let mut calls = 0;
        for _ in 0..3 {
            memo.get_or_compute("a", || {
                calls += 1;
                Ok(true)
            })
            .unwrap();
        }
        assert_eq!(calls, 3);
    }

    proptest! {
        #[test]
        fn prop_sibling_drops_place_source_next_to_target(
            n in 2usize..8,
            s in 0usize..8,
            t in 0usize..8,
            above in any::<bool>(),
        ) {
            let s = s % n;
            let t = t % n;
            prop_assume!(s != t);
            let mut tree = flat(n);
            let source = format!("r{}", s);
            let target = format!("r{}", t);
            let zone = if above { VerticalZone::Top } else { VerticalZone::Bottom };

            drop(&mut tree, &source, &target, zone);

            let roots = tree.roots();
            prop_assert_eq!(roots.len(), n);
            let si = roots.iter().position(|r| *r == source).unwrap();
            let ti = roots.iter().position(|r| *r == target).unwrap();
            if above {
                prop_assert_eq!(si + 1, ti);
            } else {
                prop_assert_eq!(ti + 1, si);
            }
        }

        #[test]
        fn prop_middle_drop_is_first_child(n in 2usize..8, s in 0usize..8, t in 0usize..8) {
            let s = s % n;
            let t = t % n;
            prop_assume!(s != t);
            let mut tree = flat(n);
            tree.insert(node("existing", Some(&format!("r{}", t)))).unwrap();
            let source = format!("r{}", s);
            let target = format!("r{}", t);

            drop(&mut tree, &source, &target, VerticalZone::Middle);

            prop_assert_eq!(tree.parent_of(&source).unwrap(), Some(target.as_str()));
            prop_assert_eq!(&tree.children_of(Some(&target))[0], &source);
        }
    }
}
