//! In-memory ordered forest of rule nodes
//!
//! Mirrors the hierarchical container a tree widget binds to: nodes keyed by
//! id, an ordered root list and an ordered child list per parent. The only
//! ordering primitive is "move after sibling"; everything else appends.

use std::collections::{HashMap, HashSet};

use crate::errors::{Result, RuleTreeError};
use crate::model::RuleNode;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTree {
    nodes: HashMap<String, RuleNode>,
    roots: Vec<String>,
    children: HashMap<String, Vec<String>>,
}

impl RuleTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get a node by id
    ///
    /// # Errors
    ///
    /// Returns `RuleNotInTree` if the id is unknown.
    pub fn get(&self, id: &str) -> Result<&RuleNode> {
        self.nodes.get(id).ok_or_else(|| RuleTreeError::RuleNotInTree {
            rule_id: id.to_string(),
        })
    }

    /// Get a mutable node by id
    ///
    /// Structural fields (`id`, `parent_id`) must not be changed through this
    /// reference; use `set_parent` instead.
    ///
    /// # Errors
    ///
    /// Returns `RuleNotInTree` if the id is unknown.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut RuleNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| RuleTreeError::RuleNotInTree {
                rule_id: id.to_string(),
            })
    }

    /// Current parent of a node (None for roots)
    ///
    /// # Errors
    ///
    /// Returns `RuleNotInTree` if the id is unknown.
    pub fn parent_of(&self, id: &str) -> Result<Option<&str>> {
        Ok(self.get(id)?.parent_id.as_deref())
    }

    /// Ordered children of `parent`, or the roots for `None`
    pub fn children_of(&self, parent: Option<&str>) -> &[String] {
        match parent {
            None => &self.roots,
            Some(pid) => self.children.get(pid).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn has_children(&self, id: &str) -> bool {
        !self.children_of(Some(id)).is_empty()
    }

    /// Insert a node as the last child of its `parent_id`
    ///
    /// # Errors
    ///
    /// - `RuleAlreadyInTree` if the id is taken
    /// - `ParentNotFound` if the parent is not in the tree
    pub fn insert(&mut self, node: RuleNode) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(RuleTreeError::RuleAlreadyInTree { rule_id: node.id });
        }
        if let Some(pid) = node.parent_id.as_deref() {
            if !self.nodes.contains_key(pid) {
                return Err(RuleTreeError::ParentNotFound {
                    parent_id: pid.to_string(),
                });
            }
        }

        self.sibling_list_mut(node.parent_id.as_deref())
            .push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Reparent a node, appending it as the last child of `new_parent`
    ///
    /// # Errors
    ///
    /// - `RuleNotInTree` if the node is unknown
    /// - `ParentNotFound` if the new parent is unknown
    /// - `CycleDetected` if the new parent is the node itself or a descendant
    pub fn set_parent(&mut self, id: &str, new_parent: Option<&str>) -> Result<()> {
        let old_parent = self.parent_of(id)?.map(str::to_string);

        if let Some(pid) = new_parent {
            if !self.nodes.contains_key(pid) {
                return Err(RuleTreeError::ParentNotFound {
                    parent_id: pid.to_string(),
                });
            }
            if pid == id || self.is_ancestor(id, pid) {
                return Err(RuleTreeError::CycleDetected {
                    rule_id: id.to_string(),
                    parent_id: pid.to_string(),
                });
            }
        }

        self.sibling_list_mut(old_parent.as_deref())
            .retain(|sibling| sibling != id);
        self.sibling_list_mut(new_parent).push(id.to_string());
        self.get_mut(id)?.parent_id = new_parent.map(str::to_string);
        Ok(())
    }

    /// Reposition `id` directly after `after` among its siblings
    ///
    /// `None` moves the node to the first position.
    ///
    /// # Errors
    ///
    /// - `RuleNotInTree` if either node is unknown
    /// - `NotSiblings` if `after` has a different parent
    pub fn move_after_sibling(&mut self, id: &str, after: Option<&str>) -> Result<()> {
        let parent = self.parent_of(id)?.map(str::to_string);
        if let Some(sibling) = after {
            if self.parent_of(sibling)? != parent.as_deref() {
                return Err(RuleTreeError::NotSiblings {
                    rule_id: id.to_string(),
                    sibling_id: sibling.to_string(),
                });
            }
            if sibling == id {
                return Ok(());
            }
        }

        let list = self.sibling_list_mut(parent.as_deref());
        list.retain(|s| s != id);
        let position = match after {
            None => 0,
            Some(sibling) => list
                .iter()
                .position(|s| s == sibling)
                .map(|p| p + 1)
                .unwrap_or(list.len()),
        };
        list.insert(position, id.to_string());
        Ok(())
    }

    /// Remove a node and its whole subtree
    ///
    /// Returns the removed ids in pre-order.
    ///
    /// # Errors
    ///
    /// Returns `RuleNotInTree` if the id is unknown.
    pub fn remove_recursive(&mut self, id: &str) -> Result<Vec<String>> {
        let parent = self.parent_of(id)?.map(str::to_string);
        let removed = self.descendants_inclusive(id);

        self.sibling_list_mut(parent.as_deref()).retain(|s| s != id);
        for rid in &removed {
            self.nodes.remove(rid);
            self.children.remove(rid);
        }
        Ok(removed)
    }

    /// True when `ancestor` lies on the parent chain of `id`
    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());

        while let Some(pid) = current {
            if pid == ancestor {
                return true;
            }
            if !visited.insert(pid) {
                return false;
            }
            current = self.nodes.get(pid).and_then(|n| n.parent_id.as_deref());
        }
        false
    }

    /// `id` followed by all of its descendants, pre-order
    pub fn descendants_inclusive(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            stack.extend(self.children_of(Some(current.as_str())).iter().rev().cloned());
            out.push(current);
        }
        out
    }

    /// Whole forest in display order with depth (roots at depth 0)
    pub fn walk(&self) -> Vec<(usize, &RuleNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, &str)> =
            self.roots.iter().rev().map(|id| (0, id.as_str())).collect();

        while let Some((depth, id)) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push((depth, node));
                stack.extend(
                    self.children_of(Some(id))
                        .iter()
                        .rev()
                        .map(|c| (depth + 1, c.as_str())),
                );
            }
        }
        out
    }

    fn sibling_list_mut(&mut self, parent: Option<&str>) -> &mut Vec<String> {
        match parent {
            None => &mut self.roots,
            Some(pid) => self.children.entry(pid.to_string()).or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IconCategory, RulePayload, VariantTag};

    fn node(id: &str, parent: Option<&str>) -> RuleNode {
        RuleNode {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            variant: VariantTag::TopLevel,
            payload: RulePayload::default(),
            label: id.to_string(),
            icon: IconCategory::Default,
        }
    }

    fn sample() -> RuleTree {
        // a
        // ├── b
        // │   └── c
        // └── d
        // e
        let mut tree = RuleTree::new();
        tree.insert(node("a", None)).unwrap();
        tree.insert(node("b", Some("a"))).unwrap();
        tree.insert(node("c", Some("b"))).unwrap();
        tree.insert(node("d", Some("a"))).unwrap();
        tree.insert(node("e", None)).unwrap();
        tree
    }

    #[test]
    fn test_insert_appends_in_order() {
        let tree = sample();
        assert_eq!(tree.roots(), ["a", "e"]);
        assert_eq!(tree.children_of(Some("a")), ["b", "d"]);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_insert_rejects_duplicate_and_unknown_parent() {
        let mut tree = sample();
        assert!(matches!(
            tree.insert(node("a", None)),
            Err(RuleTreeError::RuleAlreadyInTree { .. })
        ));
        assert!(matches!(
            tree.insert(node("x", Some("nope"))),
            Err(RuleTreeError::ParentNotFound { .. })
        ));
    }

    #[test]
    fn test_set_parent_appends_and_updates_node() {
        let mut tree = sample();
        tree.set_parent("e", Some("a")).unwrap();
        assert_eq!(tree.children_of(Some("a")), ["b", "d", "e"]);
        assert_eq!(tree.roots(), ["a"]);
        assert_eq!(tree.parent_of("e").unwrap(), Some("a"));
    }

    #[test]
    fn test_set_parent_refuses_cycles() {
        let mut tree = sample();
        let before = tree.clone();
        assert!(matches!(
            tree.set_parent("a", Some("c")),
            Err(RuleTreeError::CycleDetected { .. })
        ));
        assert!(matches!(
            tree.set_parent("a", Some("a")),
            Err(RuleTreeError::CycleDetected { .. })
        ));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_move_after_sibling_none_moves_first() {
        let mut tree = sample();
        tree.move_after_sibling("d", None).unwrap();
        assert_eq!(tree.children_of(Some("a")), ["d", "b"]);
    }

    #[test]
    fn test_move_after_sibling_places_directly_after() {
        let mut tree = sample();
        tree.insert(node("f", None)).unwrap();
        tree.move_after_sibling("a", Some("f")).unwrap();
        assert_eq!(tree.roots(), ["e", "f", "a"]);
        tree.move_after_sibling("f", Some("e")).unwrap();
        assert_eq!(tree.roots(), ["e", "f", "a"]);
    }

    #[test]
    fn test_move_after_sibling_rejects_non_sibling() {
        let mut tree = sample();
        assert!(matches!(
            tree.move_after_sibling("c", Some("d")),
            Err(RuleTreeError::NotSiblings { .. })
        ));
    }

    #[test]
    fn test_remove_recursive_drops_subtree() {
        let mut tree = sample();
        let removed = tree.remove_recursive("a").unwrap();
        assert_eq!(removed, vec!["a", "b", "c", "d"]);
        assert_eq!(tree.roots(), ["e"]);
        assert_eq!(tree.len(), 1);
        assert!(!tree.contains("c"));
    }

    #[test]
    fn test_is_ancestor() {
        let tree = sample();
        assert!(tree.is_ancestor("a", "c"));
        assert!(!tree.is_ancestor("c", "a"));
        assert!(!tree.is_ancestor("e", "c"));
    }

    #[test]
    fn test_walk_is_display_order() {
        let tree = sample();
        let walked: Vec<_> = tree
            .walk()
            .into_iter()
            .map(|(depth, n)| (depth, n.id.as_str()))
            .collect();
        assert_eq!(
            walked,
            vec![(0, "a"), (1, "b"), (2, "c"), (1, "d"), (0, "e")]
        );
    }
}
