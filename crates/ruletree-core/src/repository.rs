//! Rule hierarchy repository seam
//!
//! One repository instance serves one rule variant. The engine only ever
//! talks to persistence through this trait; `MemoryRuleRepository` is the
//! in-process backend, `ruletree-store` provides the SQLite one.

use std::collections::HashMap;

use crate::errors::{Result, RuleTreeError};
use crate::model::{ExportBlob, MoveKind, RuleBundle, RulePayload, RuleRecord, VariantTag};

/// Persistent store of one variant's rule hierarchies
pub trait RuleHierarchyRepository {
    /// Variant whose rules this repository holds
    fn variant(&self) -> VariantTag;

    /// Every rule of the scope, in sibling order per parent
    fn get_all(&self, scope: &str) -> Result<Vec<RuleRecord>>;

    /// Direct children of `parent_id` (roots for `None`), in sibling order
    fn get_all_of_parent(&self, scope: &str, parent_id: Option<&str>) -> Result<Vec<RuleRecord>>;

    fn get_by_id(&self, id: &str) -> Result<Option<RuleRecord>>;

    /// Create an empty rule as the last child of `parent_id`
    ///
    /// # Errors
    ///
    /// Returns `ParentNotFound` if the parent does not exist.
    fn create(&mut self, scope: &str, parent_id: Option<&str>) -> Result<RuleRecord>;

    /// Delete a rule and all of its descendants
    ///
    /// Deleting an id that does not exist is a no-op.
    fn delete(&mut self, id: &str) -> Result<()>;

    /// Reparent/reorder one rule
    ///
    /// - `AsChild`: `source_id` becomes the first child of `new_parent_id`
    /// - `Above`: `source_id` takes the place of `sibling_ref_id`, which shifts down
    /// - `Below`: `source_id` lands directly after `sibling_ref_id`
    ///
    /// For `Above`/`Below` the new parent is the reference sibling's parent.
    fn move_rule(
        &mut self,
        kind: MoveKind,
        source_id: &str,
        new_parent_id: Option<&str>,
        sibling_ref_id: Option<&str>,
        scope: &str,
    ) -> Result<()>;

    /// Serialize a rule and its subtree
    fn export(&mut self, id: &str) -> Result<ExportBlob>;

    /// Materialize an exported subtree with fresh ids
    ///
    /// Returns the new subtree root, appended last among the siblings of the
    /// exported root's parent, or `None` when the blob holds no rules.
    fn import(&mut self, blob: &ExportBlob) -> Result<Option<RuleRecord>>;

    /// Replace the content of a rule, leaving its position untouched
    fn update_payload(&mut self, id: &str, payload: &RulePayload) -> Result<RuleRecord>;

    /// Remove temporary artifacts of an export
    fn discard_export(&mut self, blob: &ExportBlob) -> Result<()> {
        if let Some(path) = &blob.spill_path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(RuleTreeError::Io {
                        op: "discard_export".to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

impl<R: RuleHierarchyRepository + ?Sized> RuleHierarchyRepository for Box<R> {
    fn variant(&self) -> VariantTag {
        (**self).variant()
    }

    fn get_all(&self, scope: &str) -> Result<Vec<RuleRecord>> {
        (**self).get_all(scope)
    }

    fn get_all_of_parent(&self, scope: &str, parent_id: Option<&str>) -> Result<Vec<RuleRecord>> {
        (**self).get_all_of_parent(scope, parent_id)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<RuleRecord>> {
        (**self).get_by_id(id)
    }

    fn create(&mut self, scope: &str, parent_id: Option<&str>) -> Result<RuleRecord> {
        (**self).create(scope, parent_id)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        (**self).delete(id)
    }

    fn move_rule(
        &mut self,
        kind: MoveKind,
        source_id: &str,
        new_parent_id: Option<&str>,
        sibling_ref_id: Option<&str>,
        scope: &str,
    ) -> Result<()> {
        (**self).move_rule(kind, source_id, new_parent_id, sibling_ref_id, scope)
    }

    fn export(&mut self, id: &str) -> Result<ExportBlob> {
        (**self).export(id)
    }

    fn import(&mut self, blob: &ExportBlob) -> Result<Option<RuleRecord>> {
        (**self).import(blob)
    }

    fn update_payload(&mut self, id: &str, payload: &RulePayload) -> Result<RuleRecord> {
        (**self).update_payload(id, payload)
    }

    fn discard_export(&mut self, blob: &ExportBlob) -> Result<()> {
        (**self).discard_export(blob)
    }
}

/// Resolved placement of a moved rule
///
/// Every sibling under `parent_id` whose order is at least `shift_from` moves
/// down by one before `source` is written with `order`. For `Above` this
/// includes the reference itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlacement {
    pub parent_id: Option<String>,
    pub order: u32,
    pub shift_from: u32,
}

/// Compute where a moved rule lands
///
/// `reference` is the `sibling_ref_id` record for `Above`/`Below`.
///
/// # Errors
///
/// Returns `InvalidInput` when `Above`/`Below` lack a reference.
pub fn plan_move(
    kind: MoveKind,
    new_parent_id: Option<&str>,
    reference: Option<&RuleRecord>,
) -> Result<MovePlacement> {
    match kind {
        MoveKind::AsChild => Ok(MovePlacement {
            parent_id: new_parent_id.map(str::to_string),
            order: 0,
            shift_from: 0,
        }),
        MoveKind::Above | MoveKind::Below => {
            let reference = reference.ok_or_else(|| RuleTreeError::InvalidInput {
                reason: format!("{} move requires a sibling reference", kind),
            })?;
            let order = if kind == MoveKind::Above {
                reference.order
            } else {
                reference.order + 1
            };
            Ok(MovePlacement {
                parent_id: reference.parent_id.clone(),
                order,
                shift_from: order,
            })
        }
    }
}

/// In-process repository for one variant
///
/// Holds every scope of its variant. Sibling ties on `order` resolve by
/// insertion sequence, which keeps listings deterministic.
#[derive(Debug, Clone)]
pub struct MemoryRuleRepository {
    variant: VariantTag,
    rules: HashMap<String, RuleRecord>,
    sequence: HashMap<String, u64>,
    next_sequence: u64,
}

impl MemoryRuleRepository {
    pub fn new(variant: VariantTag) -> Self {
        Self {
            variant,
            rules: HashMap::new(),
            sequence: HashMap::new(),
            next_sequence: 0,
        }
    }

    /// Store a record verbatim, bypassing parent and order bookkeeping
    ///
    /// Used to seed fixtures, including orphans whose parent does not exist.
    pub fn insert_record(&mut self, record: RuleRecord) {
        self.sequence.insert(record.id.clone(), self.next_sequence);
        self.next_sequence += 1;
        self.rules.insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn sorted(&self, mut records: Vec<RuleRecord>) -> Vec<RuleRecord> {
        records.sort_by_key(|r| (r.order, self.sequence.get(&r.id).copied().unwrap_or(0)));
        records
    }

    fn siblings(&self, scope: &str, parent_id: Option<&str>) -> Vec<RuleRecord> {
        let list = self
            .rules
            .values()
            .filter(|r| r.scope == scope && r.parent_id.as_deref() == parent_id)
            .cloned()
            .collect();
        self.sorted(list)
    }

    fn next_order(&self, scope: &str, parent_id: Option<&str>) -> u32 {
        self.rules
            .values()
            .filter(|r| r.scope == scope && r.parent_id.as_deref() == parent_id)
            .map(|r| r.order + 1)
            .max()
            .unwrap_or(0)
    }

    fn require(&self, id: &str) -> Result<&RuleRecord> {
        self.rules.get(id).ok_or_else(|| RuleTreeError::RuleNotFound {
            rule_id: id.to_string(),
        })
    }

    fn is_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        let mut current = self.rules.get(candidate).and_then(|r| r.parent_id.clone());
        let mut steps = 0;
        while let Some(pid) = current {
            if pid == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.rules.len() {
                return false;
            }
            current = self.rules.get(&pid).and_then(|r| r.parent_id.clone());
        }
        false
    }
}

impl RuleHierarchyRepository for MemoryRuleRepository {
    fn variant(&self) -> VariantTag {
        self.variant
    }

    fn get_all(&self, scope: &str) -> Result<Vec<RuleRecord>> {
        let all = self
            .rules
            .values()
            .filter(|r| r.scope == scope)
            .cloned()
            .collect();
        Ok(self.sorted(all))
    }

    fn get_all_of_parent(&self, scope: &str, parent_id: Option<&str>) -> Result<Vec<RuleRecord>> {
        Ok(self.siblings(scope, parent_id))
    }

    fn get_by_id(&self, id: &str) -> Result<Option<RuleRecord>> {
        Ok(self.rules.get(id).cloned())
    }

    fn create(&mut self, scope: &str, parent_id: Option<&str>) -> Result<RuleRecord> {
        if let Some(pid) = parent_id {
            if !self.rules.contains_key(pid) {
                return Err(RuleTreeError::ParentNotFound {
                    parent_id: pid.to_string(),
                });
            }
        }
        let record = RuleRecord::new(
            uuid::Uuid::now_v7().to_string(),
            scope,
            self.variant,
            parent_id.map(str::to_string),
        )
        .with_order(self.next_order(scope, parent_id));

        self.insert_record(record.clone());
        Ok(record)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        if !self.rules.contains_key(id) {
            return Ok(());
        }
        let doomed: Vec<String> = self
            .rules
            .keys()
            .filter(|candidate| candidate.as_str() == id || self.is_descendant(candidate, id))
            .cloned()
            .collect();
        for rid in doomed {
            self.rules.remove(&rid);
            self.sequence.remove(&rid);
        }
        Ok(())
    }

    fn move_rule(
        &mut self,
        kind: MoveKind,
        source_id: &str,
        new_parent_id: Option<&str>,
        sibling_ref_id: Option<&str>,
        scope: &str,
    ) -> Result<()> {
        self.require(source_id)?;
        let reference = match sibling_ref_id {
            Some(rid) => Some(self.require(rid)?.clone()),
            None => None,
        };
        if kind == MoveKind::AsChild {
            if let Some(pid) = new_parent_id {
                if !self.rules.contains_key(pid) {
                    return Err(RuleTreeError::ParentNotFound {
                        parent_id: pid.to_string(),
                    });
                }
            }
        }

        let placement = plan_move(kind, new_parent_id, reference.as_ref())?;
        if let Some(pid) = placement.parent_id.as_deref() {
            if pid == source_id || self.is_descendant(pid, source_id) {
                return Err(RuleTreeError::CycleDetected {
                    rule_id: source_id.to_string(),
                    parent_id: pid.to_string(),
                });
            }
        }

        for record in self.rules.values_mut() {
            if record.scope == scope
                && record.parent_id == placement.parent_id
                && record.order >= placement.shift_from
                && record.id != source_id
            {
                record.order += 1;
            }
        }

        let source = self
            .rules
            .get_mut(source_id)
            .ok_or_else(|| RuleTreeError::RuleNotFound {
                rule_id: source_id.to_string(),
            })?;
        source.parent_id = placement.parent_id;
        source.order = placement.order;
        Ok(())
    }

    fn export(&mut self, id: &str) -> Result<ExportBlob> {
        let root = self.require(id)?.clone();
        let scope = root.scope.clone();
        let bundle = RuleBundle::collect(root, |pid| Ok(self.siblings(&scope, Some(pid))))?;
        Ok(ExportBlob::in_memory(bundle.to_bytes()?))
    }

    fn import(&mut self, blob: &ExportBlob) -> Result<Option<RuleRecord>> {
        let bundle = RuleBundle::from_bytes(&blob.bytes)?;
        if let Some(foreign) = bundle.rules.iter().find(|r| r.variant != self.variant) {
            return Err(RuleTreeError::InvalidExport {
                reason: format!(
                    "rule {} is a {} rule, expected {}",
                    foreign.id, foreign.variant, self.variant
                ),
            });
        }

        let mut records = bundle.reissue(|| uuid::Uuid::now_v7().to_string())?;
        let Some(root) = records.first_mut() else {
            return Ok(None);
        };
        if let Some(pid) = root.parent_id.as_deref() {
            if !self.rules.contains_key(pid) {
                return Err(RuleTreeError::ParentNotFound {
                    parent_id: pid.to_string(),
                });
            }
        }
        root.order = self.next_order(&root.scope, root.parent_id.as_deref());
        let imported_root = root.clone();

        for record in records {
            self.insert_record(record);
        }
        Ok(Some(imported_root))
    }

    fn update_payload(&mut self, id: &str, payload: &RulePayload) -> Result<RuleRecord> {
        let record = self
            .rules
            .get_mut(id)
            .ok_or_else(|| RuleTreeError::RuleNotFound {
                rule_id: id.to_string(),
            })?;
        record.payload = payload.clone();
        Ok(record.clone())
    }
}
