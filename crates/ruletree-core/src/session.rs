//! Selection and edit session
//!
//! `RuleTreeSession` is the object a host UI talks to. It owns the in-memory
//! tree, the bound variant operations, the current selection and the set of
//! expanded items. `initialize`, `reload` and every `on_*` gesture handler:
//! - mint a `RequestId` shared by all events of that call
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Content and structural changes go to the backend first for create, edit,
//! delete and duplicate. Drops mutate the tree optimistically and roll back
//! when the backend refuses the move (see `SessionOptions`).

use std::collections::BTreeSet;
use std::time::Instant;

use ruletree_core_types::schema::{EVENT_DROP_REJECTED, EVENT_MOVE_ROLLED_BACK};
use ruletree_core_types::{RequestId, SessionId};

use crate::config::SessionOptions;
use crate::errors::{Result, RuleTreeError};
use crate::loader::{attach_descendants, load_tree, LoadReport};
use crate::model::{RulePayload, RuleRecord, VariantTag, VerticalZone};
use crate::presentation::{present, ConditionLabeler, RuleLabeler};
use crate::reorder::{self, DragEligibilityMemo, DropOutcome, DropRejection, PlannedMove};
use crate::repository::RuleHierarchyRepository;
use crate::tree::RuleTree;
use crate::variant::{resolve, RuleVariantOperations};
use crate::{log_op_end, log_op_error, log_op_start};

/// Edit window collaborator
///
/// Receives the current record; returns the new payload when the user saves,
/// `None` when the edit is cancelled.
pub trait RuleEditor {
    fn edit(&mut self, record: &RuleRecord) -> Option<RulePayload>;
}

impl<F> RuleEditor for F
where
    F: FnMut(&RuleRecord) -> Option<RulePayload>,
{
    fn edit(&mut self, record: &RuleRecord) -> Option<RulePayload> {
        self(record)
    }
}

/// Result of a duplicate request
///
/// A failed duplicate is a recoverable warning for the host, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateOutcome {
    Duplicated { id: String },
    Failed { reason: String },
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

pub struct RuleTreeSession {
    session_id: SessionId,
    ops: Box<dyn RuleVariantOperations>,
    labeler: Box<dyn RuleLabeler>,
    options: SessionOptions,
    tree: RuleTree,
    selection: Option<String>,
    expanded: BTreeSet<String>,
    memo: DragEligibilityMemo,
    last_load: LoadReport,
    last_request_id: Option<RequestId>,
}

impl std::fmt::Debug for RuleTreeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleTreeSession")
            .field("session_id", &self.session_id)
            .field("scope", &self.ops.scope())
            .field("variant", &self.ops.variant())
            .field("nodes", &self.tree.len())
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl RuleTreeSession {
    /// Bind a session to one scope and variant and load its tree
    ///
    /// Labels are built with `ConditionLabeler`.
    ///
    /// # Errors
    ///
    /// Fails if the repository holds another variant or the initial load fails.
    pub fn initialize(
        scope: impl Into<String>,
        variant: VariantTag,
        repository: Box<dyn RuleHierarchyRepository>,
        options: SessionOptions,
    ) -> Result<Self> {
        Self::initialize_with_labeler(
            scope,
            variant,
            repository,
            options,
            Box::new(ConditionLabeler),
        )
    }

    /// Like `initialize`, with a custom label builder
    pub fn initialize_with_labeler(
        scope: impl Into<String>,
        variant: VariantTag,
        repository: Box<dyn RuleHierarchyRepository>,
        options: SessionOptions,
        labeler: Box<dyn RuleLabeler>,
    ) -> Result<Self> {
        let scope = scope.into();
        let session_id = SessionId::new();
        log_op_start!(
            "initialize",
            session_id = %session_id,
            scope = %scope,
            variant = %variant
        );
        let start = Instant::now();

        let result = resolve(variant, scope, repository).and_then(|mut ops| {
            let (tree, report) = load_tree(ops.as_mut(), labeler.as_ref())?;
            Ok(Self {
                session_id: session_id.clone(),
                ops,
                labeler,
                options,
                tree,
                selection: None,
                expanded: BTreeSet::new(),
                memo: DragEligibilityMemo::new(options.memoize_drag_eligibility),
                last_load: report,
                last_request_id: None,
            })
        });

        match result {
            Ok(session) => {
                log_op_end!(
                    "initialize",
                    duration_ms = elapsed_ms(start),
                    session_id = %session.session_id,
                    loaded = session.last_load.loaded,
                    pruned = session.last_load.pruned.len()
                );
                Ok(session)
            }
            Err(e) => {
                log_op_error!(
                    "initialize",
                    &e,
                    duration_ms = elapsed_ms(start),
                    session_id = %session_id
                );
                Err(e)
            }
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn scope(&self) -> &str {
        self.ops.scope()
    }

    pub fn variant(&self) -> VariantTag {
        self.ops.variant()
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn tree(&self) -> &RuleTree {
        &self.tree
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Report of the most recent load (initial or `reload`)
    pub fn last_load_report(&self) -> &LoadReport {
        &self.last_load
    }

    /// Direct access to the bound operations, for hosts that read records
    pub fn operations(&self) -> &dyn RuleVariantOperations {
        self.ops.as_ref()
    }

    /// Start a gesture: mint its request id and emit the `start` event
    fn begin(&mut self, op: &'static str) -> (RequestId, Instant) {
        let request_id = RequestId::new();
        log_op_start!(
            op,
            session_id = %self.session_id,
            request_id = %request_id,
            rule_id = ?self.selection
        );
        self.last_request_id = Some(request_id.clone());
        (request_id, Instant::now())
    }

    fn log_failure(
        &self,
        op: &'static str,
        request_id: &RequestId,
        err: &RuleTreeError,
        start: Instant,
    ) {
        log_op_error!(
            op,
            err,
            duration_ms = elapsed_ms(start),
            session_id = %self.session_id,
            request_id = %request_id,
            scope = self.ops.scope()
        );
    }

    fn log_success(&self, op: &'static str, request_id: &RequestId, start: Instant) {
        log_op_end!(
            op,
            duration_ms = elapsed_ms(start),
            session_id = %self.session_id,
            request_id = %request_id,
            scope = self.ops.scope()
        );
    }

    /// Request id of the most recent gesture, as stamped on its log events
    pub fn last_request_id(&self) -> Option<&RequestId> {
        self.last_request_id.as_ref()
    }

    fn require_selection(&self, op: &str) -> Result<String> {
        self.selection
            .clone()
            .ok_or_else(|| RuleTreeError::NothingSelected { op: op.to_string() })
    }

    /// Rebuild the tree from the backend, pruning orphans again
    ///
    /// The selection survives when the selected rule is still present.
    pub fn reload(&mut self) -> Result<&LoadReport> {
        let (request_id, start) = self.begin("reload");

        match load_tree(self.ops.as_mut(), self.labeler.as_ref()) {
            Ok((tree, report)) => {
                self.tree = tree;
                self.last_load = report;
                if let Some(id) = &self.selection {
                    if !self.tree.contains(id) {
                        self.selection = None;
                    }
                }
                let tree = &self.tree;
                self.expanded.retain(|id| tree.contains(id));
                self.memo.invalidate();
                self.log_success("reload", &request_id, start);
                Ok(&self.last_load)
            }
            Err(e) => {
                self.log_failure("reload", &request_id, &e, start);
                Err(e)
            }
        }
    }

    /// Change the selection; `None` clears it
    ///
    /// # Errors
    ///
    /// Returns `RuleNotInTree` for an id the tree does not hold.
    pub fn on_node_selected(&mut self, id: Option<&str>) -> Result<()> {
        let (request_id, start) = self.begin("select");

        match id {
            Some(id) if !self.tree.contains(id) => {
                let err = RuleTreeError::RuleNotInTree {
                    rule_id: id.to_string(),
                };
                self.log_failure("select", &request_id, &err, start);
                Err(err)
            }
            _ => {
                self.selection = id.map(str::to_string);
                self.log_success("select", &request_id, start);
                Ok(())
            }
        }
    }

    /// Create a rule under the selection (or at root level) and select it
    ///
    /// Returns the new rule id.
    pub fn on_create_requested(&mut self) -> Result<String> {
        let (request_id, start) = self.begin("create");

        let result = self.create_impl().map_err(|e| {
            self.log_failure("create", &request_id, &e, start);
            e
        })?;

        log_op_end!(
            "create",
            duration_ms = elapsed_ms(start),
            session_id = %self.session_id,
            request_id = %request_id,
            rule_id = %result
        );
        Ok(result)
    }

    fn create_impl(&mut self) -> Result<String> {
        let parent = self.selection.clone();
        let record = self.ops.create(parent.as_deref())?;
        let node = present(&record, self.labeler.as_ref());
        let id = node.id.clone();
        self.tree.insert(node)?;
        self.memo.invalidate();

        if let Some(parent) = parent {
            self.expanded.insert(parent);
        }
        self.selection = Some(id.clone());
        Ok(id)
    }

    /// Open the selected rule in `editor` and persist the result
    ///
    /// Returns `false` when the edit was cancelled.
    pub fn on_edit_requested(&mut self, editor: &mut dyn RuleEditor) -> Result<bool> {
        let (request_id, start) = self.begin("edit");

        let saved = self.edit_impl(editor).map_err(|e| {
            self.log_failure("edit", &request_id, &e, start);
            e
        })?;

        log_op_end!(
            "edit",
            duration_ms = elapsed_ms(start),
            session_id = %self.session_id,
            request_id = %request_id,
            saved = saved
        );
        Ok(saved)
    }

    fn edit_impl(&mut self, editor: &mut dyn RuleEditor) -> Result<bool> {
        let id = self.require_selection("edit")?;
        let record = self.ops.get(&id)?;
        match editor.edit(&record) {
            None => Ok(false),
            Some(payload) => {
                self.ops.update_payload(&id, &payload)?;
                self.refresh_node(&id)?;
                Ok(true)
            }
        }
    }

    /// Re-read the selected rule after an external editor saved it
    pub fn on_edit_completed(&mut self) -> Result<()> {
        let (request_id, start) = self.begin("edit_completed");

        let result = self
            .require_selection("edit_completed")
            .and_then(|id| self.refresh_node(&id));
        match result {
            Ok(()) => {
                self.log_success("edit_completed", &request_id, start);
                Ok(())
            }
            Err(e) => {
                self.log_failure("edit_completed", &request_id, &e, start);
                Err(e)
            }
        }
    }

    fn refresh_node(&mut self, id: &str) -> Result<()> {
        let record = self.ops.get(id)?;
        let fresh = present(&record, self.labeler.as_ref());
        let node = self.tree.get_mut(id)?;
        node.payload = fresh.payload;
        node.label = fresh.label;
        node.icon = fresh.icon;
        self.memo.invalidate();
        Ok(())
    }

    /// Copy the selected subtree next to the original and select the copy
    ///
    /// Export or import failures leave the tree unmodified and come back as
    /// `DuplicateOutcome::Failed`.
    pub fn on_duplicate_requested(&mut self) -> Result<DuplicateOutcome> {
        let (request_id, start) = self.begin("duplicate");

        let outcome = self.duplicate_impl().map_err(|e| {
            self.log_failure("duplicate", &request_id, &e, start);
            e
        })?;

        if let DuplicateOutcome::Failed { reason } = &outcome {
            tracing::warn!(
                session_id = %self.session_id,
                request_id = %request_id,
                scope = self.ops.scope(),
                reason = %reason,
                "Duplicate failed, tree left unchanged"
            );
        }
        log_op_end!(
            "duplicate",
            duration_ms = elapsed_ms(start),
            session_id = %self.session_id,
            request_id = %request_id,
            outcome = ?outcome
        );
        Ok(outcome)
    }

    fn duplicate_impl(&mut self) -> Result<DuplicateOutcome> {
        let id = self.require_selection("duplicate")?;
        let parent = self.tree.parent_of(&id)?.map(str::to_string);

        let blob = match self.ops.export(&id) {
            Ok(blob) => blob,
            Err(e) => {
                return Ok(DuplicateOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        };

        let imported = self.ops.import(&blob);
        if let Err(e) = self.ops.discard_export(&blob) {
            tracing::warn!(
                session_id = %self.session_id,
                rule_id = %id,
                error = %e,
                "Could not remove temporary export"
            );
        }

        let record = match imported {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Ok(DuplicateOutcome::Failed {
                    reason: format!("import of rule {} produced no rule", id),
                })
            }
            Err(e) => {
                return Ok(DuplicateOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        };

        let mut node = present(&record, self.labeler.as_ref());
        node.parent_id = parent.clone();
        let copy_id = node.id.clone();
        self.tree.insert(node)?;
        attach_descendants(
            self.ops.as_ref(),
            self.labeler.as_ref(),
            &mut self.tree,
            Some(&copy_id),
        )?;
        self.memo.invalidate();

        if let Some(parent) = parent {
            self.expanded.insert(parent);
        }
        self.selection = Some(copy_id.clone());
        Ok(DuplicateOutcome::Duplicated { id: copy_id })
    }

    /// Delete the selected rule and its subtree
    ///
    /// The backend delete runs first; the tree only changes after it
    /// succeeds. Returns the removed ids in pre-order.
    pub fn on_delete_requested(&mut self) -> Result<Vec<String>> {
        let (request_id, start) = self.begin("delete");

        let removed = self.delete_impl().map_err(|e| {
            self.log_failure("delete", &request_id, &e, start);
            e
        })?;

        log_op_end!(
            "delete",
            duration_ms = elapsed_ms(start),
            session_id = %self.session_id,
            request_id = %request_id,
            removed = removed.len()
        );
        Ok(removed)
    }

    fn delete_impl(&mut self) -> Result<Vec<String>> {
        let id = self.require_selection("delete")?;
        if !self.tree.contains(&id) {
            return Err(RuleTreeError::RuleNotInTree { rule_id: id });
        }
        self.ops.delete(&id)?;

        let removed = self.tree.remove_recursive(&id)?;
        for gone in &removed {
            self.expanded.remove(gone);
        }
        self.selection = None;
        self.memo.invalidate();
        Ok(removed)
    }

    /// Whether `id` may be picked up by a drag gesture
    ///
    /// Answers for the most recently queried id are cached until the tree
    /// changes when `memoize_drag_eligibility` is on.
    pub fn is_drag_eligible(&mut self, id: &str) -> Result<bool> {
        let ops = self.ops.as_ref();
        self.memo.get_or_compute(id, || ops.is_drag_eligible(id))
    }

    /// Handle a drop of `source_id` onto `target_id`
    ///
    /// Rejections leave both the tree and the backend untouched. A backend
    /// failure is returned as an error after the tree has been restored
    /// (unless `rollback_failed_moves` is off).
    pub fn on_drop_gesture(
        &mut self,
        source_id: &str,
        target_id: &str,
        zone: VerticalZone,
    ) -> Result<DropOutcome> {
        let request_id = RequestId::new();
        log_op_start!(
            "drop_gesture",
            session_id = %self.session_id,
            request_id = %request_id,
            rule_id = source_id,
            target_id = target_id,
            zone = ?zone
        );
        self.last_request_id = Some(request_id.clone());
        let start = Instant::now();

        let outcome = self.drop_impl(source_id, target_id, zone).map_err(|e| {
            self.log_failure("drop_gesture", &request_id, &e, start);
            e
        })?;

        if let DropOutcome::Rejected(reason) = outcome {
            tracing::debug!(
                event = EVENT_DROP_REJECTED,
                session_id = %self.session_id,
                request_id = %request_id,
                rule_id = source_id,
                target_id = target_id,
                reason = reason.as_str()
            );
        }
        log_op_end!(
            "drop_gesture",
            duration_ms = elapsed_ms(start),
            session_id = %self.session_id,
            request_id = %request_id,
            outcome = ?outcome
        );
        Ok(outcome)
    }

    fn drop_impl(
        &mut self,
        source_id: &str,
        target_id: &str,
        zone: VerticalZone,
    ) -> Result<DropOutcome> {
        if source_id == target_id {
            return Ok(DropOutcome::Rejected(DropRejection::SelfDrop));
        }
        let plan = match reorder::plan_drop(&self.tree, source_id, target_id, zone) {
            Ok(plan) => plan,
            Err(rejection) => return Ok(DropOutcome::Rejected(rejection)),
        };
        if !self.is_drag_eligible(source_id)? {
            return Ok(DropOutcome::Rejected(DropRejection::NotDragEligible));
        }
        if self.options.reject_descendant_drops && reorder::creates_cycle(&self.tree, &plan) {
            return Ok(DropOutcome::Rejected(DropRejection::TargetIsDescendant));
        }

        let snapshot = self
            .options
            .rollback_failed_moves
            .then(|| self.tree.clone());

        reorder::apply_local(&mut self.tree, &plan)?;
        self.memo.invalidate();

        if let Err(e) = self.send_move(&plan) {
            if let Some(snapshot) = snapshot {
                self.tree = snapshot;
                tracing::warn!(
                    event = EVENT_MOVE_ROLLED_BACK,
                    session_id = %self.session_id,
                    rule_id = %plan.source_id,
                    move_kind = %plan.kind,
                    error = %e,
                    "Backend refused move, tree restored"
                );
            }
            return Err(e);
        }

        if let Some(parent) = &plan.parent_id {
            self.expanded.insert(parent.clone());
        }
        Ok(DropOutcome::Moved(plan))
    }

    fn send_move(&mut self, plan: &PlannedMove) -> Result<()> {
        self.ops.move_rule(
            plan.kind,
            &plan.source_id,
            plan.parent_id.as_deref(),
            plan.sibling_ref_id.as_deref(),
        )
    }

    /// Expand or collapse the selected item and everything below it
    ///
    /// Applies to the whole tree when nothing is selected. Returns the number
    /// of items affected.
    pub fn on_expand_requested(&mut self, expand: bool) -> Result<usize> {
        let (request_id, start) = self.begin("expand");

        match self.expand_impl(expand) {
            Ok(affected) => {
                self.log_success("expand", &request_id, start);
                Ok(affected)
            }
            Err(e) => {
                self.log_failure("expand", &request_id, &e, start);
                Err(e)
            }
        }
    }

    fn expand_impl(&mut self, expand: bool) -> Result<usize> {
        let targets: Vec<String> = match &self.selection {
            Some(id) => {
                if !self.tree.contains(id) {
                    return Err(RuleTreeError::RuleNotInTree {
                        rule_id: id.clone(),
                    });
                }
                self.tree.descendants_inclusive(id)
            }
            None => self
                .tree
                .walk()
                .into_iter()
                .map(|(_, node)| node.id.clone())
                .collect(),
        };

        for id in &targets {
            if expand {
                self.expanded.insert(id.clone());
            } else {
                self.expanded.remove(id);
            }
        }
        Ok(targets.len())
    }
}
