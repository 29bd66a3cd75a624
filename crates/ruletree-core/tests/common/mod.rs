use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use ruletree_core::errors::{Result, RuleTreeError};
use ruletree_core::{
    ExportBlob, MemoryRuleRepository, MoveKind, RuleHierarchyRepository, RulePayload, RuleRecord,
    RuleTreeSession, SessionOptions, VariantTag,
};

pub const SCOPE: &str = "intervention-1";

/// Backend calls seen by a `ProbeRepository`
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Call {
    Create(Option<String>),
    Delete(String),
    Move {
        kind: MoveKind,
        source: String,
        parent: Option<String>,
        sibling: Option<String>,
    },
    Export(String),
    Import,
    UpdatePayload(String),
    DiscardExport,
    GetById(String),
}

/// Shared switchboard between a test and the repository it handed away
#[derive(Debug, Default)]
pub struct Probe {
    pub calls: Vec<Call>,
    pub fail_delete: HashSet<String>,
    pub fail_moves: bool,
    pub fail_export: bool,
    pub fail_import: bool,
    pub import_returns_none: bool,
}

#[allow(dead_code)]
impl Probe {
    pub fn moves(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Move { .. }))
            .collect()
    }

    pub fn lookups(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::GetById(_)))
            .count()
    }
}

fn injected(op: &str) -> RuleTreeError {
    RuleTreeError::Persistence {
        op: op.to_string(),
        message: "injected failure".to_string(),
    }
}

/// Memory repository that records calls and fails on demand
pub struct ProbeRepository {
    inner: MemoryRuleRepository,
    probe: Rc<RefCell<Probe>>,
}

impl ProbeRepository {
    pub fn new(inner: MemoryRuleRepository) -> (Self, Rc<RefCell<Probe>>) {
        let probe = Rc::new(RefCell::new(Probe::default()));
        (
            Self {
                inner,
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl RuleHierarchyRepository for ProbeRepository {
    fn variant(&self) -> VariantTag {
        self.inner.variant()
    }

    fn get_all(&self, scope: &str) -> Result<Vec<RuleRecord>> {
        self.inner.get_all(scope)
    }

    fn get_all_of_parent(&self, scope: &str, parent_id: Option<&str>) -> Result<Vec<RuleRecord>> {
        self.inner.get_all_of_parent(scope, parent_id)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<RuleRecord>> {
        self.probe
            .borrow_mut()
            .calls
            .push(Call::GetById(id.to_string()));
        self.inner.get_by_id(id)
    }

    fn create(&mut self, scope: &str, parent_id: Option<&str>) -> Result<RuleRecord> {
        self.probe
            .borrow_mut()
            .calls
            .push(Call::Create(parent_id.map(str::to_string)));
        self.inner.create(scope, parent_id)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let mut probe = self.probe.borrow_mut();
        probe.calls.push(Call::Delete(id.to_string()));
        if probe.fail_delete.contains(id) {
            return Err(injected("delete"));
        }
        drop(probe);
        self.inner.delete(id)
    }

    fn move_rule(
        &mut self,
        kind: MoveKind,
        source_id: &str,
        new_parent_id: Option<&str>,
        sibling_ref_id: Option<&str>,
        scope: &str,
    ) -> Result<()> {
        let mut probe = self.probe.borrow_mut();
        probe.calls.push(Call::Move {
            kind,
            source: source_id.to_string(),
            parent: new_parent_id.map(str::to_string),
            sibling: sibling_ref_id.map(str::to_string),
        });
        if probe.fail_moves {
            return Err(injected("move_rule"));
        }
        drop(probe);
        self.inner
            .move_rule(kind, source_id, new_parent_id, sibling_ref_id, scope)
    }

    fn export(&mut self, id: &str) -> Result<ExportBlob> {
        let mut probe = self.probe.borrow_mut();
        probe.calls.push(Call::Export(id.to_string()));
        if probe.fail_export {
            return Err(injected("export"));
        }
        drop(probe);
        self.inner.export(id)
    }

    fn import(&mut self, blob: &ExportBlob) -> Result<Option<RuleRecord>> {
        let mut probe = self.probe.borrow_mut();
        probe.calls.push(Call::Import);
        if probe.fail_import {
            return Err(injected("import"));
        }
        if probe.import_returns_none {
            return Ok(None);
        }
        drop(probe);
        self.inner.import(blob)
    }

    fn update_payload(&mut self, id: &str, payload: &RulePayload) -> Result<RuleRecord> {
        self.probe
            .borrow_mut()
            .calls
            .push(Call::UpdatePayload(id.to_string()));
        self.inner.update_payload(id, payload)
    }

    fn discard_export(&mut self, blob: &ExportBlob) -> Result<()> {
        self.probe.borrow_mut().calls.push(Call::DiscardExport);
        self.inner.discard_export(blob)
    }
}

/// Seed a repository with `(id, parent)` pairs, in sibling order
#[allow(dead_code)]
pub fn seeded(variant: VariantTag, rules: &[(&str, Option<&str>)]) -> MemoryRuleRepository {
    let mut repo = MemoryRuleRepository::new(variant);
    let mut order_by_parent: std::collections::HashMap<Option<&str>, u32> = Default::default();
    for (id, parent) in rules {
        let order = order_by_parent.entry(*parent).or_insert(0);
        repo.insert_record(
            RuleRecord::new(*id, SCOPE, variant, parent.map(str::to_string)).with_order(*order),
        );
        *order += 1;
    }
    repo
}

/// Session over a probed repository with default options
#[allow(dead_code)]
pub fn probed_session(repo: MemoryRuleRepository) -> (RuleTreeSession, Rc<RefCell<Probe>>) {
    probed_session_with(repo, SessionOptions::default())
}

#[allow(dead_code)]
pub fn probed_session_with(
    repo: MemoryRuleRepository,
    options: SessionOptions,
) -> (RuleTreeSession, Rc<RefCell<Probe>>) {
    let variant = repo.variant();
    let (repo, probe) = ProbeRepository::new(repo);
    let session = RuleTreeSession::initialize(SCOPE, variant, Box::new(repo), options)
        .expect("session should initialize");
    probe.borrow_mut().calls.clear();
    (session, probe)
}

/// Ids of the children of `parent` in the session's tree
#[allow(dead_code)]
pub fn children(session: &RuleTreeSession, parent: Option<&str>) -> Vec<String> {
    session.tree().children_of(parent).to_vec()
}
