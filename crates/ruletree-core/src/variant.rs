//! Variant resolution
//!
//! Each rule kind gets its own strategy object exposing the same operation
//! set. The session resolves one strategy at start-up and keeps it; no call
//! re-dispatches on the variant tag afterwards.

use crate::errors::{Result, RuleTreeError};
use crate::model::{ExportBlob, MoveKind, RuleCategory, RulePayload, RuleRecord, VariantTag};
use crate::repository::RuleHierarchyRepository;

/// Uniform hierarchy operations for one variant within one scope
pub trait RuleVariantOperations {
    fn variant(&self) -> VariantTag;

    fn scope(&self) -> &str;

    fn repository(&self) -> &dyn RuleHierarchyRepository;

    fn repository_mut(&mut self) -> &mut dyn RuleHierarchyRepository;

    /// Children of `parent_id` in sibling order (roots for `None`)
    fn list_children(&self, parent_id: Option<&str>) -> Result<Vec<RuleRecord>> {
        self.repository().get_all_of_parent(self.scope(), parent_id)
    }

    fn list_all(&self) -> Result<Vec<RuleRecord>> {
        self.repository().get_all(self.scope())
    }

    /// Fetch one rule
    ///
    /// # Errors
    ///
    /// Returns `RuleNotFound` if the backend has no such rule.
    fn get(&self, id: &str) -> Result<RuleRecord> {
        self.repository()
            .get_by_id(id)?
            .ok_or_else(|| RuleTreeError::RuleNotFound {
                rule_id: id.to_string(),
            })
    }

    fn create(&mut self, parent_id: Option<&str>) -> Result<RuleRecord> {
        let scope = self.scope().to_string();
        self.repository_mut().create(&scope, parent_id)
    }

    /// Cascading delete
    fn delete(&mut self, id: &str) -> Result<()> {
        self.repository_mut().delete(id)
    }

    fn move_rule(
        &mut self,
        kind: MoveKind,
        source_id: &str,
        parent_id: Option<&str>,
        sibling_ref_id: Option<&str>,
    ) -> Result<()> {
        let scope = self.scope().to_string();
        self.repository_mut()
            .move_rule(kind, source_id, parent_id, sibling_ref_id, &scope)
    }

    fn export(&mut self, id: &str) -> Result<ExportBlob> {
        self.repository_mut().export(id)
    }

    fn import(&mut self, blob: &ExportBlob) -> Result<Option<RuleRecord>> {
        self.repository_mut().import(blob)
    }

    fn update_payload(&mut self, id: &str, payload: &RulePayload) -> Result<RuleRecord> {
        self.repository_mut().update_payload(id, payload)
    }

    fn discard_export(&mut self, blob: &ExportBlob) -> Result<()> {
        self.repository_mut().discard_export(blob)
    }

    /// Whether the rule may be picked up by a drag gesture
    ///
    /// Unknown ids are never draggable.
    fn is_drag_eligible(&self, id: &str) -> Result<bool> {
        Ok(self.repository().get_by_id(id)?.is_some())
    }
}

macro_rules! scoped_variant {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name {
            scope: String,
            repository: Box<dyn RuleHierarchyRepository>,
        }

        impl $name {
            pub fn new(scope: impl Into<String>, repository: Box<dyn RuleHierarchyRepository>) -> Self {
                Self {
                    scope: scope.into(),
                    repository,
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("scope", &self.scope)
                    .finish_non_exhaustive()
            }
        }
    };
}

macro_rules! scoped_accessors {
    ($tag:expr) => {
        fn variant(&self) -> VariantTag {
            $tag
        }

        fn scope(&self) -> &str {
            &self.scope
        }

        fn repository(&self) -> &dyn RuleHierarchyRepository {
            self.repository.as_ref()
        }

        fn repository_mut(&mut self) -> &mut dyn RuleHierarchyRepository {
            self.repository.as_mut()
        }
    };
}

scoped_variant!(
    /// Monitoring rules owned by an intervention
    TopLevelRules
);

scoped_variant!(
    /// Rules applied to the reply a participant sent to a message
    ReplySubRules
);

scoped_variant!(
    /// Rules inside a micro-dialog decision point
    DialogStepRules
);

impl RuleVariantOperations for TopLevelRules {
    scoped_accessors!(VariantTag::TopLevel);

    /// Scheduled and event-triggered rules keep their place; only normal
    /// rules take part in ordered evaluation and may be dragged.
    fn is_drag_eligible(&self, id: &str) -> Result<bool> {
        Ok(self
            .repository
            .get_by_id(id)?
            .is_some_and(|record| record.payload.category == RuleCategory::Normal))
    }
}

impl RuleVariantOperations for ReplySubRules {
    scoped_accessors!(VariantTag::ReplySub);
}

impl RuleVariantOperations for DialogStepRules {
    scoped_accessors!(VariantTag::DialogStep);
}

/// Bind the operation set for `variant` over `repository`
///
/// # Errors
///
/// Returns `InvalidInput` if the repository holds a different variant.
pub fn resolve(
    variant: VariantTag,
    scope: impl Into<String>,
    repository: Box<dyn RuleHierarchyRepository>,
) -> Result<Box<dyn RuleVariantOperations>> {
    if repository.variant() != variant {
        return Err(RuleTreeError::InvalidInput {
            reason: format!(
                "repository holds {} rules but the session needs {}",
                repository.variant(),
                variant
            ),
        });
    }

    let scope = scope.into();
    let ops: Box<dyn RuleVariantOperations> = match variant {
        VariantTag::TopLevel => Box::new(TopLevelRules::new(scope, repository)),
        VariantTag::ReplySub => Box::new(ReplySubRules::new(scope, repository)),
        VariantTag::DialogStep => Box::new(DialogStepRules::new(scope, repository)),
    };
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRuleRepository;

    fn top_level_with(category: RuleCategory) -> (Box<dyn RuleVariantOperations>, String) {
        let mut repo = MemoryRuleRepository::new(VariantTag::TopLevel);
        let record = repo.create("s", None).unwrap();
        let payload = RulePayload {
            category,
            ..RulePayload::default()
        };
        repo.update_payload(&record.id, &payload).unwrap();
        let ops = resolve(VariantTag::TopLevel, "s", Box::new(repo)).unwrap();
        (ops, record.id)
    }

    #[test]
    fn test_resolve_binds_matching_variant() {
        for variant in VariantTag::ALL {
            let ops = resolve(variant, "s", Box::new(MemoryRuleRepository::new(variant))).unwrap();
            assert_eq!(ops.variant(), variant);
            assert_eq!(ops.scope(), "s");
        }
    }

    #[test]
    fn test_resolve_rejects_mismatched_repository() {
        let repo = MemoryRuleRepository::new(VariantTag::ReplySub);
        assert!(resolve(VariantTag::DialogStep, "s", Box::new(repo)).is_err());
    }

    #[test]
    fn test_top_level_only_normal_rules_are_draggable() {
        let (ops, id) = top_level_with(RuleCategory::Normal);
        assert!(ops.is_drag_eligible(&id).unwrap());

        for category in [
            RuleCategory::Daily,
            RuleCategory::Periodic,
            RuleCategory::UnexpectedMessage,
            RuleCategory::UserIntention,
        ] {
            let (ops, id) = top_level_with(category);
            assert!(!ops.is_drag_eligible(&id).unwrap(), "{:?}", category);
        }
    }

    #[test]
    fn test_other_variants_are_always_draggable() {
        let mut repo = MemoryRuleRepository::new(VariantTag::DialogStep);
        let record = repo.create("s", None).unwrap();
        let payload = RulePayload {
            category: RuleCategory::Daily,
            ..RulePayload::default()
        };
        repo.update_payload(&record.id, &payload).unwrap();
        let ops = resolve(VariantTag::DialogStep, "s", Box::new(repo)).unwrap();

        assert!(ops.is_drag_eligible(&record.id).unwrap());
        assert!(!ops.is_drag_eligible("unknown").unwrap());
    }

    #[test]
    fn test_operations_are_scoped() {
        let mut repo = MemoryRuleRepository::new(VariantTag::ReplySub);
        repo.create("other-scope", None).unwrap();
        let mut ops = resolve(VariantTag::ReplySub, "mine", Box::new(repo)).unwrap();

        let created = ops.create(None).unwrap();
        assert_eq!(created.scope, "mine");
        assert_eq!(ops.list_all().unwrap().len(), 1);
        assert!(matches!(
            ops.get("missing"),
            Err(RuleTreeError::RuleNotFound { .. })
        ));
    }
}
