//! SQLite rule repository
//!
//! One repository instance serves one variant; several instances may share a
//! database file. Multi-statement mutations (move, import) run inside a
//! single transaction, cascading deletes are one recursive statement.

#![allow(clippy::result_large_err)]

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row};
use ruletree_core::errors::RuleTreeError;
use ruletree_core::repository::plan_move;
use ruletree_core::{
    ExportBlob, MoveKind, RuleBundle, RuleHierarchyRepository, RulePayload, RuleRecord,
    VariantTag,
};
use uuid::Uuid;

use crate::db;
use crate::errors::{corrupt_row, from_rusqlite, io_error, sqlite_op, Result};
use crate::migrations::apply_migrations;

const RULE_COLUMNS: &str = "id, scope, variant, parent_id, sort_order, payload";

/// Raw row before the variant tag and payload are decoded
struct RuleRow {
    id: String,
    scope: String,
    variant: String,
    parent_id: Option<String>,
    sort_order: i64,
    payload: String,
}

impl RuleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            scope: row.get(1)?,
            variant: row.get(2)?,
            parent_id: row.get(3)?,
            sort_order: row.get(4)?,
            payload: row.get(5)?,
        })
    }

    fn decode(self) -> Result<RuleRecord> {
        let variant: VariantTag = self
            .variant
            .parse()
            .map_err(|e| corrupt_row(&self.id, e))?;
        let payload: RulePayload =
            serde_json::from_str(&self.payload).map_err(|e| corrupt_row(&self.id, e))?;
        let order = u32::try_from(self.sort_order)
            .map_err(|_| corrupt_row(&self.id, format!("sort order {}", self.sort_order)))?;
        Ok(RuleRecord::new(self.id, self.scope, variant, self.parent_id)
            .with_order(order)
            .with_payload(payload))
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn encode_payload(payload: &RulePayload) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}

/// SQLite-backed `RuleHierarchyRepository`
pub struct SqliteRuleRepository {
    conn: Connection,
    variant: VariantTag,
    export_dir: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteRuleRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRuleRepository")
            .field("variant", &self.variant)
            .field("export_dir", &self.export_dir)
            .finish_non_exhaustive()
    }
}

impl SqliteRuleRepository {
    /// Wrap an already migrated connection
    pub fn new(conn: Connection, variant: VariantTag) -> Self {
        Self {
            conn,
            variant,
            export_dir: None,
        }
    }

    /// Open (or create) the database at `path` and bring its schema up to date
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or a migration fails.
    pub fn open(path: &Path, variant: VariantTag) -> Result<Self> {
        let mut conn = db::open(path)?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self::new(conn, variant))
    }

    /// Fresh in-memory database with the schema applied
    pub fn open_in_memory(variant: VariantTag) -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self::new(conn, variant))
    }

    /// Spill exports to files under `dir` instead of keeping them in memory
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Write a record verbatim (upsert), without parent or order checks
    ///
    /// Used to seed fixtures and to restore rules from other tools.
    pub fn insert_record(&mut self, record: &RuleRecord) -> Result<()> {
        let ts = now();
        self.conn
            .execute(
                "INSERT INTO rules (id, variant, scope, parent_id, sort_order, payload, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    variant = excluded.variant,
                    scope = excluded.scope,
                    parent_id = excluded.parent_id,
                    sort_order = excluded.sort_order,
                    payload = excluded.payload,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    record.id,
                    record.variant.as_str(),
                    record.scope,
                    record.parent_id,
                    record.order,
                    encode_payload(&record.payload)?,
                    ts,
                ],
            )
            .map_err(sqlite_op("insert_record"))?;
        Ok(())
    }

    fn query_rules(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<RuleRecord>> {
        let mut stmt = self.conn.prepare(sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(params, RuleRow::from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(RuleRow::decode).collect()
    }

    fn children(&self, scope: &str, parent_id: Option<&str>) -> Result<Vec<RuleRecord>> {
        self.query_rules(
            &format!(
                "SELECT {} FROM rules
                 WHERE variant = ?1 AND scope = ?2 AND parent_id IS ?3
                 ORDER BY sort_order, rowid",
                RULE_COLUMNS
            ),
            rusqlite::params![self.variant.as_str(), scope, parent_id],
        )
    }

    fn require(&self, id: &str) -> Result<RuleRecord> {
        self.get_by_id(id)?.ok_or_else(|| RuleTreeError::RuleNotFound {
            rule_id: id.to_string(),
        })
    }

    fn exists(conn: &Connection, variant: VariantTag, id: &str) -> Result<bool> {
        conn.query_row(
            "SELECT 1 FROM rules WHERE id = ?1 AND variant = ?2",
            rusqlite::params![id, variant.as_str()],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(from_rusqlite)
    }

    fn next_order(conn: &Connection, variant: VariantTag, scope: &str, parent_id: Option<&str>) -> Result<u32> {
        let next: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM rules
                 WHERE variant = ?1 AND scope = ?2 AND parent_id IS ?3",
                rusqlite::params![variant.as_str(), scope, parent_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        u32::try_from(next).map_err(|_| RuleTreeError::Internal {
            message: format!("sibling order overflow under {:?}", parent_id),
        })
    }

    /// True when `candidate` is `ancestor` or lies below it
    fn is_within(conn: &Connection, variant: VariantTag, candidate: &str, ancestor: &str) -> Result<bool> {
        conn.query_row(
            "WITH RECURSIVE chain(id, parent_id) AS (
                SELECT id, parent_id FROM rules WHERE id = ?1 AND variant = ?2
                UNION
                SELECT r.id, r.parent_id FROM rules r
                JOIN chain c ON r.id = c.parent_id
                WHERE r.variant = ?2
             )
             SELECT 1 FROM chain WHERE id = ?3 LIMIT 1",
            rusqlite::params![candidate, variant.as_str(), ancestor],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(from_rusqlite)
    }

    fn read_blob(blob: &ExportBlob) -> Result<Vec<u8>> {
        match &blob.spill_path {
            Some(path) => fs::read(path).map_err(|e| io_error("read_export", e)),
            None => Ok(blob.bytes.clone()),
        }
    }
}

impl RuleHierarchyRepository for SqliteRuleRepository {
    fn variant(&self) -> VariantTag {
        self.variant
    }

    fn get_all(&self, scope: &str) -> Result<Vec<RuleRecord>> {
        self.query_rules(
            &format!(
                "SELECT {} FROM rules WHERE variant = ?1 AND scope = ?2
                 ORDER BY sort_order, rowid",
                RULE_COLUMNS
            ),
            rusqlite::params![self.variant.as_str(), scope],
        )
    }

    fn get_all_of_parent(&self, scope: &str, parent_id: Option<&str>) -> Result<Vec<RuleRecord>> {
        self.children(scope, parent_id)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<RuleRecord>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM rules WHERE id = ?1 AND variant = ?2",
                    RULE_COLUMNS
                ),
                rusqlite::params![id, self.variant.as_str()],
                RuleRow::from_row,
            )
            .optional()
            .map_err(sqlite_op("get_by_id"))?;
        row.map(RuleRow::decode).transpose()
    }

    fn create(&mut self, scope: &str, parent_id: Option<&str>) -> Result<RuleRecord> {
        if let Some(pid) = parent_id {
            if !Self::exists(&self.conn, self.variant, pid)? {
                return Err(RuleTreeError::ParentNotFound {
                    parent_id: pid.to_string(),
                });
            }
        }
        let order = Self::next_order(&self.conn, self.variant, scope, parent_id)?;
        let record = RuleRecord::new(
            Uuid::now_v7().to_string(),
            scope,
            self.variant,
            parent_id.map(str::to_string),
        )
        .with_order(order);

        self.insert_record(&record)?;
        Ok(record)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute(
                "WITH RECURSIVE doomed(id) AS (
                    SELECT id FROM rules WHERE id = ?1 AND variant = ?2
                    UNION
                    SELECT r.id FROM rules r
                    JOIN doomed d ON r.parent_id = d.id
                    WHERE r.variant = ?2
                 )
                 DELETE FROM rules WHERE id IN (SELECT id FROM doomed)",
                rusqlite::params![id, self.variant.as_str()],
            )
            .map_err(sqlite_op("delete"))?;
        tracing::debug!(rule_id = id, removed, "cascading delete");
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
        let reference = sibling_ref_id.map(|rid| self.require(rid)).transpose()?;
        let variant = self.variant;

        let tx = self.conn.transaction().map_err(from_rusqlite)?;

        if kind == MoveKind::AsChild {
            if let Some(pid) = new_parent_id {
                if !Self::exists(&tx, variant, pid)? {
                    return Err(RuleTreeError::ParentNotFound {
                        parent_id: pid.to_string(),
                    });
                }
            }
        }

        let placement = plan_move(kind, new_parent_id, reference.as_ref())?;
        if let Some(pid) = placement.parent_id.as_deref() {
            if Self::is_within(&tx, variant, pid, source_id)? {
                return Err(RuleTreeError::CycleDetected {
                    rule_id: source_id.to_string(),
                    parent_id: pid.to_string(),
                });
            }
        }

        let ts = now();
        tx.execute(
            "UPDATE rules SET sort_order = sort_order + 1, updated_at = ?1
             WHERE variant = ?2 AND scope = ?3 AND parent_id IS ?4
               AND sort_order >= ?5 AND id <> ?6",
            rusqlite::params![
                ts,
                variant.as_str(),
                scope,
                placement.parent_id,
                placement.shift_from,
                source_id
            ],
        )
        .map_err(sqlite_op("move_rule"))?;
        tx.execute(
            "UPDATE rules SET parent_id = ?1, sort_order = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![placement.parent_id, placement.order, ts, source_id],
        )
        .map_err(sqlite_op("move_rule"))?;

        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }

    fn export(&mut self, id: &str) -> Result<ExportBlob> {
        let root = self.require(id)?;
        let scope = root.scope.clone();
        let bundle = RuleBundle::collect(root, |pid| self.children(&scope, Some(pid)))?;
        let bytes = bundle.to_bytes()?;

        match &self.export_dir {
            None => Ok(ExportBlob::in_memory(bytes)),
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| io_error("export", e))?;
                let path = dir.join(format!("rule-export-{}.json", Uuid::now_v7()));
                fs::write(&path, &bytes).map_err(|e| io_error("export", e))?;
                tracing::debug!(rule_id = id, path = %path.display(), "export spilled to file");
                Ok(ExportBlob::spilled(bytes, path))
            }
        }
    }

    fn import(&mut self, blob: &ExportBlob) -> Result<Option<RuleRecord>> {
        let bundle = RuleBundle::from_bytes(&Self::read_blob(blob)?)?;
        if let Some(foreign) = bundle.rules.iter().find(|r| r.variant != self.variant) {
            return Err(RuleTreeError::InvalidExport {
                reason: format!(
                    "rule {} is a {} rule, expected {}",
                    foreign.id, foreign.variant, self.variant
                ),
            });
        }

        let mut records = bundle.reissue(|| Uuid::now_v7().to_string())?;
        let Some(root) = records.first_mut() else {
            return Ok(None);
        };

        let variant = self.variant;
        let tx = self.conn.transaction().map_err(from_rusqlite)?;

        if let Some(pid) = root.parent_id.as_deref() {
            if !Self::exists(&tx, variant, pid)? {
                return Err(RuleTreeError::ParentNotFound {
                    parent_id: pid.to_string(),
                });
            }
        }
        root.order = Self::next_order(&tx, variant, &root.scope, root.parent_id.as_deref())?;
        let imported_root = root.clone();

        let ts = now();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO rules (id, variant, scope, parent_id, sort_order, payload, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                )
                .map_err(sqlite_op("import"))?;
            for record in &records {
                stmt.execute(rusqlite::params![
                    record.id,
                    variant.as_str(),
                    record.scope,
                    record.parent_id,
                    record.order,
                    encode_payload(&record.payload)?,
                    ts,
                ])
                .map_err(sqlite_op("import"))?;
            }
        }

        tx.commit().map_err(from_rusqlite)?;
        Ok(Some(imported_root))
    }

    fn update_payload(&mut self, id: &str, payload: &RulePayload) -> Result<RuleRecord> {
        let changed = self
            .conn
            .execute(
                "UPDATE rules SET payload = ?1, updated_at = ?2 WHERE id = ?3 AND variant = ?4",
                rusqlite::params![encode_payload(payload)?, now(), id, self.variant.as_str()],
            )
            .map_err(sqlite_op("update_payload"))?;
        if changed == 0 {
            return Err(RuleTreeError::RuleNotFound {
                rule_id: id.to_string(),
            });
        }
        self.require(id)
    }
}
