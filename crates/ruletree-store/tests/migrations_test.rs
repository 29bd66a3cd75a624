// Integration tests for the migration framework
// Covers schema creation, idempotent re-runs and checksum enforcement

use rusqlite::Connection;
use ruletree_core::RuleTreeError;
use ruletree_store::migrations::{applied_migrations, apply_migrations, get_migrations};

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = setup_test_db();

    // When: Migrations are applied
    let result = apply_migrations(&mut conn);

    // Then: All migrations succeed and both tables exist
    assert!(result.is_ok(), "Migrations should succeed: {:?}", result.err());
    assert_eq!(get_table_names(&conn), vec!["rules", "schema_version"]);
}

#[test]
fn test_every_embedded_migration_is_recorded() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let applied = applied_migrations(&conn).unwrap();
    let embedded: Vec<&str> = get_migrations().iter().map(|m| m.id).collect();

    assert_eq!(applied, embedded);
}

#[test]
fn test_migration_idempotency() {
    // Given: A database with migrations already applied
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO rules (id, variant, scope, parent_id, sort_order, payload, created_at, updated_at)
         VALUES ('keep-me', 'top_level', 's', NULL, 0, '{}', 0, 0)",
        [],
    )
    .unwrap();

    // When: Migrations are applied again
    apply_migrations(&mut conn).unwrap();

    // Then: Nothing is re-recorded and existing rows survive
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count as usize, get_migrations().len());
    let kept: i64 = conn
        .query_row("SELECT COUNT(*) FROM rules WHERE id = 'keep-me'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(kept, 1);
}

#[test]
fn test_edited_migration_is_refused() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();
    conn.execute(
        "UPDATE schema_version SET checksum = 'deadbeef' WHERE migration_id = '001_rules_schema'",
        [],
    )
    .unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();

    match err {
        RuleTreeError::Persistence { op, message } => {
            assert_eq!(op, "migration_checksum");
            assert!(message.contains("001_rules_schema"));
        }
        other => panic!("expected a checksum failure, got {:?}", other),
    }
}

#[test]
fn test_unknown_variant_is_rejected_by_schema() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let result = conn.execute(
        "INSERT INTO rules (id, variant, scope, parent_id, sort_order, payload, created_at, updated_at)
         VALUES ('x', 'nonsense', 's', NULL, 0, '{}', 0, 0)",
        [],
    );

    let err = result.unwrap_err();
    assert!(err.to_string().contains("unknown rule variant"));
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("rules.db");

    {
        let mut conn = ruletree_store::db::open(&path).unwrap();
        apply_migrations(&mut conn).unwrap();
    }
    let mut conn = ruletree_store::db::open(&path).unwrap();
    apply_migrations(&mut conn).unwrap();

    assert_eq!(applied_migrations(&conn).unwrap().len(), get_migrations().len());
}
