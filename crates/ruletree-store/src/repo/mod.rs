//! Repository implementations backed by SQLite

mod sqlite_repo;

pub use sqlite_repo::SqliteRuleRepository;
