//! SQL migration definitions for the Roadmapper database.
//!
//! Migrations are applied in order on database open. Each one records its
//! version in `schema_migrations` as its last statement.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: kv_store",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- String values under well-known keys (roadmap, user_profile, ...)
CREATE TABLE IF NOT EXISTS kv_store (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Topic enrichment cache",
            sql: r#"
CREATE TABLE IF NOT EXISTS enrichment_cache (
    topic_key      TEXT PRIMARY KEY,
    description    TEXT NOT NULL,
    reference_link TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
