//! Versioned schema for the ChannelScope state database.
//!
//! Applied in order on open; each migration records its version in
//! `schema_migrations`.

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
            description: "Initial schema: runs, pipeline_state",
            sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per pipeline invocation
CREATE TABLE IF NOT EXISTS runs (
    id            TEXT PRIMARY KEY,
    channel_id    TEXT NOT NULL,
    kind          TEXT NOT NULL,
    started_at    TEXT NOT NULL,
    finished_at   TEXT,
    phase         TEXT,
    detail        TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_channel ON runs(channel_id);
CREATE INDEX IF NOT EXISTS idx_runs_started ON runs(started_at);

-- Latest pipeline state per channel, serialized as JSON
CREATE TABLE IF NOT EXISTS pipeline_state (
    channel_id  TEXT PRIMARY KEY,
    state_json  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Record produced artifact path on runs",
            sql: r#"
ALTER TABLE runs ADD COLUMN artifact_path TEXT;

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
