//! SQL migration definitions for the athenai database.
//!
//! Migrations are applied in order on database open. Each migration is a batch
//! of SQL statements that also records its version in `schema_migrations`.
//!
//! The schema is the constraint list of the domain model: primary keys and
//! `UNIQUE` clauses carry the uniqueness rules, `CHECK` clauses repeat the
//! duration and enum rules, and every foreign key cascades on delete.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: users, domains, skills, projects, association tables",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY CHECK (id >= 0),
    name       TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    first_name TEXT NOT NULL CHECK (length(trim(first_name)) > 0),
    last_name  TEXT NOT NULL DEFAULT '',
    email      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS domains (
    id   INTEGER PRIMARY KEY CHECK (id >= 0),
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0 AND length(name) <= 100),
    info TEXT NOT NULL DEFAULT '' CHECK (length(info) <= 1000)
);

CREATE TABLE IF NOT EXISTS skills (
    id   INTEGER PRIMARY KEY CHECK (id >= 0),
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0 AND length(name) <= 100)
);

-- Dates are ISO-8601 (YYYY-MM-DD) so text comparison orders them correctly.
CREATE TABLE IF NOT EXISTS projects (
    id             INTEGER PRIMARY KEY CHECK (id >= 0),
    owner_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    start_date     TEXT NOT NULL,
    end_date       TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'not-started'
                   CHECK (status IN ('not-started', 'in-progress', 'completed')),
    license        TEXT NOT NULL DEFAULT '',
    repository_url TEXT,
    demo_url       TEXT,
    dataset_url    TEXT,
    CHECK (end_date > start_date)
);

CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id);

CREATE TABLE IF NOT EXISTS person_skills (
    person_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    skill_id  INTEGER NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
    PRIMARY KEY (person_id, skill_id)
);

CREATE TABLE IF NOT EXISTS project_skill_requirements (
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    skill_id   INTEGER NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
    weight     INTEGER NOT NULL,
    PRIMARY KEY (project_id, skill_id, weight)
);

CREATE TABLE IF NOT EXISTS person_projects (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    approval   TEXT NOT NULL DEFAULT 'pending'
               CHECK (approval IN ('pending', 'selected', 'rejected'))
);

CREATE INDEX IF NOT EXISTS idx_person_projects_project ON person_projects(project_id);
CREATE INDEX IF NOT EXISTS idx_person_projects_person ON person_projects(person_id);

CREATE TABLE IF NOT EXISTS project_domains (
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    domain_id  INTEGER NOT NULL REFERENCES domains(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, domain_id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}

/// Tables reported by `Storage::table_counts`, in display order.
pub(crate) const COUNTED_TABLES: [&str; 8] = [
    "users",
    "domains",
    "skills",
    "projects",
    "person_skills",
    "project_skill_requirements",
    "person_projects",
    "project_domains",
];
