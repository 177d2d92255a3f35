//! Turso Embedded / libSQL storage layer for the athenai domain model.
//!
//! The [`Storage`] struct wraps a libSQL database holding users, domains,
//! skills, projects and their association tables. The schema in
//! [`migrations`] is the constraint contract; write methods validate records
//! before issuing SQL and translate constraint failures into
//! [`AthenaiError::Conflict`] / [`AthenaiError::Validation`].
//!
//! **Access rules:**
//! - `athenai db` / library callers: read-write via [`Storage::open`]
//! - `athenai db stats`: read-only via [`Storage::open_readonly`]

mod associations;
mod entities;
mod migrations;

use std::path::Path;

use athenai_shared::{AthenaiError, Result};
use libsql::{Connection, Database, params};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AthenaiError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.enable_foreign_keys().await?;
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AthenaiError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// SQLite leaves foreign keys off per connection; cascades depend on it.
    async fn enable_foreign_keys(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        AthenaiError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    pub async fn schema_version(&self) -> Result<u32> {
        let mut rows = match self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.to_string().contains("no such table") => return Ok(0),
            Err(e) => return Err(storage_err(e)),
        };

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<Option<u32>>(0).map_err(storage_err)?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(AthenaiError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Row count of every domain table, in schema order.
    pub async fn table_counts(&self) -> Result<Vec<(&'static str, u64)>> {
        let mut counts = Vec::with_capacity(migrations::COUNTED_TABLES.len());
        for table in migrations::COUNTED_TABLES {
            let mut rows = self
                .conn
                .query(&format!("SELECT COUNT(*) FROM {table}"), params![])
                .await
                .map_err(storage_err)?;
            let count = match rows.next().await.map_err(storage_err)? {
                Some(row) => row.get::<i64>(0).map_err(storage_err)?,
                None => 0,
            };
            counts.push((table, count.max(0) as u64));
        }
        Ok(counts)
    }
}

/// Wrap a libSQL error on a read path.
pub(crate) fn storage_err(e: libsql::Error) -> AthenaiError {
    AthenaiError::Storage(e.to_string())
}

/// Classify a libSQL error on a write path by the constraint that fired.
pub(crate) fn write_err(e: libsql::Error) -> AthenaiError {
    let message = e.to_string();
    if message.contains("UNIQUE constraint failed") {
        AthenaiError::conflict(message)
    } else if message.contains("constraint failed") {
        // CHECK, NOT NULL, FOREIGN KEY
        AthenaiError::validation(message)
    } else {
        AthenaiError::Storage(message)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.schema_version().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("athenai_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.schema_version().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn counts_every_table() {
        let storage = seeded_storage().await;
        let counts = storage.table_counts().await.expect("counts");
        assert_eq!(counts.len(), 8);
        assert_eq!(counts[0], ("users", 2));
        assert_eq!(counts[2], ("skills", 2));
        assert_eq!(counts[3], ("projects", 1));
        assert_eq!(counts[4], ("person_skills", 0));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("athenai_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_user(&user(1, "ada")).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert!(ro.get_user(1).await.unwrap().is_some());

        let result = ro.insert_user(&user(2, "grace")).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn fresh_database_reports_version_zero() {
        let tmp = std::env::temp_dir().join(format!("athenai_empty_{}.db", Uuid::now_v7()));
        let db = libsql::Builder::new_local(&tmp).build().await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute("CREATE TABLE unrelated (id INTEGER)", params![])
            .await
            .unwrap();
        drop(conn);
        drop(db);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.schema_version().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn schema_version_propagates_other_errors() {
        let tmp = std::env::temp_dir().join(format!("athenai_badver_{}.db", Uuid::now_v7()));
        let db = libsql::Builder::new_local(&tmp).build().await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version TEXT);
             INSERT INTO schema_migrations VALUES ('not-a-number');",
        )
        .await
        .unwrap();
        drop(conn);
        drop(db);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        let err = ro.schema_version().await.unwrap_err();
        assert!(matches!(err, AthenaiError::Storage(_)));
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("athenai_missing_{}.db", Uuid::now_v7()));
        assert!(Storage::open_readonly(&tmp).await.is_err());
    }
}
