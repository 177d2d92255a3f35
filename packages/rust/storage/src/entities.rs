//! Users, domains, skills and projects.

use athenai_shared::{AthenaiError, Domain, Project, Result, Skill, User};
use chrono::NaiveDate;
use libsql::params;

use crate::{Storage, storage_err, write_err};

const PROJECT_COLUMNS: &str = "id, owner_id, start_date, end_date, status, license, repository_url, demo_url, dataset_url";

impl Storage {
    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Insert a user. Rejects a duplicate id or name.
    pub async fn insert_user(&self, user: &User) -> Result<()> {
        self.check_writable()?;
        user.validate()?;
        self.conn
            .execute(
                "INSERT INTO users (id, name, first_name, last_name, email)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.name.as_str(),
                    user.first_name.as_str(),
                    user.last_name.as_str(),
                    user.email.as_str(),
                ],
            )
            .await
            .map_err(write_err)?;
        tracing::debug!(id = user.id, name = %user.name, "inserted user");
        Ok(())
    }

    /// Get a user by id.
    pub async fn get_user(&self, id: u32) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, first_name, last_name, email FROM users WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// List all users ordered by name.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, first_name, last_name, email FROM users ORDER BY name",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_user(&row)?);
        }
        Ok(results)
    }

    /// Delete a user, cascading to their projects and association rows.
    /// Returns whether a row was removed.
    pub async fn delete_user(&self, id: u32) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .await
            .map_err(write_err)?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Domains
    // -----------------------------------------------------------------------

    /// Insert a domain. Rejects a duplicate id or name.
    pub async fn insert_domain(&self, domain: &Domain) -> Result<()> {
        self.check_writable()?;
        domain.validate()?;
        self.conn
            .execute(
                "INSERT INTO domains (id, name, info) VALUES (?1, ?2, ?3)",
                params![domain.id, domain.name.as_str(), domain.info.as_str()],
            )
            .await
            .map_err(write_err)?;
        Ok(())
    }

    /// Get a domain by id.
    pub async fn get_domain(&self, id: u32) -> Result<Option<Domain>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, info FROM domains WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(Domain {
                id: row.get::<u32>(0).map_err(storage_err)?,
                name: row.get::<String>(1).map_err(storage_err)?,
                info: row.get::<String>(2).map_err(storage_err)?,
            })),
            None => Ok(None),
        }
    }

    /// Delete a domain, cascading to project tags.
    pub async fn delete_domain(&self, id: u32) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute("DELETE FROM domains WHERE id = ?1", params![id])
            .await
            .map_err(write_err)?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Skills
    // -----------------------------------------------------------------------

    /// Insert a skill. Rejects a duplicate id or name.
    pub async fn insert_skill(&self, skill: &Skill) -> Result<()> {
        self.check_writable()?;
        skill.validate()?;
        self.conn
            .execute(
                "INSERT INTO skills (id, name) VALUES (?1, ?2)",
                params![skill.id, skill.name.as_str()],
            )
            .await
            .map_err(write_err)?;
        Ok(())
    }

    /// Get a skill by id.
    pub async fn get_skill(&self, id: u32) -> Result<Option<Skill>> {
        let mut rows = self
            .conn
            .query("SELECT id, name FROM skills WHERE id = ?1", params![id])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(Skill {
                id: row.get::<u32>(0).map_err(storage_err)?,
                name: row.get::<String>(1).map_err(storage_err)?,
            })),
            None => Ok(None),
        }
    }

    /// Delete a skill, cascading to person skills and project requirements.
    pub async fn delete_skill(&self, id: u32) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute("DELETE FROM skills WHERE id = ?1", params![id])
            .await
            .map_err(write_err)?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    /// Insert a project. The duration rule is checked before any SQL runs.
    pub async fn insert_project(&self, project: &Project) -> Result<()> {
        self.check_writable()?;
        project.validate()?;
        self.conn
            .execute(
                "INSERT INTO projects (id, owner_id, start_date, end_date, status, license, repository_url, demo_url, dataset_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    project.id,
                    project.owner,
                    project.start_date.to_string(),
                    project.end_date.to_string(),
                    project.status.as_str(),
                    project.license.as_str(),
                    project.repository_url.as_deref(),
                    project.demo_url.as_deref(),
                    project.dataset_url.as_deref(),
                ],
            )
            .await
            .map_err(write_err)?;
        tracing::debug!(id = project.id, owner = project.owner, "inserted project");
        Ok(())
    }

    /// Get a project by id.
    pub async fn get_project(&self, id: u32) -> Result<Option<Project>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_project(&row)?)),
            None => Ok(None),
        }
    }

    /// List projects owned by a user, ordered by start date.
    pub async fn list_projects_by_owner(&self, owner: u32) -> Result<Vec<Project>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects WHERE owner_id = ?1 ORDER BY start_date, id"
                ),
                params![owner],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_project(&row)?);
        }
        Ok(results)
    }

    /// Delete a project, cascading to its requirements, members and domain tags.
    pub async fn delete_project(&self, id: u32) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .await
            .map_err(write_err)?;
        Ok(affected > 0)
    }
}

/// Convert a database row to a [`User`].
fn row_to_user(row: &libsql::Row) -> Result<User> {
    Ok(User {
        id: row.get::<u32>(0).map_err(storage_err)?,
        name: row.get::<String>(1).map_err(storage_err)?,
        first_name: row.get::<String>(2).map_err(storage_err)?,
        last_name: row.get::<String>(3).map_err(storage_err)?,
        email: row.get::<String>(4).map_err(storage_err)?,
    })
}

/// Convert a database row (selected with `PROJECT_COLUMNS`) to a [`Project`].
fn row_to_project(row: &libsql::Row) -> Result<Project> {
    let status: String = row.get(4).map_err(storage_err)?;
    Ok(Project {
        id: row.get::<u32>(0).map_err(storage_err)?,
        owner: row.get::<u32>(1).map_err(storage_err)?,
        start_date: parse_date(&row.get::<String>(2).map_err(storage_err)?)?,
        end_date: parse_date(&row.get::<String>(3).map_err(storage_err)?)?,
        status: status
            .parse()
            .map_err(|e| AthenaiError::Storage(format!("project row: {e}")))?,
        license: row.get::<String>(5).map_err(storage_err)?,
        repository_url: row.get::<Option<String>>(6).map_err(storage_err)?,
        demo_url: row.get::<Option<String>>(7).map_err(storage_err)?,
        dataset_url: row.get::<Option<String>>(8).map_err(storage_err)?,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| AthenaiError::Storage(format!("invalid date '{s}': {e}")))
}
