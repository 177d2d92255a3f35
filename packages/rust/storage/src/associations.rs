//! Association tables: person skills, project requirements, memberships and
//! domain tags. These rows reference users, projects, skills and domains and
//! disappear with them.

use athenai_shared::{
    AthenaiError, PersonProject, PersonSkill, ProjectDomain, ProjectSkillRequirement, Result,
};
use libsql::params;

use crate::{Storage, storage_err, write_err};

impl Storage {
    // -----------------------------------------------------------------------
    // Person skills
    // -----------------------------------------------------------------------

    /// Record that a person holds a skill. Rejects a duplicate pair.
    pub async fn insert_person_skill(&self, row: &PersonSkill) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO person_skills (person_id, skill_id) VALUES (?1, ?2)",
                params![row.person, row.skill],
            )
            .await
            .map_err(write_err)?;
        Ok(())
    }

    /// Skill ids held by a person, ascending.
    pub async fn skills_for_person(&self, person: u32) -> Result<Vec<u32>> {
        let mut rows = self
            .conn
            .query(
                "SELECT skill_id FROM person_skills WHERE person_id = ?1 ORDER BY skill_id",
                params![person],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row.get::<u32>(0).map_err(storage_err)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Project skill requirements
    // -----------------------------------------------------------------------

    /// Record a weighted skill requirement. Rejects a duplicate
    /// (project, skill, weight) triple.
    pub async fn insert_project_skill_requirement(
        &self,
        row: &ProjectSkillRequirement,
    ) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO project_skill_requirements (project_id, skill_id, weight)
                 VALUES (?1, ?2, ?3)",
                params![row.project, row.skill, row.weight],
            )
            .await
            .map_err(write_err)?;
        Ok(())
    }

    /// Requirements of a project, heaviest first.
    pub async fn requirements_for_project(
        &self,
        project: u32,
    ) -> Result<Vec<ProjectSkillRequirement>> {
        let mut rows = self
            .conn
            .query(
                "SELECT project_id, skill_id, weight FROM project_skill_requirements
                 WHERE project_id = ?1 ORDER BY weight DESC, skill_id",
                params![project],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(ProjectSkillRequirement {
                project: row.get::<u32>(0).map_err(storage_err)?,
                skill: row.get::<u32>(1).map_err(storage_err)?,
                weight: row.get::<i64>(2).map_err(storage_err)?,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Person projects
    // -----------------------------------------------------------------------

    /// Attach a person to a project. Returns the storage-assigned row id.
    pub async fn insert_person_project(&self, row: &PersonProject) -> Result<i64> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO person_projects (person_id, project_id, approval) VALUES (?1, ?2, ?3)",
                params![row.person, row.project, row.approval.as_str()],
            )
            .await
            .map_err(write_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Memberships of a project in insertion order.
    pub async fn members_of_project(&self, project: u32) -> Result<Vec<PersonProject>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, person_id, project_id, approval FROM person_projects
                 WHERE project_id = ?1 ORDER BY id",
                params![project],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let approval: String = row.get(3).map_err(storage_err)?;
            results.push(PersonProject {
                id: Some(row.get::<i64>(0).map_err(storage_err)?),
                person: row.get::<u32>(1).map_err(storage_err)?,
                project: row.get::<u32>(2).map_err(storage_err)?,
                approval: approval
                    .parse()
                    .map_err(|e| AthenaiError::Storage(format!("person_projects row: {e}")))?,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Project domains
    // -----------------------------------------------------------------------

    /// Tag a project with a domain. Rejects a duplicate pair.
    pub async fn insert_project_domain(&self, row: &ProjectDomain) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO project_domains (project_id, domain_id) VALUES (?1, ?2)",
                params![row.project, row.domain],
            )
            .await
            .map_err(write_err)?;
        Ok(())
    }

    /// Domain ids a project is tagged with, ascending.
    pub async fn domains_for_project(&self, project: u32) -> Result<Vec<u32>> {
        let mut rows = self
            .conn
            .query(
                "SELECT domain_id FROM project_domains WHERE project_id = ?1 ORDER BY domain_id",
                params![project],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row.get::<u32>(0).map_err(storage_err)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use athenai_shared::{
        ApprovalStatus, AthenaiError, Domain, PersonProject, PersonSkill, ProjectDomain,
        ProjectSkillRequirement,
    };

    #[tokio::test]
    async fn person_skill_pair_is_unique() {
        let storage = seeded_storage().await;
        let row = PersonSkill { person: 1, skill: 10 };

        storage.insert_person_skill(&row).await.expect("first insert");
        let err = storage.insert_person_skill(&row).await.unwrap_err();
        assert!(matches!(err, AthenaiError::Conflict { .. }), "got {err}");

        storage
            .insert_person_skill(&PersonSkill { person: 1, skill: 11 })
            .await
            .expect("new combination");
        storage
            .insert_person_skill(&PersonSkill { person: 2, skill: 10 })
            .await
            .expect("new combination");

        assert_eq!(storage.skills_for_person(1).await.unwrap(), [10, 11]);
    }

    #[tokio::test]
    async fn requirement_triple_is_unique() {
        let storage = seeded_storage().await;
        let row = ProjectSkillRequirement {
            project: 100,
            skill: 10,
            weight: 5,
        };

        storage.insert_project_skill_requirement(&row).await.unwrap();
        assert!(matches!(
            storage.insert_project_skill_requirement(&row).await,
            Err(AthenaiError::Conflict { .. })
        ));

        // Same pair with another weight is a distinct key.
        storage
            .insert_project_skill_requirement(&ProjectSkillRequirement { weight: 8, ..row })
            .await
            .expect("different weight");

        let reqs = storage.requirements_for_project(100).await.unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].weight, 8);
    }

    #[tokio::test]
    async fn project_domain_pair_is_unique() {
        let storage = seeded_storage().await;
        storage
            .insert_domain(&Domain {
                id: 7,
                name: "space".into(),
                info: String::new(),
            })
            .await
            .unwrap();

        let row = ProjectDomain {
            project: 100,
            domain: 7,
        };
        storage.insert_project_domain(&row).await.unwrap();
        assert!(matches!(
            storage.insert_project_domain(&row).await,
            Err(AthenaiError::Conflict { .. })
        ));
        assert_eq!(storage.domains_for_project(100).await.unwrap(), [7]);
    }

    #[tokio::test]
    async fn membership_defaults_to_pending() {
        let storage = seeded_storage().await;
        let id = storage
            .insert_person_project(&PersonProject::new(2, 100))
            .await
            .unwrap();

        let members = storage.members_of_project(100).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, Some(id));
        assert_eq!(members[0].approval, ApprovalStatus::Pending);

        let selected = PersonProject {
            approval: ApprovalStatus::Selected,
            ..PersonProject::new(1, 100)
        };
        storage.insert_person_project(&selected).await.unwrap();
        let members = storage.members_of_project(100).await.unwrap();
        assert_eq!(members[1].approval, ApprovalStatus::Selected);
    }

    #[tokio::test]
    async fn association_requires_existing_rows() {
        let storage = seeded_storage().await;
        let err = storage
            .insert_person_skill(&PersonSkill { person: 99, skill: 10 })
            .await
            .unwrap_err();
        assert!(matches!(err, AthenaiError::Validation { .. }), "got {err}");
    }

    #[tokio::test]
    async fn deleting_user_cascades() {
        let storage = seeded_storage().await;
        storage
            .insert_person_skill(&PersonSkill { person: 2, skill: 10 })
            .await
            .unwrap();
        storage
            .insert_person_project(&PersonProject::new(2, 100))
            .await
            .unwrap();
        storage
            .insert_project_skill_requirement(&ProjectSkillRequirement {
                project: 100,
                skill: 11,
                weight: 3,
            })
            .await
            .unwrap();

        // Grace's rows go; the project (owned by Ada) stays.
        storage.delete_user(2).await.unwrap();
        assert!(storage.skills_for_person(2).await.unwrap().is_empty());
        assert!(storage.members_of_project(100).await.unwrap().is_empty());
        assert_eq!(storage.requirements_for_project(100).await.unwrap().len(), 1);

        // Ada owns the project; deleting her takes the project and its requirements.
        storage.delete_user(1).await.unwrap();
        assert!(storage.get_project(100).await.unwrap().is_none());
        assert!(storage.requirements_for_project(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_project_cascades() {
        let storage = seeded_storage().await;
        storage
            .insert_domain(&Domain {
                id: 7,
                name: "space".into(),
                info: String::new(),
            })
            .await
            .unwrap();
        storage
            .insert_project_domain(&ProjectDomain {
                project: 100,
                domain: 7,
            })
            .await
            .unwrap();
        storage
            .insert_person_project(&PersonProject::new(2, 100))
            .await
            .unwrap();

        assert!(storage.delete_project(100).await.unwrap());
        assert!(storage.domains_for_project(100).await.unwrap().is_empty());
        assert!(storage.members_of_project(100).await.unwrap().is_empty());

        // Referenced entities are not owned by the association rows.
        assert!(storage.get_domain(7).await.unwrap().is_some());
        assert!(storage.get_user(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_skill_cascades() {
        let storage = seeded_storage().await;
        storage
            .insert_person_skill(&PersonSkill { person: 1, skill: 10 })
            .await
            .unwrap();
        assert!(storage.delete_skill(10).await.unwrap());
        assert!(storage.skills_for_person(1).await.unwrap().is_empty());
        assert!(storage.get_user(1).await.unwrap().is_some());
    }
}
