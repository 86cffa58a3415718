//! Project persistence for the SQLite backend.

use crate::model::project::{NewProject, Project, ProjectPatch};
use crate::repo::sqlite_backend::{
    bool_to_int, from_epoch_ms, int_to_bool, new_row_id, to_epoch_ms, SqliteBackend,
};
use crate::repo::{ProjectRepository, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    owner_id,
    created_at,
    is_archived
FROM projects";

impl ProjectRepository for SqliteBackend {
    fn list_projects(&self, owner_id: &str) -> RepoResult<Vec<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PROJECT_SELECT_SQL}
                 WHERE owner_id = ?1 AND is_archived = 0
                 ORDER BY created_at DESC, rowid DESC;"
            ))?;
            let mut rows = stmt.query([owner_id])?;
            let mut projects = Vec::new();
            while let Some(row) = rows.next()? {
                projects.push(parse_project_row(row)?);
            }
            Ok(projects)
        })
    }

    fn get_project(&self, id: &str) -> RepoResult<Option<Project>> {
        self.with_conn(|conn| load_project(conn, id))
    }

    fn create_project(&self, project: &NewProject) -> RepoResult<Project> {
        project.validate()?;
        let id = new_row_id();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, name, description, owner_id, created_at, is_archived)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    id,
                    project.name,
                    project.description,
                    project.owner_id,
                    to_epoch_ms(project.created_at),
                    bool_to_int(project.is_archived),
                ],
            )?;
            load_project(conn, &id)?.ok_or_else(|| RepoError::not_found("project", id.as_str()))
        })
    }

    fn update_project(&self, id: &str, patch: &ProjectPatch) -> RepoResult<Project> {
        patch.validate()?;
        self.with_conn(|conn| {
            let mut project =
                load_project(conn, id)?.ok_or_else(|| RepoError::not_found("project", id))?;
            patch.apply_to(&mut project);
            conn.execute(
                "UPDATE projects
                 SET name = ?1, description = ?2, is_archived = ?3
                 WHERE id = ?4;",
                params![
                    project.name,
                    project.description,
                    bool_to_int(project.is_archived),
                    id,
                ],
            )?;
            Ok(project)
        })
    }

    fn delete_project(&self, id: &str) -> RepoResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM projects WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found("project", id));
            }
            Ok(())
        })
    }
}

fn load_project(conn: &Connection, id: &str) -> RepoResult<Option<Project>> {
    let mut stmt = conn.prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_project_row(row)?)),
        None => Ok(None),
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        owner_id: row.get("owner_id")?,
        created_at: from_epoch_ms(row.get("created_at")?, "projects.created_at")?,
        is_archived: int_to_bool(row.get("is_archived")?, "projects.is_archived")?,
    })
}
