//! DuckDB storage layer for text records and project configuration.
//!
//! One row per key per project in `texts`; one row per project in
//! `projects`. Supports both in-memory (ephemeral) and persistent
//! (file-backed) modes. Use [`open`](DuckStore::open) for in-memory and
//! [`open_persistent`](DuckStore::open_persistent) for file-backed storage
//! that survives across process restarts.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use duckdb::{Connection, params};
use textsync_core::{
    GitHubTarget, NewRecord, Project, RecordPatch, Sources, StoreFailure, TextRecord, TextStatus,
    TextStore,
};
use tracing::info;

use crate::StoreError;

const TEXT_COLUMNS: &str =
    "key, project_id, value, translation, status, category, sources, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, name, github_owner, github_repo, github_branch, github_path, \
     github_token, source_lang, target_lang, is_active";

/// Optional filters for [`DuckStore::list`]. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<TextStatus>,
    pub category: Option<String>,
    /// Case-insensitive substring over key, value, and translation.
    pub search: Option<String>,
}

/// DuckDB-backed store for text records and projects.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open or create a persistent DuckDB database at the given path.
    ///
    /// Existing tables are available immediately; call
    /// [`init`](Self::init) to create them on first use.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the `texts` and `projects` tables if missing. Idempotent.
    pub fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS texts (
                key        VARCHAR NOT NULL,
                project_id VARCHAR NOT NULL,
                value      VARCHAR NOT NULL,
                translation VARCHAR,
                status     VARCHAR NOT NULL,
                category   VARCHAR NOT NULL,
                sources    VARCHAR NOT NULL,
                created_at VARCHAR NOT NULL,
                updated_at VARCHAR NOT NULL,
                PRIMARY KEY (key, project_id)
            );
            CREATE TABLE IF NOT EXISTS projects (
                id            VARCHAR PRIMARY KEY,
                name          VARCHAR NOT NULL,
                github_owner  VARCHAR NOT NULL,
                github_repo   VARCHAR NOT NULL,
                github_branch VARCHAR NOT NULL,
                github_path   VARCHAR NOT NULL,
                github_token  VARCHAR NOT NULL,
                source_lang   VARCHAR NOT NULL,
                target_lang   VARCHAR NOT NULL,
                is_active     BOOLEAN NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Check whether both tables exist.
    pub fn has_tables(&self) -> bool {
        self.texts_count().is_ok() && self.projects_count().is_ok()
    }

    /// Number of rows in the `texts` table.
    pub fn texts_count(&self) -> Result<usize, StoreError> {
        self.count_table("texts")
    }

    /// Number of rows in the `projects` table.
    pub fn projects_count(&self) -> Result<usize, StoreError> {
        self.count_table("projects")
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT count(*) FROM {table}");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        match rows.next() {
            Some(n) => Ok(n? as usize),
            None => Ok(0),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("store mutex poisoned".into()))
    }

    // ── Text records ──

    /// Records of one project, `in_review` first, then `draft`, then
    /// `approved`, newest first within a status.
    pub fn list(&self, project_id: &str, filter: &ListFilter) -> Result<Vec<TextRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {TEXT_COLUMNS} FROM texts WHERE project_id = ?
             ORDER BY CASE status
                 WHEN 'in_review' THEN 0
                 WHEN 'draft' THEN 1
                 WHEN 'approved' THEN 2
                 ELSE 3 END,
             updated_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id], read_text_row)?;
        let mut records = Vec::new();
        for raw in rows {
            let record = raw?.into_record()?;
            if matches_filter(&record, filter) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// All records of one project, unfiltered.
    pub fn all(&self, project_id: &str) -> Result<Vec<TextRecord>, StoreError> {
        self.list(project_id, &ListFilter::default())
    }

    /// Distinct category labels of one project, sorted.
    pub fn categories(&self, project_id: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT category FROM texts WHERE project_id = ? ORDER BY category",
        )?;
        let rows = stmt.query_map(params![project_id], |row| row.get::<_, String>(0))?;
        let mut categories = Vec::new();
        for c in rows {
            categories.push(c?);
        }
        Ok(categories)
    }

    /// Delete records by key; returns how many rows went away.
    pub fn delete_keys(&self, project_id: &str, keys: &[String]) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let mut deleted = 0;
        for key in keys {
            deleted += conn.execute(
                "DELETE FROM texts WHERE key = ? AND project_id = ?",
                params![key, project_id],
            )?;
        }
        info!(project = project_id, deleted, "deleted records");
        Ok(deleted)
    }

    /// Rename a key in place, carrying category, sources, status, and
    /// translation forward — the record is the same logical string under a
    /// new name.
    pub fn rename_key(&self, project_id: &str, old: &str, new: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE texts SET key = ?, updated_at = ? WHERE key = ? AND project_id = ?",
            params![new, Utc::now().to_rfc3339(), old, project_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(old.to_string()));
        }
        info!(project = project_id, old, new, "renamed key");
        Ok(())
    }

    /// Set the review status of one record.
    pub fn set_status(
        &self,
        project_id: &str,
        key: &str,
        status: TextStatus,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE texts SET status = ?, updated_at = ? WHERE key = ? AND project_id = ?",
            params![status.as_str(), Utc::now().to_rfc3339(), key, project_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }

    /// Set the translator-supplied content of one record.
    pub fn set_translation(
        &self,
        project_id: &str,
        key: &str,
        translation: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE texts SET translation = ?, updated_at = ? WHERE key = ? AND project_id = ?",
            params![translation, Utc::now().to_rfc3339(), key, project_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }

    fn find_in(
        conn: &Connection,
        key: &str,
        project_id: &str,
    ) -> Result<Option<TextRecord>, StoreError> {
        let sql = format!("SELECT {TEXT_COLUMNS} FROM texts WHERE key = ? AND project_id = ?");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![key, project_id], read_text_row)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw?.into_record()?)),
            None => Ok(None),
        }
    }

    // ── Projects ──

    pub fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO projects ({PROJECT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                project.id,
                project.name,
                project.github.owner,
                project.github.repo,
                project.github.branch,
                project.github.path,
                project.github.token,
                project.source_lang,
                project.target_lang,
                project.is_active,
            ],
        )?;
        info!(id = %project.id, "created project");
        Ok(())
    }

    /// The single active project, if any.
    pub fn active_project(&self) -> Result<Option<Project>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE is_active LIMIT 1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map([], read_project_row)?;
        match rows.next() {
            Some(p) => Ok(Some(p?)),
            None => Ok(None),
        }
    }

    pub fn find_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], read_project_row)?;
        match rows.next() {
            Some(p) => Ok(Some(p?)),
            None => Ok(None),
        }
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_project_row)?;
        let mut projects = Vec::new();
        for p in rows {
            projects.push(p?);
        }
        Ok(projects)
    }

    /// Make `id` the single active project.
    pub fn set_active(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let exists = {
            let mut stmt = conn.prepare("SELECT count(*) FROM projects WHERE id = ?")?;
            let mut rows = stmt.query_map(params![id], |row| row.get::<_, i64>(0))?;
            matches!(rows.next(), Some(Ok(n)) if n > 0)
        };
        if !exists {
            return Err(StoreError::NotFound(id.to_string()));
        }
        conn.execute("UPDATE projects SET is_active = (id = ?)", params![id])?;
        Ok(())
    }
}

#[async_trait]
impl TextStore for DuckStore {
    async fn find(
        &self,
        key: &str,
        project_id: &str,
    ) -> Result<Option<TextRecord>, StoreFailure> {
        let conn = self.conn()?;
        Ok(Self::find_in(&conn, key, project_id)?)
    }

    async fn insert(&self, record: NewRecord) -> Result<TextRecord, StoreFailure> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let sources = serde_json::to_string(&record.sources).map_err(StoreError::Json)?;
        conn.execute(
            &format!("INSERT INTO texts ({TEXT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                record.key,
                record.project_id,
                record.value,
                None::<String>,
                record.status.as_str(),
                record.category,
                sources,
                now,
                now,
            ],
        )
        .map_err(StoreError::DuckDb)?;
        Ok(TextRecord {
            key: record.key,
            project_id: record.project_id,
            value: record.value,
            translation: None,
            status: record.status,
            category: record.category,
            sources: record.sources,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn update(
        &self,
        key: &str,
        project_id: &str,
        patch: RecordPatch,
    ) -> Result<TextRecord, StoreFailure> {
        // One lock hold covers the read-modify-write for this key.
        let conn = self.conn()?;
        let existing = Self::find_in(&conn, key, project_id)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        let value = patch.value.unwrap_or(existing.value);
        let category = patch.category.unwrap_or(existing.category);
        let sources = patch.sources.unwrap_or(existing.sources);
        let status = patch.status.unwrap_or(existing.status);
        let now = Utc::now().to_rfc3339();
        let sources_json = serde_json::to_string(&sources).map_err(StoreError::Json)?;

        conn.execute(
            "UPDATE texts SET value = ?, category = ?, sources = ?, status = ?, updated_at = ?
             WHERE key = ? AND project_id = ?",
            params![value, category, sources_json, status.as_str(), now, key, project_id],
        )
        .map_err(StoreError::DuckDb)?;

        Ok(TextRecord {
            key: key.to_string(),
            project_id: project_id.to_string(),
            value,
            translation: existing.translation,
            status,
            category,
            sources,
            created_at: existing.created_at,
            updated_at: now,
        })
    }
}

// ── Row mapping ──

/// Raw column values of one `texts` row, before status/sources parsing.
struct RawText {
    key: String,
    project_id: String,
    value: String,
    translation: Option<String>,
    status: String,
    category: String,
    sources: String,
    created_at: String,
    updated_at: String,
}

impl RawText {
    fn into_record(self) -> Result<TextRecord, StoreError> {
        let status: TextStatus = self.status.parse()?;
        let sources: Sources = serde_json::from_str(&self.sources)?;
        Ok(TextRecord {
            key: self.key,
            project_id: self.project_id,
            value: self.value,
            translation: self.translation,
            status,
            category: self.category,
            sources,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn read_text_row(row: &duckdb::Row<'_>) -> duckdb::Result<RawText> {
    Ok(RawText {
        key: row.get(0)?,
        project_id: row.get(1)?,
        value: row.get(2)?,
        translation: row.get(3)?,
        status: row.get(4)?,
        category: row.get(5)?,
        sources: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn read_project_row(row: &duckdb::Row<'_>) -> duckdb::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        github: GitHubTarget {
            owner: row.get(2)?,
            repo: row.get(3)?,
            branch: row.get(4)?,
            path: row.get(5)?,
            token: row.get(6)?,
        },
        source_lang: row.get(7)?,
        target_lang: row.get(8)?,
        is_active: row.get(9)?,
    })
}

fn matches_filter(record: &TextRecord, filter: &ListFilter) -> bool {
    if let Some(status) = filter.status
        && record.status != status
    {
        return false;
    }
    if let Some(category) = &filter.category
        && &record.category != category
    {
        return false;
    }
    if let Some(q) = &filter.search {
        let q = q.to_lowercase();
        let hit = record.key.to_lowercase().contains(&q)
            || record.value.to_lowercase().contains(&q)
            || record
                .translation
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&q));
        if !hit {
            return false;
        }
    }
    true
}
