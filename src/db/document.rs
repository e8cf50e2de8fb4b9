use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{FileRecord, FileType, NewFile, ParentId};

/// Query over file records. Every field left unset matches anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileFilter {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub parent_id: Option<ParentId>,
}

impl FileFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match a record id given in any form a client may send it.
    /// A value that is not a UUID cannot match a stored record.
    pub fn id(mut self, raw: &str) -> Self {
        let raw = raw.trim();
        let id = match Uuid::parse_str(raw) {
            Ok(uuid) => uuid.to_string(),
            Err(_) => raw.to_string(),
        };
        self.id = Some(id);
        self
    }

    pub fn owner(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn parent(mut self, parent_id: ParentId) -> Self {
        self.parent_id = Some(match parent_id {
            ParentId::Root => ParentId::Root,
            ParentId::Folder(raw) => match Uuid::parse_str(raw.trim()) {
                Ok(uuid) => ParentId::Folder(uuid.to_string()),
                Err(_) => ParentId::Folder(raw),
            },
        });
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if let Some(id) = &self.id {
            qb.push(" AND id = ").push_bind(id.clone());
        }
        if let Some(user_id) = &self.user_id {
            qb.push(" AND user_id = ").push_bind(user_id.clone());
        }
        if let Some(parent_id) = &self.parent_id {
            qb.push(" AND parent_id = ").push_bind(parent_id.as_key().to_string());
        }
    }
}

/// Persistence for file metadata
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, filter: &FileFilter) -> Result<Option<FileRecord>>;

    /// Insert a document and return the identifier assigned to it
    async fn insert_one(&self, doc: &NewFile) -> Result<String>;

    /// Records matching `filter` in insertion order
    async fn find(&self, filter: &FileFilter, skip: u64, limit: u64) -> Result<Vec<FileRecord>>;

    async fn count(&self, filter: &FileFilter) -> Result<u64>;

    fn is_alive(&self) -> bool;

    async fn close(&self);
}

#[derive(Debug, FromRow)]
struct FileRow {
    id: String,
    user_id: String,
    name: String,
    #[sqlx(rename = "type")]
    file_type: String,
    is_public: bool,
    parent_id: String,
    local_path: Option<String>,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = AppError;

    fn try_from(row: FileRow) -> Result<Self> {
        let file_type = FileType::from_str(&row.file_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown file type '{}' on {}", row.file_type, row.id))
        })?;

        Ok(FileRecord {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            file_type,
            is_public: row.is_public,
            parent_id: ParentId::from_raw(&row.parent_id),
            local_path: row.local_path,
        })
    }
}

const FILE_COLUMNS: &str = "SELECT id, user_id, name, type, is_public, parent_id, local_path FROM files";

/// SQLite-backed document store
#[derive(Clone)]
pub struct SqliteDocumentStore {
    db: Database,
}

impl SqliteDocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_one(&self, filter: &FileFilter) -> Result<Option<FileRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(FILE_COLUMNS);
        filter.push_where(&mut qb);
        qb.push(" LIMIT 1");

        let row: Option<FileRow> = qb.build_query_as().fetch_optional(self.db.pool()).await?;
        row.map(FileRecord::try_from).transpose()
    }

    async fn insert_one(&self, doc: &NewFile) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO files (id, user_id, name, type, is_public, parent_id, local_path)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&doc.user_id)
        .bind(&doc.name)
        .bind(doc.file_type.as_str())
        .bind(doc.is_public)
        .bind(doc.parent_id.as_key())
        .bind(&doc.local_path)
        .execute(self.db.pool())
        .await?;

        tracing::debug!("Inserted file record {}", id);
        Ok(id)
    }

    async fn find(&self, filter: &FileFilter, skip: u64, limit: u64) -> Result<Vec<FileRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(FILE_COLUMNS);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY rowid LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));

        let rows: Vec<FileRow> = qb.build_query_as().fetch_all(self.db.pool()).await?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }

    async fn count(&self, filter: &FileFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM files");
        filter.push_where(&mut qb);

        let (count,): (i64,) = qb.build_query_as().fetch_one(self.db.pool()).await?;
        Ok(count.max(0) as u64)
    }

    fn is_alive(&self) -> bool {
        self.db.is_alive()
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
