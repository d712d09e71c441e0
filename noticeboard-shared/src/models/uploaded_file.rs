/// Uploaded file model (PDFs and images)
///
/// Every file uploaded from the dashboard is one row. A single upload can
/// carry a PDF and an image; each becomes its own row sharing title, category
/// and upload time. Records are looked up by category plus ID, which is how
/// the public site and the dashboard address them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE uploaded_files (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     kind VARCHAR(16) NOT NULL CHECK (kind IN ('pdf', 'image')),
///     title VARCHAR(512) NOT NULL,
///     category VARCHAR(255) NOT NULL,
///     file_name VARCHAR(1024) NOT NULL,
///     upload_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::fmt;
use uuid::Uuid;

const FILE_COLUMNS: &str =
    "id, kind, title, category, file_name, upload_time, created_at, updated_at";

/// Which upload field produced a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Sent in the `file` part
    Pdf,

    /// Sent in the `image` part
    Image,
}

impl FileKind {
    /// Converts kind to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
        }
    }

    /// Multipart field name that carries this kind
    pub fn field_name(&self) -> &'static str {
        match self {
            FileKind::Pdf => "file",
            FileKind::Image => "image",
        }
    }

    /// Kind for a multipart field name
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "file" => Some(FileKind::Pdf),
            "image" => Some(FileKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored kind string that is neither `pdf` nor `image`
#[derive(Debug, thiserror::Error)]
#[error("Unknown file kind: {0}")]
pub struct UnknownFileKind(pub String);

impl TryFrom<String> for FileKind {
    type Error = UnknownFileKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "image" => Ok(FileKind::Image),
            _ => Err(UnknownFileKind(value)),
        }
    }
}

/// Uploaded file record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UploadedFile {
    pub id: Uuid,

    #[sqlx(try_from = "String")]
    pub kind: FileKind,

    pub title: String,

    /// Free-text tag such as "Notice" or "Vacancy"
    pub category: String,

    /// Stored name inside the upload directory
    pub file_name: String,

    /// When the upload request was received; listings sort on it
    pub upload_time: DateTime<Utc>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating an uploaded file record
#[derive(Debug, Clone)]
pub struct CreateUploadedFile {
    pub kind: FileKind,
    pub title: String,
    pub category: String,
    pub file_name: String,
    pub upload_time: DateTime<Utc>,
}

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Restrict to one category
    pub category: Option<String>,

    /// Page size; `None` returns everything after `offset`
    pub limit: Option<i64>,

    /// Rows to skip
    pub offset: i64,
}

/// Number of files in one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

impl UploadedFile {
    /// Inserts a record
    pub async fn create(pool: &PgPool, data: CreateUploadedFile) -> Result<Self, sqlx::Error> {
        let file = sqlx::query_as::<_, UploadedFile>(&format!(
            r#"
            INSERT INTO uploaded_files (kind, title, category, file_name, upload_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(data.kind.as_str())
        .bind(data.title)
        .bind(data.category)
        .bind(data.file_name)
        .bind(data.upload_time)
        .fetch_one(pool)
        .await?;

        Ok(file)
    }

    /// Inserts several records in one transaction
    ///
    /// Either every record is stored or none is.
    pub async fn create_many(
        pool: &PgPool,
        rows: Vec<CreateUploadedFile>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx: Transaction<'_, Postgres> = pool.begin().await?;
        let mut files = Vec::with_capacity(rows.len());

        for data in rows {
            let file = sqlx::query_as::<_, UploadedFile>(&format!(
                r#"
                INSERT INTO uploaded_files (kind, title, category, file_name, upload_time)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {}
                "#,
                FILE_COLUMNS
            ))
            .bind(data.kind.as_str())
            .bind(data.title)
            .bind(data.category)
            .bind(data.file_name)
            .bind(data.upload_time)
            .fetch_one(&mut *tx)
            .await?;

            files.push(file);
        }

        tx.commit().await?;
        Ok(files)
    }

    /// Lists records, newest upload first
    pub async fn list(pool: &PgPool, filter: &FileFilter) -> Result<Vec<Self>, sqlx::Error> {
        let files = sqlx::query_as::<_, UploadedFile>(&format!(
            r#"
            SELECT {}
            FROM uploaded_files
            WHERE ($1::TEXT IS NULL OR category = $1)
            ORDER BY upload_time DESC, created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "#,
            FILE_COLUMNS
        ))
        .bind(filter.category.as_deref())
        .bind(filter.limit)
        .bind(filter.offset.max(0))
        .fetch_all(pool)
        .await?;

        Ok(files)
    }

    /// Counts records, optionally in one category
    pub async fn count(pool: &PgPool, category: Option<&str>) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM uploaded_files WHERE ($1::TEXT IS NULL OR category = $1)",
        )
        .bind(category)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Finds a record by ID within a category
    pub async fn find_in_category(
        pool: &PgPool,
        id: Uuid,
        category: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let file = sqlx::query_as::<_, UploadedFile>(&format!(
            "SELECT {} FROM uploaded_files WHERE id = $1 AND category = $2",
            FILE_COLUMNS
        ))
        .bind(id)
        .bind(category)
        .fetch_optional(pool)
        .await?;

        Ok(file)
    }

    /// Renames a record; `None` if no record has that ID in that category
    pub async fn update_title(
        pool: &PgPool,
        id: Uuid,
        category: &str,
        title: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let file = sqlx::query_as::<_, UploadedFile>(&format!(
            r#"
            UPDATE uploaded_files
            SET title = $3, updated_at = NOW()
            WHERE id = $1 AND category = $2
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(id)
        .bind(category)
        .bind(title)
        .fetch_optional(pool)
        .await?;

        Ok(file)
    }

    /// Deletes a record; `true` if a row was removed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM uploaded_files WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Distinct categories with their file counts, alphabetically
    pub async fn categories(pool: &PgPool) -> Result<Vec<CategoryCount>, sqlx::Error> {
        let categories = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS count
            FROM uploaded_files
            GROUP BY category
            ORDER BY category ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }
}
