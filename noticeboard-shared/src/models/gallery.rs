/// Gallery albums and their files
///
/// An album is a titled, dated group of up to five images or PDFs shown in
/// the public gallery. Albums and their files are written in one transaction
/// so an album is never visible without its files.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE gallery_albums (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(512) NOT NULL,
///     date TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE gallery_files (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     album_id UUID NOT NULL REFERENCES gallery_albums (id) ON DELETE CASCADE,
///     file_name VARCHAR(1024) NOT NULL,
///     file_path VARCHAR(1024) NOT NULL,
///     position INTEGER NOT NULL DEFAULT 0
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

const ALBUM_COLUMNS: &str = "id, title, date, created_at, updated_at";
const FILE_COLUMNS: &str = "id, album_id, file_name, file_path, position";

/// Gallery album row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GalleryAlbum {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File belonging to an album
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GalleryFile {
    pub id: Uuid,
    pub album_id: Uuid,

    /// Name the file had on the uploader's machine
    pub file_name: String,

    /// Stored name inside the upload directory
    pub file_path: String,

    /// Display order within the album
    pub position: i32,
}

/// An album together with its files, in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryRecord {
    pub album: GalleryAlbum,
    pub files: Vec<GalleryFile>,
}

/// File to attach to an album
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGalleryFile {
    pub file_name: String,
    pub file_path: String,
}

/// Input for creating an album
#[derive(Debug, Clone)]
pub struct CreateGalleryAlbum {
    pub title: String,
    pub date: DateTime<Utc>,
    pub files: Vec<NewGalleryFile>,
}

/// Input for updating an album
///
/// `files: Some(..)` replaces every file of the album; `None` keeps them.
#[derive(Debug, Clone)]
pub struct UpdateGalleryAlbum {
    pub title: String,
    pub date: DateTime<Utc>,
    pub files: Option<Vec<NewGalleryFile>>,
}

/// Result of an album update
#[derive(Debug, Clone)]
pub struct GalleryUpdate {
    /// Album as stored after the update
    pub record: GalleryRecord,

    /// Files detached from the album; their stored files can be removed
    pub replaced: Vec<GalleryFile>,
}

async fn insert_files(
    tx: &mut Transaction<'_, Postgres>,
    album_id: Uuid,
    files: Vec<NewGalleryFile>,
) -> Result<Vec<GalleryFile>, sqlx::Error> {
    let mut stored = Vec::with_capacity(files.len());

    for (position, file) in files.into_iter().enumerate() {
        let row = sqlx::query_as::<_, GalleryFile>(&format!(
            r#"
            INSERT INTO gallery_files (album_id, file_name, file_path, position)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(album_id)
        .bind(file.file_name)
        .bind(file.file_path)
        .bind(position as i32)
        .fetch_one(&mut **tx)
        .await?;

        stored.push(row);
    }

    Ok(stored)
}

impl GalleryAlbum {
    /// Creates an album and its files atomically
    pub async fn create(
        pool: &PgPool,
        data: CreateGalleryAlbum,
    ) -> Result<GalleryRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let album = sqlx::query_as::<_, GalleryAlbum>(&format!(
            "INSERT INTO gallery_albums (title, date) VALUES ($1, $2) RETURNING {}",
            ALBUM_COLUMNS
        ))
        .bind(data.title)
        .bind(data.date)
        .fetch_one(&mut *tx)
        .await?;

        let files = insert_files(&mut tx, album.id, data.files).await?;

        tx.commit().await?;

        tracing::debug!(album_id = %album.id, files = files.len(), "Gallery album created");
        Ok(GalleryRecord { album, files })
    }

    /// Finds an album with its files
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<GalleryRecord>, sqlx::Error> {
        let album = sqlx::query_as::<_, GalleryAlbum>(&format!(
            "SELECT {} FROM gallery_albums WHERE id = $1",
            ALBUM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(album) = album else {
            return Ok(None);
        };

        let files = Self::files_of(pool, album.id).await?;
        Ok(Some(GalleryRecord { album, files }))
    }

    /// Lists all albums with their files, newest date first
    pub async fn list(pool: &PgPool) -> Result<Vec<GalleryRecord>, sqlx::Error> {
        let albums = sqlx::query_as::<_, GalleryAlbum>(&format!(
            "SELECT {} FROM gallery_albums ORDER BY date DESC, created_at DESC",
            ALBUM_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        let ids: Vec<Uuid> = albums.iter().map(|a| a.id).collect();
        let files = sqlx::query_as::<_, GalleryFile>(&format!(
            "SELECT {} FROM gallery_files WHERE album_id = ANY($1) ORDER BY album_id, position",
            FILE_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut by_album: HashMap<Uuid, Vec<GalleryFile>> = HashMap::new();
        for file in files {
            by_album.entry(file.album_id).or_default().push(file);
        }

        Ok(albums
            .into_iter()
            .map(|album| {
                let files = by_album.remove(&album.id).unwrap_or_default();
                GalleryRecord { album, files }
            })
            .collect())
    }

    /// Files of one album in display order
    pub async fn files_of(pool: &PgPool, album_id: Uuid) -> Result<Vec<GalleryFile>, sqlx::Error> {
        sqlx::query_as::<_, GalleryFile>(&format!(
            "SELECT {} FROM gallery_files WHERE album_id = $1 ORDER BY position",
            FILE_COLUMNS
        ))
        .bind(album_id)
        .fetch_all(pool)
        .await
    }

    /// Updates title and date, optionally replacing all files
    ///
    /// Returns `None` if the album does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateGalleryAlbum,
    ) -> Result<Option<GalleryUpdate>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let album = sqlx::query_as::<_, GalleryAlbum>(&format!(
            r#"
            UPDATE gallery_albums
            SET title = $2, date = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ALBUM_COLUMNS
        ))
        .bind(id)
        .bind(data.title)
        .bind(data.date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(album) = album else {
            tx.rollback().await?;
            return Ok(None);
        };

        let (files, replaced) = match data.files {
            Some(new_files) => {
                let replaced = sqlx::query_as::<_, GalleryFile>(&format!(
                    "DELETE FROM gallery_files WHERE album_id = $1 RETURNING {}",
                    FILE_COLUMNS
                ))
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

                let files = insert_files(&mut tx, id, new_files).await?;
                (files, replaced)
            }
            None => {
                let files = sqlx::query_as::<_, GalleryFile>(&format!(
                    "SELECT {} FROM gallery_files WHERE album_id = $1 ORDER BY position",
                    FILE_COLUMNS
                ))
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
                (files, Vec::new())
            }
        };

        tx.commit().await?;

        Ok(Some(GalleryUpdate {
            record: GalleryRecord { album, files },
            replaced,
        }))
    }

    /// Deletes an album; returns its files so they can be removed from disk
    ///
    /// Returns `None` if the album does not exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Vec<GalleryFile>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let files = sqlx::query_as::<_, GalleryFile>(&format!(
            "SELECT {} FROM gallery_files WHERE album_id = $1 ORDER BY position",
            FILE_COLUMNS
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM gallery_albums WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_record_serializes_files() {
        let album_id = Uuid::new_v4();
        let record = GalleryRecord {
            album: GalleryAlbum {
                id: album_id,
                title: "Sports Day".to_string(),
                date: Utc::now(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            files: vec![GalleryFile {
                id: Uuid::new_v4(),
                album_id,
                file_name: "race.jpg".to_string(),
                file_path: "1700000000000-abcdef123456-race.jpg".to_string(),
                position: 0,
            }],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["album"]["title"], "Sports Day");
        assert_eq!(json["files"][0]["file_name"], "race.jpg");
    }
}
