/// Gallery endpoints
///
/// Albums carry a title, a date and one to five files uploaded in the
/// repeated `files` multipart part.
///
/// # Endpoints
///
/// - `POST /api/gallery` - Create an album (auth)
/// - `GET /api/gallery` - All albums, newest date first
/// - `GET /api/gallery/:id` - One album
/// - `PUT /api/gallery/:id` - Update title/date, optionally replace files (auth)
/// - `DELETE /api/gallery/:id` - Delete an album and its files (auth)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    upload::{self, StoredUpload, UploadError, WrittenFiles},
};
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use noticeboard_shared::models::gallery::{
    CreateGalleryAlbum, GalleryAlbum, GalleryFile, GalleryRecord, NewGalleryFile,
    UpdateGalleryAlbum,
};
use serde::Serialize;
use uuid::Uuid;

/// Multipart part that carries album files
const FILES_FIELD: &str = "files";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumFileBody {
    pub id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_url: String,
}

/// Album as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumBody {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub files: Vec<AlbumFileBody>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlbumBody {
    fn new(record: GalleryRecord, base: &str) -> Self {
        let GalleryRecord { album, files } = record;

        Self {
            id: album.id,
            title: album.title,
            date: album.date,
            files: files
                .into_iter()
                .map(|f| AlbumFileBody {
                    file_url: upload::file_url(base, &f.file_path),
                    id: f.id,
                    file_name: f.file_name,
                    file_path: f.file_path,
                })
                .collect(),
            created_at: album.created_at,
            updated_at: album.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlbumResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: AlbumBody,
}

#[derive(Debug, Serialize)]
pub struct AlbumListResponse {
    pub data: Vec<AlbumBody>,
}

#[derive(Debug, Serialize)]
pub struct DeleteAlbumResponse {
    pub message: String,
}

/// Fields collected from an album form
#[derive(Debug, Default)]
struct AlbumForm {
    title: Option<String>,
    date: Option<String>,
    files: Vec<StoredUpload>,
}

/// Title and date of an album form, checked
#[derive(Debug, PartialEq)]
struct AlbumFields {
    title: String,
    date: DateTime<Utc>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Gallery record not found".to_string())
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| not_found())
}

fn album_fields(title: Option<String>, date: Option<String>) -> ApiResult<AlbumFields> {
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Title is required".to_string()))?;

    let date = date
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Date is required".to_string()))?;

    let date = upload::parse_date(&date)
        .ok_or_else(|| ApiError::BadRequest("Invalid date format".to_string()))?;

    Ok(AlbumFields { title, date })
}

fn new_files(files: Vec<StoredUpload>) -> Vec<NewGalleryFile> {
    files
        .into_iter()
        .map(|f| NewGalleryFile {
            file_name: f.original_name,
            file_path: f.stored_name,
        })
        .collect()
}

fn stored_names(files: &[GalleryFile]) -> impl Iterator<Item = &str> {
    files.iter().map(|f| f.file_path.as_str())
}

async fn read_album_form(
    state: &AppState,
    multipart: &mut Multipart,
    written: &mut WrittenFiles,
) -> ApiResult<AlbumForm> {
    let max_files = state.config.uploads.max_gallery_files;
    let mut form = AlbumForm::default();

    while let Some(field) = multipart.next_field().await.map_err(UploadError::from)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(UploadError::from)?),
            "date" => form.date = Some(field.text().await.map_err(UploadError::from)?),
            FILES_FIELD => {
                if field.file_name().map_or(true, str::is_empty) {
                    continue;
                }

                if form.files.len() >= max_files {
                    return Err(UploadError::TooManyFiles { max: max_files }.into());
                }

                let stored = state.uploads.save_field(field, written).await?;
                form.files.push(stored);
            }
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

async fn store_album(
    state: &AppState,
    multipart: &mut Multipart,
    written: &mut WrittenFiles,
) -> ApiResult<GalleryRecord> {
    let form = read_album_form(state, multipart, written).await?;
    let fields = album_fields(form.title, form.date)?;

    if form.files.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one file is required".to_string(),
        ));
    }

    let record = GalleryAlbum::create(
        &state.db,
        CreateGalleryAlbum {
            title: fields.title,
            date: fields.date,
            files: new_files(form.files),
        },
    )
    .await?;

    Ok(record)
}

/// Create an album
///
/// ```text
/// POST /api/gallery
/// Content-Type: multipart/form-data
///
/// title=Sports Day
/// date=2025-01-10
/// files=<race.jpg>
/// files=<medals.png>
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing title or date, bad date, no files, too many
///   files, wrong type, file too large
pub async fn create_album(
    State(state): State<AppState>,
    headers: HeaderMap,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<(StatusCode, Json<AlbumResponse>)> {
    let mut written = WrittenFiles::new();

    let record = match store_album(&state, &mut multipart, &mut written).await {
        Ok(record) => record,
        Err(err) => {
            written.discard().await;
            return Err(err);
        }
    };

    tracing::info!(album_id = %record.album.id, files = record.files.len(), "Gallery album created");

    let base = upload::base_url(state.config.api.public_base_url.as_deref(), &headers);

    Ok((
        StatusCode::CREATED,
        Json(AlbumResponse {
            message: Some("Files uploaded successfully".to_string()),
            data: AlbumBody::new(record, &base),
        }),
    ))
}

/// All albums, newest date first
pub async fn list_albums(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AlbumListResponse>> {
    let records = GalleryAlbum::list(&state.db).await?;
    let base = upload::base_url(state.config.api.public_base_url.as_deref(), &headers);

    Ok(Json(AlbumListResponse {
        data: records
            .into_iter()
            .map(|r| AlbumBody::new(r, &base))
            .collect(),
    }))
}

/// One album
pub async fn get_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<AlbumResponse>> {
    let id = parse_id(&id)?;
    let record = GalleryAlbum::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    let base = upload::base_url(state.config.api.public_base_url.as_deref(), &headers);

    Ok(Json(AlbumResponse {
        message: None,
        data: AlbumBody::new(record, &base),
    }))
}

async fn apply_album_update(
    state: &AppState,
    id: Uuid,
    multipart: &mut Multipart,
    written: &mut WrittenFiles,
) -> ApiResult<GalleryRecord> {
    let form = read_album_form(state, multipart, written).await?;
    let fields = album_fields(form.title, form.date)?;

    let files = if form.files.is_empty() {
        None
    } else {
        Some(new_files(form.files))
    };

    let update = GalleryAlbum::update(
        &state.db,
        id,
        UpdateGalleryAlbum {
            title: fields.title,
            date: fields.date,
            files,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    state.uploads.remove_all(stored_names(&update.replaced)).await;

    Ok(update.record)
}

/// Update an album
///
/// Title and date are always replaced. When the form carries files they
/// replace every existing file of the album and the old files are deleted
/// from disk.
pub async fn update_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<Json<AlbumResponse>> {
    let id = parse_id(&id)?;
    let mut written = WrittenFiles::new();

    let record = match apply_album_update(&state, id, &mut multipart, &mut written).await {
        Ok(record) => record,
        Err(err) => {
            written.discard().await;
            return Err(err);
        }
    };

    tracing::info!(album_id = %id, "Gallery album updated");

    let base = upload::base_url(state.config.api.public_base_url.as_deref(), &headers);

    Ok(Json(AlbumResponse {
        message: Some("Gallery updated successfully".to_string()),
        data: AlbumBody::new(record, &base),
    }))
}

/// Delete an album and its files
pub async fn delete_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteAlbumResponse>> {
    let id = parse_id(&id)?;

    let files = GalleryAlbum::delete(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    state.uploads.remove_all(stored_names(&files)).await;

    tracing::info!(album_id = %id, files = files.len(), "Gallery album deleted");

    Ok(Json(DeleteAlbumResponse {
        message: "Gallery deleted successfully".to_string(),
    }))
}
