/// Document and image endpoints
///
/// PDFs arrive in the `file` multipart part and images in the `image` part;
/// each becomes one record filed under the request's category.
///
/// # Endpoints
///
/// - `POST /api/upload` - Upload a PDF and/or an image (auth)
/// - `GET /api/get-files` - All records, newest first
/// - `GET /api/files-by-category/:category` - Records in one category
/// - `GET /api/categories` - Categories with record counts
/// - `PUT /api/edit-file/:category/:id` - Rename a record (auth)
/// - `DELETE /api/delete-file/:category/:id` - Delete a record and its file (auth)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    upload::{self, PageQuery, StoredUpload, UploadError, WrittenFiles},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use noticeboard_shared::models::uploaded_file::{
    CategoryCount, CreateUploadedFile, FileFilter, FileKind, UploadedFile,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One record as the public site sees it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: Uuid,
    pub kind: FileKind,
    pub title: String,
    pub category: String,
    pub file_name: String,
    pub file_url: String,
    pub upload_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileEntry {
    fn new(file: UploadedFile, base: &str) -> Self {
        Self {
            file_url: upload::file_url(base, &file.file_name),
            id: file.id,
            kind: file.kind,
            title: file.title,
            category: file.category,
            file_name: file.file_name,
            upload_time: file.upload_time,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<FileEntry>,
}

/// Listing body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListing {
    /// PDFs on this page
    pub pdf_data: Vec<FileEntry>,

    /// Images on this page
    pub image_data: Vec<FileEntry>,

    /// This page, both kinds, newest first
    pub files: Vec<FileEntry>,

    pub page: i64,

    /// Page size; absent when the whole list is one page
    pub limit: Option<i64>,

    pub total_files: i64,

    pub total_pages: i64,
}

impl FileListing {
    fn new(files: Vec<FileEntry>, page: i64, limit: Option<i64>, total: i64, pages: i64) -> Self {
        let (pdf_data, image_data): (Vec<FileEntry>, Vec<FileEntry>) = files
            .iter()
            .cloned()
            .partition(|f| f.kind == FileKind::Pdf);

        Self {
            pdf_data,
            image_data,
            files,
            page,
            limit,
            total_files: total,
            total_pages: pages,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditFileRequest {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditFileResponse {
    pub message: String,
    pub updated_file: FileEntry,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryCount>,
}

/// Form fields collected from an upload request
#[derive(Debug, Default)]
struct UploadForm {
    title: Option<String>,
    category: Option<String>,
    files: Vec<(FileKind, StoredUpload)>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn not_found() -> ApiError {
    ApiError::NotFound("File or image not found".to_string())
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| not_found())
}

async fn read_upload_form(
    state: &AppState,
    multipart: &mut Multipart,
    written: &mut WrittenFiles,
) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(UploadError::from)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(UploadError::from)?),
            "category" => form.category = Some(field.text().await.map_err(UploadError::from)?),
            _ => {
                let Some(kind) = FileKind::from_field_name(&name) else {
                    tracing::debug!(field = %name, "Ignoring unknown multipart field");
                    continue;
                };

                // Browsers send an empty part when no file was chosen
                if field.file_name().map_or(true, str::is_empty) {
                    continue;
                }

                if form.files.iter().any(|(k, _)| *k == kind) {
                    tracing::debug!(field = %name, "Ignoring extra file in field");
                    continue;
                }

                let stored = state.uploads.save_field(field, written).await?;
                form.files.push((kind, stored));
            }
        }
    }

    Ok(form)
}

async fn store_upload(
    state: &AppState,
    multipart: &mut Multipart,
    written: &mut WrittenFiles,
) -> ApiResult<Vec<UploadedFile>> {
    let form = read_upload_form(state, multipart, written).await?;

    let (Some(title), Some(category)) = (non_blank(form.title), non_blank(form.category)) else {
        return Err(ApiError::BadRequest(
            "Title and category are required".to_string(),
        ));
    };

    if form.files.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one file is required".to_string(),
        ));
    }

    let upload_time = Utc::now();
    let rows = form
        .files
        .into_iter()
        .map(|(kind, stored)| CreateUploadedFile {
            kind,
            title: title.clone(),
            category: category.clone(),
            file_name: stored.stored_name,
            upload_time,
        })
        .collect();

    Ok(UploadedFile::create_many(&state.db, rows).await?)
}

/// Upload a PDF and/or an image
///
/// ```text
/// POST /api/upload
/// Content-Type: multipart/form-data
///
/// title=Exam schedule
/// category=Notice
/// file=<schedule.pdf>
/// image=<poster.png>
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing title/category, no file, wrong type, too large
/// - `401 Unauthorized`: Not logged in
pub async fn upload_files(
    State(state): State<AppState>,
    headers: HeaderMap,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut written = WrittenFiles::new();

    let records = match store_upload(&state, &mut multipart, &mut written).await {
        Ok(records) => records,
        Err(err) => {
            written.discard().await;
            return Err(err);
        }
    };

    tracing::info!(count = records.len(), "Files uploaded");

    let base = upload::base_url(state.config.api.public_base_url.as_deref(), &headers);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Files uploaded successfully".to_string(),
            files: records
                .into_iter()
                .map(|f| FileEntry::new(f, &base))
                .collect(),
        }),
    ))
}

async fn listing(
    state: &AppState,
    headers: &HeaderMap,
    category: Option<String>,
    query: PageQuery,
) -> ApiResult<Json<FileListing>> {
    let window = query.resolve().map_err(ApiError::BadRequest)?;

    let total = UploadedFile::count(&state.db, category.as_deref()).await?;
    let files = UploadedFile::list(
        &state.db,
        &FileFilter {
            category,
            limit: window.limit,
            offset: window.offset(),
        },
    )
    .await?;

    let base = upload::base_url(state.config.api.public_base_url.as_deref(), headers);
    let entries = files.into_iter().map(|f| FileEntry::new(f, &base)).collect();

    Ok(Json(FileListing::new(
        entries,
        window.page,
        window.limit,
        total,
        window.total_pages(total),
    )))
}

/// All records, newest upload first
///
/// Optional `?page=&limit=`; without `limit` everything is returned as page 1.
pub async fn list_files(
    State(state): State<AppState>,
    headers: HeaderMap,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, ApiError>,
) -> ApiResult<Json<FileListing>> {
    listing(&state, &headers, None, query).await
}

/// Records in one category, newest upload first
pub async fn list_files_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    headers: HeaderMap,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, ApiError>,
) -> ApiResult<Json<FileListing>> {
    listing(&state, &headers, Some(category), query).await
}

/// Distinct categories with their record counts
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<CategoriesResponse>> {
    let categories = UploadedFile::categories(&state.db).await?;
    Ok(Json(CategoriesResponse { categories }))
}

/// Rename a record
///
/// # Errors
///
/// - `400 Bad Request`: Title missing or blank
/// - `404 Not Found`: No record with that ID in that category
pub async fn edit_file(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
    headers: HeaderMap,
    WithRejection(Json(req), _): WithRejection<Json<EditFileRequest>, ApiError>,
) -> ApiResult<Json<EditFileResponse>> {
    let title = non_blank(req.title)
        .ok_or_else(|| ApiError::BadRequest("New title is required".to_string()))?;
    let id = parse_id(&id)?;

    let updated = UploadedFile::update_title(&state.db, id, &category, &title)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(file_id = %updated.id, "File renamed");

    let base = upload::base_url(state.config.api.public_base_url.as_deref(), &headers);

    Ok(Json(EditFileResponse {
        message: "File updated successfully".to_string(),
        updated_file: FileEntry::new(updated, &base),
    }))
}

/// Delete a record and its stored file
///
/// The row goes first; a stored file that is already gone, or that cannot
/// be removed afterwards, is logged and the delete still succeeds.
pub async fn delete_file(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteFileResponse>> {
    let id = parse_id(&id)?;

    let file = UploadedFile::find_in_category(&state.db, id, &category)
        .await?
        .ok_or_else(not_found)?;

    if !UploadedFile::delete(&state.db, file.id).await? {
        return Err(not_found());
    }

    state.uploads.remove_all([file.file_name.as_str()]).await;

    tracing::info!(file_id = %file.id, kind = %file.kind, "File deleted");

    Ok(Json(DeleteFileResponse {
        message: "File deleted successfully".to_string(),
    }))
}
