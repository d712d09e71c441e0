/// Upload storage
///
/// Multipart file parts are streamed to the upload directory under a
/// generated name and served back from `/files/<name>`.
///
/// # Stored names
///
/// ```text
/// <unix-millis>-<12 hex chars>-<sanitized original name>
/// 1736500000000-9f2c4a1b7e3d-annual-report.pdf
/// ```
///
/// # Accepted types
///
/// Both the extension and the declared MIME type must be one of
/// `jpeg`, `jpg`, `png` or `pdf`.

use axum::extract::multipart::{Field, MultipartError};
use axum::http::{header, HeaderMap, StatusCode};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rand::RngCore;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Extensions and MIME subtypes accepted for upload
pub const ALLOWED_TYPES: &[&str] = &["jpeg", "jpg", "png", "pdf"];

/// Largest page size a listing will return
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Upload errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Extension or MIME type not allowed
    #[error("Only JPEG, JPG, PNG, and PDF files are allowed")]
    UnsupportedType,

    /// File exceeded the per-file limit
    #[error("File size exceeds the {} limit", format_size(*.limit))]
    TooLarge { limit: u64 },

    /// Too many file parts in one request
    #[error("Too many files uploaded (max: {max})")]
    TooManyFiles { max: usize },

    /// Malformed multipart body
    #[error("Invalid multipart body: {message}")]
    Multipart { status: StatusCode, message: String },

    /// Writing to the upload directory failed
    #[error("Upload storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        UploadError::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

/// A file written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Name the client sent, sanitized
    pub original_name: String,

    /// Generated name inside the upload directory
    pub stored_name: String,
}

/// Human-readable size in the largest unit that divides it exactly
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Whether a file with this name and MIME type may be uploaded
pub fn is_allowed(file_name: &str, content_type: Option<&str>) -> bool {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let extension_ok = extension
        .as_deref()
        .map(|e| ALLOWED_TYPES.contains(&e))
        .unwrap_or(false);

    let mime_ok = content_type
        .and_then(|mime| mime.split(';').next())
        .and_then(|mime| mime.trim().rsplit('/').next())
        .map(|subtype| ALLOWED_TYPES.contains(&subtype.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    extension_ok && mime_ok
}

/// Generates a unique stored name that keeps the sanitized original name
pub fn stored_file_name(original: &str) -> String {
    let mut suffix = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut suffix);

    let mut safe: String = sanitize_filename::sanitize(original)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() || safe.chars().all(|c| c == '.') {
        safe = "upload".to_string();
    }

    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        hex::encode(suffix),
        safe
    )
}

/// Base URL that file links are built on
///
/// Uses the configured public URL when there is one, otherwise the request's
/// `Host` header and `X-Forwarded-Proto` (default `http`).
pub fn base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = configured {
        return url.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| *v == "https" || *v == "http")
        .unwrap_or("http");

    format!("{}://{}", scheme, host)
}

/// Public URL of a stored file
pub fn file_url(base: &str, stored_name: &str) -> String {
    format!("{}/files/{}", base, stored_name)
}

/// Files written during one request
///
/// Call [`WrittenFiles::discard`] when the request fails so nothing it
/// stored is left behind.
#[derive(Debug, Default)]
pub struct WrittenFiles {
    paths: Vec<PathBuf>,
}

impl WrittenFiles {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Removes every file written so far
    pub async fn discard(self) {
        for path in self.paths {
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload");
            }
        }
    }
}

/// Upload directory with its limits
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_file_size: u64,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            dir: dir.into(),
            max_file_size,
        }
    }

    /// Directory files are stored in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the upload directory if it is missing
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Path of a stored file; `None` if the name could escape the directory
    pub fn path_of(&self, stored_name: &str) -> Option<PathBuf> {
        if stored_name.is_empty()
            || stored_name.contains('/')
            || stored_name.contains('\\')
            || stored_name == "."
            || stored_name == ".."
        {
            return None;
        }

        Some(self.dir.join(stored_name))
    }

    /// Streams a multipart file part to disk
    ///
    /// The type check runs before anything is written. The file is recorded
    /// in `written` as soon as it is created, so a part that fails half way
    /// is removed by [`WrittenFiles::discard`].
    pub async fn save_field(
        &self,
        mut field: Field<'_>,
        written: &mut WrittenFiles,
    ) -> Result<StoredUpload, UploadError> {
        let original_name = field.file_name().unwrap_or("upload").to_string();

        if !is_allowed(&original_name, field.content_type()) {
            return Err(UploadError::UnsupportedType);
        }

        let stored_name = stored_file_name(&original_name);
        let path = self.dir.join(&stored_name);

        let mut file = fs::File::create(&path).await?;
        written.push(path.clone());

        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if size > self.max_file_size {
                drop(file);
                return Err(UploadError::TooLarge {
                    limit: self.max_file_size,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        tracing::debug!(stored_name = %stored_name, size, "Stored upload");

        Ok(StoredUpload {
            original_name: sanitize_filename::sanitize(&original_name),
            stored_name,
        })
    }

    /// Removes a stored file; `false` if it was already gone
    pub async fn remove(&self, stored_name: &str) -> std::io::Result<bool> {
        let Some(path) = self.path_of(stored_name) else {
            return Ok(false);
        };

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Removes stored files, logging failures instead of returning them
    pub async fn remove_all<'a>(&self, stored_names: impl IntoIterator<Item = &'a str>) {
        for name in stored_names {
            match self.remove(name).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!(file = %name, "Stored file already missing"),
                Err(e) => tracing::error!(file = %name, error = %e, "Failed to remove stored file"),
            }
        }
    }
}

/// Parses an album date
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC) and
/// plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `?page=&limit=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,

    /// `None` means the whole list is one page
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Validates the query and clamps the limit
    ///
    /// Without a limit the whole list is page 1, so asking for a later page
    /// is an error.
    pub fn resolve(self) -> Result<PageWindow, String> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err("Page must be at least 1".to_string());
        }
        if page > 1 && self.limit.is_none() {
            return Err("Page requires a limit".to_string());
        }

        let limit = match self.limit {
            Some(limit) if limit < 1 => return Err("Limit must be at least 1".to_string()),
            Some(limit) => Some(limit.min(MAX_PAGE_LIMIT)),
            None => None,
        };

        Ok(PageWindow { page, limit })
    }
}

impl PageWindow {
    /// Rows to skip
    pub fn offset(&self) -> i64 {
        match self.limit {
            Some(limit) => (self.page - 1).saturating_mul(limit),
            None => 0,
        }
    }

    /// Number of pages for `total` rows
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }

        match self.limit {
            Some(limit) => (total + limit - 1) / limit,
            None => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_types() {
        assert!(is_allowed("report.pdf", Some("application/pdf")));
        assert!(is_allowed("photo.PNG", Some("image/png")));
        assert!(is_allowed("photo.jpg", Some("image/jpeg")));
        assert!(is_allowed("photo.jpeg", Some("image/jpeg; charset=binary")));
    }

    #[test]
    fn test_rejected_types() {
        assert!(!is_allowed("script.js", Some("application/javascript")));
        assert!(!is_allowed("photo.gif", Some("image/gif")));
        // extension and MIME must both match
        assert!(!is_allowed("report.pdf", Some("text/plain")));
        assert!(!is_allowed("notes.txt", Some("application/pdf")));
        assert!(!is_allowed("report.pdf", None));
        assert!(!is_allowed("pdf", Some("application/pdf")));
    }

    #[test]
    fn test_stored_file_name_shape() {
        let name = stored_file_name("Annual Report.pdf");
        let parts: Vec<&str> = name.splitn(3, '-').collect();

        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<i64>().is_ok());
        assert_eq!(parts[1].len(), 12);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[2], "Annual_Report.pdf");
    }

    #[test]
    fn test_stored_file_name_strips_paths() {
        let name = stored_file_name("../../etc/passwd.png");
        assert!(!name.contains('/'));
        assert!(!name.contains('\\'));

        let name = stored_file_name("");
        assert!(name.ends_with("-upload"));
    }

    #[test]
    fn test_stored_file_name_is_url_safe() {
        let name = stored_file_name("Result #3 (final).pdf");
        assert!(name.ends_with("-Result__3__final_.pdf"));
        assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
    }

    #[test]
    fn test_base_url_from_request() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "school.example:5000".parse().unwrap());
        assert_eq!(base_url(None, &headers), "http://school.example:5000");

        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(base_url(None, &headers), "https://school.example:5000");

        assert_eq!(
            base_url(Some("https://cdn.example/"), &headers),
            "https://cdn.example"
        );
        assert_eq!(
            file_url("https://cdn.example", "1-abc-a.pdf"),
            "https://cdn.example/files/1-abc-a.pdf"
        );
    }

    #[test]
    fn test_stored_file_names_unique() {
        let a = stored_file_name("a.png");
        let b = stored_file_name("a.png");
        assert_ne!(a, b);
    }

    #[test]
    fn test_path_of_rejects_traversal() {
        let store = UploadStore::new("/srv/files", 1024);

        assert_eq!(
            store.path_of("123-abc-a.png"),
            Some(PathBuf::from("/srv/files/123-abc-a.png"))
        );
        assert!(store.path_of("../secret").is_none());
        assert!(store.path_of("..").is_none());
        assert!(store.path_of("").is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        assert!(!store.remove("missing.pdf").await.unwrap());

        tokio::fs::write(dir.path().join("present.pdf"), b"%PDF").await.unwrap();
        assert!(store.remove("present.pdf").await.unwrap());
        assert!(!dir.path().join("present.pdf").exists());
    }

    #[tokio::test]
    async fn test_remove_all_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);
        tokio::fs::write(dir.path().join("kept.png"), b"1").await.unwrap();
        tokio::fs::write(dir.path().join("gone.png"), b"2").await.unwrap();

        store.remove_all(["missing.pdf", "gone.png", "../kept.png"]).await;

        assert!(!dir.path().join("gone.png").exists());
        assert!(dir.path().join("kept.png").exists());
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("a/b"), 1024);

        store.ensure_dir().await.unwrap();
        assert!(store.dir().is_dir());
    }

    #[tokio::test]
    async fn test_discard_removes_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.png");
        let second = dir.path().join("two.png");
        tokio::fs::write(&first, b"1").await.unwrap();
        tokio::fs::write(&second, b"2").await.unwrap();

        let mut written = WrittenFiles::new();
        written.push(first.clone());
        written.push(second.clone());
        assert_eq!(written.len(), 2);

        written.discard().await;
        assert!(!first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn test_parse_date() {
        let plain = parse_date("2025-01-10").unwrap();
        assert_eq!(plain.to_rfc3339(), "2025-01-10T00:00:00+00:00");

        let rfc = parse_date("2025-01-10T08:30:00+02:00").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2025-01-10T06:30:00+00:00");

        let local = parse_date("2025-01-10T08:30").unwrap();
        assert_eq!(local.to_rfc3339(), "2025-01-10T08:30:00+00:00");

        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("2025-13-40").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_page_query_defaults() {
        let window = PageQuery::default().resolve().unwrap();

        assert_eq!(window, PageWindow { page: 1, limit: None });
        assert_eq!(window.offset(), 0);
        assert_eq!(window.total_pages(42), 1);
        assert_eq!(window.total_pages(0), 0);
    }

    #[test]
    fn test_page_query_math() {
        let window = PageQuery {
            page: Some(3),
            limit: Some(10),
        }
        .resolve()
        .unwrap();

        assert_eq!(window.offset(), 20);
        assert_eq!(window.total_pages(21), 3);
        assert_eq!(window.total_pages(30), 3);
        assert_eq!(window.total_pages(31), 4);
    }

    #[test]
    fn test_page_query_rejects_and_clamps() {
        assert!(PageQuery { page: Some(0), limit: None }.resolve().is_err());
        assert!(PageQuery { page: Some(1), limit: Some(0) }.resolve().is_err());

        let window = PageQuery {
            page: None,
            limit: Some(5000),
        }
        .resolve()
        .unwrap();
        assert_eq!(window.limit, Some(MAX_PAGE_LIMIT));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(8), "8 bytes");
        assert_eq!(format_size(1500), "1500 bytes");
        assert_eq!(format_size(512 * 1024), "512 KB");
        assert_eq!(format_size(15 * 1024 * 1024), "15 MB");
        assert_eq!(format_size(1536 * 1024), "1536 KB");
    }

    #[test]
    fn test_page_without_limit() {
        assert!(PageQuery { page: Some(2), limit: None }.resolve().is_err());

        let window = PageQuery {
            page: Some(1),
            limit: None,
        }
        .resolve()
        .unwrap();
        assert_eq!(window.limit, None);

        assert!(PageQuery { page: Some(2), limit: Some(10) }.resolve().is_ok());
    }

    #[test]
    fn test_upload_error_messages() {
        assert_eq!(
            UploadError::UnsupportedType.to_string(),
            "Only JPEG, JPG, PNG, and PDF files are allowed"
        );
        assert_eq!(
            UploadError::TooLarge {
                limit: 10 * 1024 * 1024
            }
            .to_string(),
            "File size exceeds the 10 MB limit"
        );
        assert_eq!(
            UploadError::TooLarge { limit: 8 }.to_string(),
            "File size exceeds the 8 bytes limit"
        );
        assert_eq!(
            UploadError::TooManyFiles { max: 5 }.to_string(),
            "Too many files uploaded (max: 5)"
        );
    }
}
