/// Database models for Noticeboard
///
/// # Models
///
/// - `user`: Dashboard accounts
/// - `uploaded_file`: PDFs and images filed under a category
/// - `gallery`: Gallery albums and their files

pub mod gallery;
pub mod uploaded_file;
pub mod user;
