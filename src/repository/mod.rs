// ==========================================
// Scolaris - Couche repository
// ==========================================
// Accès aux données rusqlite, un repository par agrégat.
// Aucune règle métier ici: les transitions gardées (UPDATE ... WHERE
// status = ?) sont le seul mécanisme de concurrence exposé.
// ==========================================

pub mod document_repo;
pub mod duty_repo;
pub mod error;
pub mod notification_repo;
pub mod teacher_repo;

pub use document_repo::{
    DocumentCommentRepository, DocumentRepository, DocumentReviewRepository,
    DocumentVersionRepository,
};
pub use duty_repo::{AssignmentRepository, SemainierRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use notification_repo::NotificationRepository;
pub use teacher_repo::TeacherDirectoryRepository;

use chrono::{NaiveDate, NaiveDateTime};

/// Format texte des horodatages en base.
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
/// Format texte des dates en base.
pub(crate) const DATE_FMT: &str = "%Y-%m-%d";

pub(crate) fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

pub(crate) fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

pub(crate) fn parse_dt(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse une énumération du domaine lue en base vers son type Rust.
pub(crate) fn parse_enum<T>(idx: usize, s: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
