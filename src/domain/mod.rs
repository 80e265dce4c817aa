// ==========================================
// Scolaris - Couche domaine
// ==========================================
// Entités et types métier. Pas d'accès aux données,
// pas de logique de dispatch ni d'agrégation ici.
// ==========================================

pub mod document;
pub mod duty;
pub mod notification;
pub mod teacher;
pub mod types;

// Réexport des types centraux
pub use document::{
    DocumentComment, DocumentReview, DocumentStatus, DocumentVersion, PedagogicalDocument,
};
pub use duty::{
    SemainierDailyEntry, SemainierIncident, SemainierStatus, WeeklyDutyAssignment, WeeklySemainier,
};
pub use notification::{DeliveryChannel, DocumentNotification, NotificationEventKind};
pub use teacher::{SchoolScope, TeacherRecord, TeacherStatus};
pub use types::{
    AlertCategory, AlertSeverity, AssignmentMode, DocumentType, IncidentSeverity, ReviewDecision,
    Role,
};
