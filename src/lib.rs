// ==========================================
// Scolaris - Bibliothèque cœur
// ==========================================
// Suivi pédagogique d'établissement: workflow documentaire,
// rotation des semainiers, notifications et indicateurs.
// Pile: Rust + SQLite
// ==========================================

// ==========================================
// Déclarations de modules
// ==========================================

// Couche domaine - entités et types
pub mod domain;

// Couche dépôts - accès aux données
pub mod repository;

// Couche moteurs - règles métier pures
pub mod engine;

// Couche notification - diffusion au meilleur effort
pub mod notify;

// Couche configuration - seuils d'alerte
pub mod config;

// Infrastructure base de données (connexion/PRAGMA/schéma)
pub mod db;

// Journalisation
pub mod logging;

// Couche API - opérations métier
pub mod api;

// ==========================================
// Réexports des types cœur
// ==========================================

pub use domain::types::{
    AlertCategory, AlertSeverity, AssignmentMode, DocumentType, IncidentSeverity, ReviewDecision,
    Role,
};

pub use domain::{
    DocumentComment, DocumentNotification, DocumentReview, DocumentStatus, DocumentVersion,
    PedagogicalDocument, SchoolScope, SemainierDailyEntry, SemainierIncident, SemainierStatus,
    TeacherRecord, WeeklyDutyAssignment, WeeklySemainier,
};

pub use api::{ApiError, ApiResult, Services};
pub use notify::{DeliveryProvider, NotificationDispatcher, WorkflowEvent};

/// Version du crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nom applicatif
pub const APP_NAME: &str = "Scolaris";
