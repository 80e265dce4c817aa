// ==========================================
// Scolaris - Couche moteurs
// ==========================================
// Règles métier pures et sans état. Les moteurs ne touchent jamais
// aux repositories: l'appelant charge, le moteur calcule.
// ==========================================

pub mod alert;
pub mod rotation;

pub use alert::{AlertEngine, DashboardKpis, DocumentKpis, OperationalAlert, SemainierKpis};
pub use rotation::RotationEngine;
