// ==========================================
// Scolaris - Couche notification
// ==========================================
// Diffusion au mieux des événements de workflow: jamais bloquante,
// jamais propagée en erreur vers l'opération déclenchante.
// ==========================================

pub mod dispatcher;
pub mod provider;

pub use dispatcher::{NotificationDispatcher, WorkflowEvent};
pub use provider::{DeliveryError, DeliveryProvider, LogOnlyProvider};
