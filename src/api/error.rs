// ==========================================
// Scolaris - Erreurs de la couche API
// ==========================================
// Taxonomie métier exposée à la couche transport:
// - NotFound: l'entité n'existe pas dans la portée donnée
// - Validation: la donnée fournie viole un invariant
// - InvalidState: le statut courant interdit l'opération
// - Forbidden: l'appelant n'a pas la relation requise
// - Conflict: invariant d'unicité ou course concurrente
// Les échecs de livraison de notification ne passent jamais par ici.
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ===== Erreurs client =====
    #[error("introuvable: {0}")]
    NotFound(String),

    #[error("donnée invalide: {0}")]
    Validation(String),

    #[error("opération {action} impossible: {entity} au statut {current}")]
    InvalidState {
        entity: String,
        current: String,
        action: String,
    },

    #[error("accès refusé: {0}")]
    Forbidden(String),

    #[error("conflit: {0}")]
    Conflict(String),

    // ===== Erreurs d'infrastructure =====
    #[error("erreur base de données: {0}")]
    Database(String),

    #[error("erreur interne: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            // Les violations d'unicité remontent en Conflict: l'appelant
            // peut réessayer avec une entrée ajustée.
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::Conflict(msg),
            RepositoryError::ForeignKeyViolation(msg) => ApiError::Conflict(msg),
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::Database(msg),
            RepositoryError::LockError(msg) => {
                ApiError::Database(format!("verrou base de données: {}", msg))
            }
            RepositoryError::CorruptRow { column, message } => {
                ApiError::Internal(format!("ligne corrompue ({}): {}", column, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Alias de résultat
pub type ApiResult<T> = Result<T, ApiError>;
