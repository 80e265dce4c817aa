// ==========================================
// Scolaris - Erreurs de la couche d'accès aux données
// ==========================================
// thiserror; conversion des erreurs rusqlite vers une taxonomie
// exploitable par la couche API (contrainte unique -> Conflict).
// ==========================================

use thiserror::Error;

/// Erreurs de la couche repository
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== Erreurs de données =====
    #[error("enregistrement introuvable: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("violation de contrainte unique: {0}")]
    UniqueConstraintViolation(String),

    #[error("violation de clé étrangère: {0}")]
    ForeignKeyViolation(String),

    // ===== Erreurs techniques =====
    #[error("connexion base de données: {0}")]
    DatabaseConnectionError(String),

    #[error("verrou base de données: {0}")]
    LockError(String),

    #[error("requête base de données: {0}")]
    DatabaseQueryError(String),

    // ===== Qualité de données =====
    #[error("ligne corrompue (colonne {column}): {message}")]
    CorruptRow { column: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Alias de résultat
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_mapping() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: weekly_duty_assignment".to_string()),
        );
        match RepositoryError::from(err) {
            RepositoryError::UniqueConstraintViolation(msg) => {
                assert!(msg.contains("weekly_duty_assignment"))
            }
            other => panic!("variante inattendue: {:?}", other),
        }
    }
}
