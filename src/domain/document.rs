// ==========================================
// Scolaris - Modèles du cycle documentaire
// ==========================================
// Le statut est une union étiquetée: chaque état terminal porte
// exactement les champs qui n'ont de sens que pour lui (un REJETÉ
// sans motif est irreprésentable).
// ==========================================

use crate::domain::teacher::SchoolScope;
use crate::domain::types::{DocumentType, ReviewDecision, Role};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// DocumentStatus - machine à états documentaire
// ==========================================
// DRAFT -> SUBMITTED -> {APPROVED | REJECTED | ACKNOWLEDGED}
// Aucune transition ne quitte un état terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Submitted {
        submitted_at: NaiveDateTime,
    },
    Approved {
        validated_by: String,
        validated_at: NaiveDateTime,
    },
    Rejected {
        validated_by: String,
        validated_at: NaiveDateTime,
        reason: String,
    },
    Acknowledged {
        acknowledged_by: String,
        acknowledged_at: NaiveDateTime,
    },
}

impl DocumentStatus {
    /// Code persisté en base (colonne status).
    pub fn code(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Submitted { .. } => "SUBMITTED",
            DocumentStatus::Approved { .. } => "APPROVED",
            DocumentStatus::Rejected { .. } => "REJECTED",
            DocumentStatus::Acknowledged { .. } => "ACKNOWLEDGED",
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, DocumentStatus::Draft)
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, DocumentStatus::Submitted { .. })
    }

    /// APPROVED / REJECTED / ACKNOWLEDGED: plus aucune transition définie.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Approved { .. }
                | DocumentStatus::Rejected { .. }
                | DocumentStatus::Acknowledged { .. }
        )
    }
}

// ==========================================
// PedagogicalDocument - unité de travail pédagogique
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedagogicalDocument {
    pub document_id: String,
    pub scope: SchoolScope,
    pub teacher_id: String,
    pub class_id: Option<String>,
    pub subject_id: Option<String>,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub week_start_date: Option<NaiveDate>,
    pub week_end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PedagogicalDocument {
    /// Le contenu n'est mutable par l'enseignant qu'en brouillon.
    pub fn is_editable(&self) -> bool {
        self.status.is_draft()
    }
}

// ==========================================
// DocumentVersion - instantané immuable du contenu
// ==========================================
// Créé par le gestionnaire de cycle de vie uniquement,
// jamais modifié ni supprimé. version_number strictement croissant
// par document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub version_id: String,
    pub document_id: String,
    pub version_number: i32,
    pub content: String,
    pub changes: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// DocumentReview - une décision du directeur
// ==========================================
// Append-only, une revue par événement de décision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReview {
    pub review_id: String,
    pub document_id: String,
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    pub comments: Option<String>,
    /// Commentaires structurés par section (JSON libre).
    pub section_comments: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// DocumentComment - fil de commentaires
// ==========================================
// Append-only, autorisé quel que soit le statut du document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentComment {
    pub comment_id: String,
    pub document_id: String,
    pub author_id: String,
    pub author_role: Role,
    pub section: Option<String>,
    pub content: String,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_status_codes_and_terminality() {
        let now = Utc::now().naive_utc();
        assert_eq!(DocumentStatus::Draft.code(), "DRAFT");
        assert!(!DocumentStatus::Draft.is_terminal());

        let submitted = DocumentStatus::Submitted { submitted_at: now };
        assert_eq!(submitted.code(), "SUBMITTED");
        assert!(!submitted.is_terminal());

        let rejected = DocumentStatus::Rejected {
            validated_by: "dir-1".into(),
            validated_at: now,
            reason: "incomplet".into(),
        };
        assert_eq!(rejected.code(), "REJECTED");
        assert!(rejected.is_terminal());
    }
}
