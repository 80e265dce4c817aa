// ==========================================
// Scolaris - Repositories du cycle documentaire
// ==========================================
// Document, versions, revues, commentaires. Les transitions d'état
// sont des UPDATE gardés par le statut courant: le nombre de lignes
// affectées dit si la transition a eu lieu, ce qui rend le
// lire-vérifier-écrire atomique face aux appels concurrents.
// ==========================================

use crate::domain::document::{
    DocumentComment, DocumentReview, DocumentStatus, DocumentVersion, PedagogicalDocument,
};
use crate::domain::teacher::SchoolScope;
use crate::domain::types::{DocumentType, ReviewDecision, Role};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{fmt_date, fmt_dt, parse_date, parse_dt, parse_enum};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// DocumentRepository
// ==========================================
pub struct DocumentRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_DOCUMENT: &str = r#"SELECT document_id, org_id, academic_year, school_level,
       teacher_id, class_id, subject_id, document_type, status,
       title, description, content, week_start_date, week_end_date,
       submitted_at, validated_by, validated_at, rejection_reason,
       acknowledged_by, acknowledged_at, created_at, updated_at
  FROM pedagogical_document"#;

impl DocumentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, doc: &PedagogicalDocument) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO pedagogical_document (
                document_id, org_id, academic_year, school_level,
                teacher_id, class_id, subject_id, document_type, status,
                title, description, content, week_start_date, week_end_date,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &doc.document_id,
                &doc.scope.org_id,
                &doc.scope.academic_year,
                &doc.scope.school_level,
                &doc.teacher_id,
                &doc.class_id,
                &doc.subject_id,
                doc.document_type.as_str(),
                doc.status.code(),
                &doc.title,
                &doc.description,
                &doc.content,
                doc.week_start_date.map(|d| fmt_date(&d)),
                doc.week_end_date.map(|d| fmt_date(&d)),
                fmt_dt(&doc.created_at),
                fmt_dt(&doc.updated_at),
            ],
        )?;

        Ok(doc.document_id.clone())
    }

    pub fn find_by_id(&self, document_id: &str) -> RepositoryResult<Option<PedagogicalDocument>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE document_id = ?", SELECT_DOCUMENT),
            params![document_id],
            map_document_row,
        ) {
            Ok(doc) => Ok(Some(doc)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Réécrit les champs éditables d'un brouillon.
    ///
    /// Retourne false si le document n'était plus en DRAFT au moment
    /// de l'écriture (course avec une soumission concurrente).
    pub fn update_draft(&self, doc: &PedagogicalDocument) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE pedagogical_document
               SET title = ?, description = ?, content = ?,
                   class_id = ?, subject_id = ?,
                   week_start_date = ?, week_end_date = ?, updated_at = ?
               WHERE document_id = ? AND status = 'DRAFT'"#,
            params![
                &doc.title,
                &doc.description,
                &doc.content,
                &doc.class_id,
                &doc.subject_id,
                doc.week_start_date.map(|d| fmt_date(&d)),
                doc.week_end_date.map(|d| fmt_date(&d)),
                fmt_dt(&doc.updated_at),
                &doc.document_id,
            ],
        )?;

        Ok(affected > 0)
    }

    /// Supprime un brouillon. false si le statut n'est plus DRAFT.
    pub fn delete_draft(&self, document_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "DELETE FROM pedagogical_document WHERE document_id = ? AND status = 'DRAFT'",
            params![document_id],
        )?;

        Ok(affected > 0)
    }

    /// DRAFT -> SUBMITTED. false si le statut courant n'est pas DRAFT.
    pub fn mark_submitted(
        &self,
        document_id: &str,
        submitted_at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE pedagogical_document
               SET status = 'SUBMITTED', submitted_at = ?, updated_at = ?
               WHERE document_id = ? AND status = 'DRAFT'"#,
            params![fmt_dt(&submitted_at), fmt_dt(&submitted_at), document_id],
        )?;

        Ok(affected > 0)
    }

    /// SUBMITTED -> APPROVED. false si le statut courant n'est pas SUBMITTED.
    pub fn mark_approved(
        &self,
        document_id: &str,
        validated_by: &str,
        validated_at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE pedagogical_document
               SET status = 'APPROVED', validated_by = ?, validated_at = ?, updated_at = ?
               WHERE document_id = ? AND status = 'SUBMITTED'"#,
            params![validated_by, fmt_dt(&validated_at), fmt_dt(&validated_at), document_id],
        )?;

        Ok(affected > 0)
    }

    /// SUBMITTED -> REJECTED (motif obligatoire vérifié en amont).
    pub fn mark_rejected(
        &self,
        document_id: &str,
        validated_by: &str,
        validated_at: NaiveDateTime,
        reason: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE pedagogical_document
               SET status = 'REJECTED', validated_by = ?, validated_at = ?,
                   rejection_reason = ?, updated_at = ?
               WHERE document_id = ? AND status = 'SUBMITTED'"#,
            params![
                validated_by,
                fmt_dt(&validated_at),
                reason,
                fmt_dt(&validated_at),
                document_id
            ],
        )?;

        Ok(affected > 0)
    }

    /// SUBMITTED -> ACKNOWLEDGED (visa du cahier de textes).
    pub fn mark_acknowledged(
        &self,
        document_id: &str,
        acknowledged_by: &str,
        acknowledged_at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE pedagogical_document
               SET status = 'ACKNOWLEDGED', acknowledged_by = ?, acknowledged_at = ?,
                   updated_at = ?
               WHERE document_id = ? AND status = 'SUBMITTED'"#,
            params![
                acknowledged_by,
                fmt_dt(&acknowledged_at),
                fmt_dt(&acknowledged_at),
                document_id
            ],
        )?;

        Ok(affected > 0)
    }

    /// Documents d'un enseignant dans une portée, plus récents d'abord.
    pub fn list_for_teacher(
        &self,
        scope: &SchoolScope,
        teacher_id: &str,
    ) -> RepositoryResult<Vec<PedagogicalDocument>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{} WHERE org_id = ? AND academic_year = ? AND school_level = ?
                 AND teacher_id = ?
               ORDER BY created_at DESC"#,
            SELECT_DOCUMENT
        ))?;

        let docs = stmt
            .query_map(
                params![&scope.org_id, &scope.academic_year, &scope.school_level, teacher_id],
                map_document_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(docs)
    }

    /// Documents en attente de décision dans une portée (vue directeur),
    /// plus anciens soumis d'abord.
    pub fn list_submitted(&self, scope: &SchoolScope) -> RepositoryResult<Vec<PedagogicalDocument>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{} WHERE org_id = ? AND academic_year = ? AND school_level = ?
                 AND status = 'SUBMITTED'
               ORDER BY submitted_at ASC"#,
            SELECT_DOCUMENT
        ))?;

        let docs = stmt
            .query_map(
                params![&scope.org_id, &scope.academic_year, &scope.school_level],
                map_document_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(docs)
    }

    /// Tous les documents d'un établissement (année optionnelle),
    /// pour l'agrégation KPI/alertes.
    pub fn list_for_tenant(
        &self,
        org_id: &str,
        academic_year: Option<&str>,
    ) -> RepositoryResult<Vec<PedagogicalDocument>> {
        let conn = self.get_conn()?;

        let docs = match academic_year {
            Some(year) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE org_id = ? AND academic_year = ? ORDER BY created_at ASC",
                    SELECT_DOCUMENT
                ))?;
                let rows = stmt
                    .query_map(params![org_id, year], map_document_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE org_id = ? ORDER BY created_at ASC",
                    SELECT_DOCUMENT
                ))?;
                let rows = stmt
                    .query_map(params![org_id], map_document_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(docs)
    }

    /// Comptes par statut dans une portée.
    pub fn count_by_status(&self, scope: &SchoolScope) -> RepositoryResult<Vec<(String, i64)>> {
        self.count_grouped(scope, "status")
    }

    /// Comptes par type dans une portée.
    pub fn count_by_type(&self, scope: &SchoolScope) -> RepositoryResult<Vec<(String, i64)>> {
        self.count_grouped(scope, "document_type")
    }

    fn count_grouped(
        &self,
        scope: &SchoolScope,
        column: &str,
    ) -> RepositoryResult<Vec<(String, i64)>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {col}, COUNT(*) FROM pedagogical_document
               WHERE org_id = ? AND academic_year = ? AND school_level = ?
               GROUP BY {col}"#,
            col = column
        ))?;

        let counts = stmt
            .query_map(
                params![&scope.org_id, &scope.academic_year, &scope.school_level],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}

/// Reconstruit l'union de statut depuis la colonne status et les
/// colonnes annexes. Une colonne annexe manquante pour le statut lu
/// signale une ligne corrompue.
fn map_document_row(row: &rusqlite::Row) -> rusqlite::Result<PedagogicalDocument> {
    let status_code: String = row.get(8)?;

    let opt_dt = |idx: usize, v: Option<String>| -> rusqlite::Result<Option<NaiveDateTime>> {
        v.map(|s| parse_dt(idx, &s)).transpose()
    };

    let submitted_at = opt_dt(14, row.get(14)?)?;
    let validated_by: Option<String> = row.get(15)?;
    let validated_at = opt_dt(16, row.get(16)?)?;
    let rejection_reason: Option<String> = row.get(17)?;
    let acknowledged_by: Option<String> = row.get(18)?;
    let acknowledged_at = opt_dt(19, row.get(19)?)?;

    let corrupt = |idx: usize, what: &str| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Null,
            Box::<dyn std::error::Error + Send + Sync>::from(format!(
                "colonne {} absente pour le statut {}",
                what, status_code
            )),
        )
    };

    let status = match status_code.as_str() {
        "DRAFT" => DocumentStatus::Draft,
        "SUBMITTED" => DocumentStatus::Submitted {
            submitted_at: submitted_at.ok_or_else(|| corrupt(14, "submitted_at"))?,
        },
        "APPROVED" => DocumentStatus::Approved {
            validated_by: validated_by.ok_or_else(|| corrupt(15, "validated_by"))?,
            validated_at: validated_at.ok_or_else(|| corrupt(16, "validated_at"))?,
        },
        "REJECTED" => DocumentStatus::Rejected {
            validated_by: validated_by.ok_or_else(|| corrupt(15, "validated_by"))?,
            validated_at: validated_at.ok_or_else(|| corrupt(16, "validated_at"))?,
            reason: rejection_reason.ok_or_else(|| corrupt(17, "rejection_reason"))?,
        },
        "ACKNOWLEDGED" => DocumentStatus::Acknowledged {
            acknowledged_by: acknowledged_by.ok_or_else(|| corrupt(18, "acknowledged_by"))?,
            acknowledged_at: acknowledged_at.ok_or_else(|| corrupt(19, "acknowledged_at"))?,
        },
        _ => return Err(corrupt(8, "status")),
    };

    Ok(PedagogicalDocument {
        document_id: row.get(0)?,
        scope: SchoolScope {
            org_id: row.get(1)?,
            academic_year: row.get(2)?,
            school_level: row.get(3)?,
        },
        teacher_id: row.get(4)?,
        class_id: row.get(5)?,
        subject_id: row.get(6)?,
        document_type: parse_enum::<DocumentType>(7, &row.get::<_, String>(7)?)?,
        status,
        title: row.get(9)?,
        description: row.get(10)?,
        content: row.get(11)?,
        week_start_date: row
            .get::<_, Option<String>>(12)?
            .map(|s| parse_date(12, &s))
            .transpose()?,
        week_end_date: row
            .get::<_, Option<String>>(13)?
            .map(|s| parse_date(13, &s))
            .transpose()?,
        created_at: parse_dt(20, &row.get::<_, String>(20)?)?,
        updated_at: parse_dt(21, &row.get::<_, String>(21)?)?,
    })
}

// ==========================================
// DocumentVersionRepository
// ==========================================
// Append-only: pas d'UPDATE ni de DELETE.
pub struct DocumentVersionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentVersionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, version: &DocumentVersion) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO document_version (
                version_id, document_id, version_number, content, changes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &version.version_id,
                &version.document_id,
                version.version_number,
                &version.content,
                &version.changes,
                fmt_dt(&version.created_at),
            ],
        )?;

        Ok(())
    }

    pub fn count_for_document(&self, document_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM document_version WHERE document_id = ?",
            params![document_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// Versions d'un document, numéro croissant.
    pub fn list_for_document(&self, document_id: &str) -> RepositoryResult<Vec<DocumentVersion>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT version_id, document_id, version_number, content, changes, created_at
               FROM document_version
               WHERE document_id = ?
               ORDER BY version_number ASC"#,
        )?;

        let versions = stmt
            .query_map(params![document_id], |row| {
                Ok(DocumentVersion {
                    version_id: row.get(0)?,
                    document_id: row.get(1)?,
                    version_number: row.get(2)?,
                    content: row.get(3)?,
                    changes: row.get(4)?,
                    created_at: parse_dt(5, &row.get::<_, String>(5)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(versions)
    }
}

// ==========================================
// DocumentReviewRepository
// ==========================================
pub struct DocumentReviewRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentReviewRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, review: &DocumentReview) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO document_review (
                review_id, document_id, reviewer_id, decision,
                comments, section_comments, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &review.review_id,
                &review.document_id,
                &review.reviewer_id,
                review.decision.as_str(),
                &review.comments,
                review.section_comments.as_ref().map(|v| v.to_string()),
                fmt_dt(&review.created_at),
            ],
        )?;

        Ok(())
    }

    pub fn list_for_document(&self, document_id: &str) -> RepositoryResult<Vec<DocumentReview>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT review_id, document_id, reviewer_id, decision,
                      comments, section_comments, created_at
               FROM document_review
               WHERE document_id = ?
               ORDER BY created_at ASC"#,
        )?;

        let reviews = stmt
            .query_map(params![document_id], |row| {
                let section_comments = row
                    .get::<_, Option<String>>(5)?
                    .map(|s| {
                        serde_json::from_str(&s).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                5,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })
                    })
                    .transpose()?;

                Ok(DocumentReview {
                    review_id: row.get(0)?,
                    document_id: row.get(1)?,
                    reviewer_id: row.get(2)?,
                    decision: parse_enum::<ReviewDecision>(3, &row.get::<_, String>(3)?)?,
                    comments: row.get(4)?,
                    section_comments,
                    created_at: parse_dt(6, &row.get::<_, String>(6)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reviews)
    }
}

// ==========================================
// DocumentCommentRepository
// ==========================================
pub struct DocumentCommentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentCommentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, comment: &DocumentComment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO document_comment (
                comment_id, document_id, author_id, author_role,
                section, content, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &comment.comment_id,
                &comment.document_id,
                &comment.author_id,
                comment.author_role.as_str(),
                &comment.section,
                &comment.content,
                fmt_dt(&comment.created_at),
            ],
        )?;

        Ok(())
    }

    pub fn list_for_document(&self, document_id: &str) -> RepositoryResult<Vec<DocumentComment>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT comment_id, document_id, author_id, author_role,
                      section, content, created_at
               FROM document_comment
               WHERE document_id = ?
               ORDER BY created_at ASC"#,
        )?;

        let comments = stmt
            .query_map(params![document_id], |row| {
                Ok(DocumentComment {
                    comment_id: row.get(0)?,
                    document_id: row.get(1)?,
                    author_id: row.get(2)?,
                    author_role: parse_enum::<Role>(3, &row.get::<_, String>(3)?)?,
                    section: row.get(4)?,
                    content: row.get(5)?,
                    created_at: parse_dt(6, &row.get::<_, String>(6)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }
}
