// ==========================================
// Scolaris - API du cycle de vie documentaire
// ==========================================
// Machine à états:
//   DRAFT --submit--> SUBMITTED
//   SUBMITTED --approve--> APPROVED
//   SUBMITTED --reject(motif)--> REJECTED
//   SUBMITTED --acknowledge [CAHIER_TEXTE]--> ACKNOWLEDGED
// Aucune transition ne quitte un statut terminal. Un document rejeté
// se corrige par un NOUVEAU document, jamais par réouverture.
//
// Les transitions s'appuient sur les UPDATE gardés des dépôts: un
// retour false signifie qu'un autre appelant a gagné la course, et
// remonte en InvalidState. La notification est diffusée APRÈS la
// mutation et n'affecte jamais le résultat de l'opération.
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::document::{
    DocumentComment, DocumentReview, DocumentStatus, DocumentVersion, PedagogicalDocument,
};
use crate::domain::teacher::SchoolScope;
use crate::domain::types::{DocumentType, ReviewDecision, Role};
use crate::notify::{NotificationDispatcher, WorkflowEvent};
use crate::domain::notification::NotificationEventKind;
use crate::repository::document_repo::{
    DocumentCommentRepository, DocumentRepository, DocumentReviewRepository,
    DocumentVersionRepository,
};
use crate::repository::teacher_repo::TeacherDirectoryRepository;

// ==========================================
// Requêtes
// ==========================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRequest {
    pub document_type: DocumentType,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub class_id: Option<String>,
    pub subject_id: Option<String>,
    pub week_start_date: Option<chrono::NaiveDate>,
    pub week_end_date: Option<chrono::NaiveDate>,
}

/// Patch partiel: seuls les champs présents sont modifiés.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub class_id: Option<String>,
    pub subject_id: Option<String>,
    pub week_start_date: Option<chrono::NaiveDate>,
    pub week_end_date: Option<chrono::NaiveDate>,
    /// Annotation libre de l'instantané créé si le contenu change.
    pub changes: Option<String>,
}

/// Statistiques documentaires d'une portée.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub total: i64,
    pub by_status: Vec<(String, i64)>,
    pub by_type: Vec<(String, i64)>,
    /// Documents sortis du brouillon / total.
    pub submission_rate: f64,
    /// Approuvés / documents sortis du brouillon.
    pub approval_rate: f64,
    /// Rejetés / documents sortis du brouillon.
    pub rejection_rate: f64,
}

// ==========================================
// DocumentApi
// ==========================================
pub struct DocumentApi {
    document_repo: Arc<DocumentRepository>,
    version_repo: Arc<DocumentVersionRepository>,
    review_repo: Arc<DocumentReviewRepository>,
    comment_repo: Arc<DocumentCommentRepository>,
    directory_repo: Arc<TeacherDirectoryRepository>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl DocumentApi {
    pub fn new(
        document_repo: Arc<DocumentRepository>,
        version_repo: Arc<DocumentVersionRepository>,
        review_repo: Arc<DocumentReviewRepository>,
        comment_repo: Arc<DocumentCommentRepository>,
        directory_repo: Arc<TeacherDirectoryRepository>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            document_repo,
            version_repo,
            review_repo,
            comment_repo,
            directory_repo,
            dispatcher,
        }
    }

    // ==========================================
    // Création et mutation (enseignant, brouillon)
    // ==========================================

    pub fn create(
        &self,
        scope: &SchoolScope,
        teacher_id: &str,
        request: CreateDocumentRequest,
    ) -> ApiResult<PedagogicalDocument> {
        if request.title.trim().is_empty() {
            return Err(ApiError::Validation("le titre est obligatoire".to_string()));
        }

        // L'enseignant doit exister dans la portée (établissement,
        // année, niveau) du document.
        self.directory_repo
            .find_in_scope(scope, teacher_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "enseignant {} introuvable dans la portée {}",
                    teacher_id, scope
                ))
            })?;

        let now = Utc::now().naive_utc();
        let doc = PedagogicalDocument {
            document_id: Uuid::new_v4().to_string(),
            scope: scope.clone(),
            teacher_id: teacher_id.to_string(),
            class_id: request.class_id,
            subject_id: request.subject_id,
            document_type: request.document_type,
            status: DocumentStatus::Draft,
            title: request.title.trim().to_string(),
            description: request.description,
            content: request.content,
            week_start_date: request.week_start_date,
            week_end_date: request.week_end_date,
            created_at: now,
            updated_at: now,
        };

        self.document_repo.insert(&doc)?;
        info!(
            document_id = %doc.document_id,
            document_type = doc.document_type.as_str(),
            teacher_id,
            "document créé en brouillon"
        );

        Ok(doc)
    }

    /// Applique un patch à un brouillon. Si le contenu change, le
    /// contenu AVANT modification est figé dans une nouvelle version.
    pub fn update(
        &self,
        document_id: &str,
        teacher_id: &str,
        request: UpdateDocumentRequest,
    ) -> ApiResult<PedagogicalDocument> {
        let mut doc = self.load(document_id)?;
        self.require_owner(&doc, teacher_id)?;

        if !doc.is_editable() {
            return Err(invalid_state(&doc, "update"));
        }

        // Le patch entier est validé avant la moindre écriture: un
        // patch refusé ne laisse ni version ni mutation partielle.
        if let Some(title) = &request.title {
            if title.trim().is_empty() {
                return Err(ApiError::Validation("le titre est obligatoire".to_string()));
            }
        }

        let content_changes = matches!(&request.content, Some(c) if *c != doc.content);
        if content_changes {
            self.snapshot(
                &doc,
                request
                    .changes
                    .clone()
                    .unwrap_or_else(|| "mise à jour du contenu".to_string()),
            )?;
        }

        if let Some(title) = request.title {
            doc.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            doc.description = Some(description);
        }
        if let Some(content) = request.content {
            doc.content = content;
        }
        if let Some(class_id) = request.class_id {
            doc.class_id = Some(class_id);
        }
        if let Some(subject_id) = request.subject_id {
            doc.subject_id = Some(subject_id);
        }
        if let Some(week_start) = request.week_start_date {
            doc.week_start_date = Some(week_start);
        }
        if let Some(week_end) = request.week_end_date {
            doc.week_end_date = Some(week_end);
        }
        doc.updated_at = Utc::now().naive_utc();

        if !self.document_repo.update_draft(&doc)? {
            // Course perdue: le document a quitté DRAFT entre la
            // lecture et l'écriture.
            let current = self.load(document_id)?;
            return Err(invalid_state(&current, "update"));
        }

        Ok(doc)
    }

    pub fn delete(&self, document_id: &str, teacher_id: &str) -> ApiResult<()> {
        let doc = self.load(document_id)?;
        self.require_owner(&doc, teacher_id)?;

        if !doc.is_editable() {
            return Err(invalid_state(&doc, "delete"));
        }

        if !self.document_repo.delete_draft(document_id)? {
            let current = self.load(document_id)?;
            return Err(invalid_state(&current, "delete"));
        }

        info!(document_id, "brouillon supprimé");
        Ok(())
    }

    // ==========================================
    // Transitions de workflow
    // ==========================================

    /// DRAFT -> SUBMITTED; fige le contenu soumis puis notifie la
    /// direction de l'établissement.
    pub async fn submit(&self, document_id: &str, teacher_id: &str) -> ApiResult<PedagogicalDocument> {
        let doc = self.load(document_id)?;
        self.require_owner(&doc, teacher_id)?;

        if !doc.status.is_draft() {
            return Err(invalid_state(&doc, "submit"));
        }

        let submitted_at = Utc::now().naive_utc();
        if !self.document_repo.mark_submitted(document_id, submitted_at)? {
            let current = self.load(document_id)?;
            return Err(invalid_state(&current, "submit"));
        }

        // Instantané après la transition gardée: une soumission qui
        // perd la course ne laisse aucune version orpheline, et le
        // contenu figé est identique (immuable hors DRAFT).
        self.snapshot(&doc, "soumission".to_string())?;

        let mut doc = doc;
        doc.status = DocumentStatus::Submitted { submitted_at };
        doc.updated_at = submitted_at;
        info!(document_id, teacher_id, "document soumis pour validation");

        self.dispatcher
            .dispatch(WorkflowEvent::for_document(
                NotificationEventKind::DocumentSubmitted,
                &doc,
            ))
            .await;

        Ok(doc)
    }

    /// SUBMITTED -> APPROVED, avec revue de décision et notification
    /// du propriétaire.
    pub async fn approve(
        &self,
        document_id: &str,
        reviewer_id: &str,
        comments: Option<String>,
        section_comments: Option<serde_json::Value>,
    ) -> ApiResult<PedagogicalDocument> {
        let doc = self.load(document_id)?;
        self.require_reviewer(reviewer_id)?;

        if !doc.status.is_submitted() {
            return Err(invalid_state(&doc, "approve"));
        }

        let validated_at = Utc::now().naive_utc();
        if !self
            .document_repo
            .mark_approved(document_id, reviewer_id, validated_at)?
        {
            let current = self.load(document_id)?;
            return Err(invalid_state(&current, "approve"));
        }

        self.append_review(
            document_id,
            reviewer_id,
            ReviewDecision::Approved,
            comments,
            section_comments,
            validated_at,
        )?;

        let mut doc = doc;
        doc.status = DocumentStatus::Approved {
            validated_by: reviewer_id.to_string(),
            validated_at,
        };
        doc.updated_at = validated_at;
        info!(document_id, reviewer_id, "document approuvé");

        self.dispatcher
            .dispatch(WorkflowEvent::for_document(
                NotificationEventKind::DocumentApproved,
                &doc,
            ))
            .await;

        Ok(doc)
    }

    /// SUBMITTED -> REJECTED. Le motif est obligatoire et vérifié
    /// avant toute écriture.
    pub async fn reject(
        &self,
        document_id: &str,
        reviewer_id: &str,
        reason: &str,
        comments: Option<String>,
        section_comments: Option<serde_json::Value>,
    ) -> ApiResult<PedagogicalDocument> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::Validation(
                "le motif de rejet est obligatoire".to_string(),
            ));
        }

        let doc = self.load(document_id)?;
        self.require_reviewer(reviewer_id)?;

        if !doc.status.is_submitted() {
            return Err(invalid_state(&doc, "reject"));
        }

        let validated_at = Utc::now().naive_utc();
        if !self
            .document_repo
            .mark_rejected(document_id, reviewer_id, validated_at, reason)?
        {
            let current = self.load(document_id)?;
            return Err(invalid_state(&current, "reject"));
        }

        self.append_review(
            document_id,
            reviewer_id,
            ReviewDecision::Rejected,
            comments,
            section_comments,
            validated_at,
        )?;

        let mut doc = doc;
        doc.status = DocumentStatus::Rejected {
            validated_by: reviewer_id.to_string(),
            validated_at,
            reason: reason.to_string(),
        };
        doc.updated_at = validated_at;
        info!(document_id, reviewer_id, "document rejeté");

        self.dispatcher
            .dispatch(WorkflowEvent::for_document(
                NotificationEventKind::DocumentRejected,
                &doc,
            ))
            .await;

        Ok(doc)
    }

    /// SUBMITTED -> ACKNOWLEDGED. Réservé au cahier de textes: le visa
    /// atteste la prise de connaissance sans jugement de conformité.
    pub async fn acknowledge(
        &self,
        document_id: &str,
        reviewer_id: &str,
        comments: Option<String>,
    ) -> ApiResult<PedagogicalDocument> {
        let doc = self.load(document_id)?;
        self.require_reviewer(reviewer_id)?;

        if !doc.document_type.supports_acknowledgment() {
            return Err(ApiError::Validation(format!(
                "le visa ne s'applique pas au type {}",
                doc.document_type.as_str()
            )));
        }
        if !doc.status.is_submitted() {
            return Err(invalid_state(&doc, "acknowledge"));
        }

        let acknowledged_at = Utc::now().naive_utc();
        if !self
            .document_repo
            .mark_acknowledged(document_id, reviewer_id, acknowledged_at)?
        {
            let current = self.load(document_id)?;
            return Err(invalid_state(&current, "acknowledge"));
        }

        if let Some(text) = comments.filter(|c| !c.trim().is_empty()) {
            let comment = DocumentComment {
                comment_id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                author_id: reviewer_id.to_string(),
                author_role: Role::Director,
                section: None,
                content: text,
                created_at: acknowledged_at,
            };
            self.comment_repo.insert(&comment)?;
        }

        let mut doc = doc;
        doc.status = DocumentStatus::Acknowledged {
            acknowledged_by: reviewer_id.to_string(),
            acknowledged_at,
        };
        doc.updated_at = acknowledged_at;
        info!(document_id, reviewer_id, "cahier de textes visé");

        self.dispatcher
            .dispatch(WorkflowEvent::for_document(
                NotificationEventKind::DocumentAcknowledged,
                &doc,
            ))
            .await;

        Ok(doc)
    }

    // ==========================================
    // Commentaires et lectures
    // ==========================================

    /// Ajoute un commentaire, quel que soit le statut du document. Un
    /// enseignant ne peut commenter que ses propres documents.
    pub async fn add_comment(
        &self,
        document_id: &str,
        author_id: &str,
        author_role: Role,
        content: &str,
        section: Option<String>,
    ) -> ApiResult<DocumentComment> {
        if content.trim().is_empty() {
            return Err(ApiError::Validation(
                "le commentaire ne peut pas être vide".to_string(),
            ));
        }

        let doc = self.load(document_id)?;
        if author_role == Role::Teacher && doc.teacher_id != author_id {
            return Err(ApiError::Forbidden(format!(
                "l'enseignant {} ne peut pas commenter le document d'un autre enseignant",
                author_id
            )));
        }

        let comment = DocumentComment {
            comment_id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            author_id: author_id.to_string(),
            author_role,
            section,
            content: content.to_string(),
            created_at: Utc::now().naive_utc(),
        };
        self.comment_repo.insert(&comment)?;

        self.dispatcher
            .dispatch(
                WorkflowEvent::for_document(NotificationEventKind::CommentAdded, &doc)
                    .with_comment_author(author_role),
            )
            .await;

        Ok(comment)
    }

    pub fn get(&self, document_id: &str) -> ApiResult<PedagogicalDocument> {
        self.load(document_id)
    }

    pub fn get_comments(&self, document_id: &str) -> ApiResult<Vec<DocumentComment>> {
        self.load(document_id)?;
        Ok(self.comment_repo.list_for_document(document_id)?)
    }

    pub fn get_reviews(&self, document_id: &str) -> ApiResult<Vec<DocumentReview>> {
        self.load(document_id)?;
        Ok(self.review_repo.list_for_document(document_id)?)
    }

    pub fn get_versions(&self, document_id: &str) -> ApiResult<Vec<DocumentVersion>> {
        self.load(document_id)?;
        Ok(self.version_repo.list_for_document(document_id)?)
    }

    pub fn list_for_teacher(
        &self,
        scope: &SchoolScope,
        teacher_id: &str,
    ) -> ApiResult<Vec<PedagogicalDocument>> {
        Ok(self.document_repo.list_for_teacher(scope, teacher_id)?)
    }

    /// File de validation de la direction, plus anciens soumis d'abord.
    pub fn list_submitted(&self, scope: &SchoolScope) -> ApiResult<Vec<PedagogicalDocument>> {
        Ok(self.document_repo.list_submitted(scope)?)
    }

    /// Agrégats par type et statut, plus les taux dérivés. Les taux
    /// d'approbation/rejet sont rapportés aux documents sortis du
    /// brouillon, pas au total.
    pub fn get_stats(&self, scope: &SchoolScope) -> ApiResult<DocumentStats> {
        let by_status = self.document_repo.count_by_status(scope)?;
        let by_type = self.document_repo.count_by_type(scope)?;

        let total: i64 = by_status.iter().map(|(_, n)| n).sum();
        let count =
            |code: &str| by_status.iter().find(|(s, _)| s == code).map(|(_, n)| *n).unwrap_or(0);

        let submitted_total = total - count("DRAFT");
        let approved = count("APPROVED");
        let rejected = count("REJECTED");

        Ok(DocumentStats {
            total,
            by_status,
            by_type,
            submission_rate: rate(submitted_total, total),
            approval_rate: rate(approved, submitted_total),
            rejection_rate: rate(rejected, submitted_total),
        })
    }

    // ==========================================
    // Aides internes
    // ==========================================

    fn load(&self, document_id: &str) -> ApiResult<PedagogicalDocument> {
        self.document_repo
            .find_by_id(document_id)?
            .ok_or_else(|| ApiError::NotFound(format!("document {}", document_id)))
    }

    fn require_owner(&self, doc: &PedagogicalDocument, teacher_id: &str) -> ApiResult<()> {
        if doc.teacher_id != teacher_id {
            return Err(ApiError::Forbidden(format!(
                "le document {} n'appartient pas à l'enseignant {}",
                doc.document_id, teacher_id
            )));
        }
        Ok(())
    }

    fn require_reviewer(&self, reviewer_id: &str) -> ApiResult<()> {
        let record = self
            .directory_repo
            .find_by_id(reviewer_id)?
            .ok_or_else(|| ApiError::NotFound(format!("utilisateur {}", reviewer_id)))?;
        if !record.role.is_reviewer() {
            return Err(ApiError::Forbidden(format!(
                "l'utilisateur {} n'a pas de rôle de validation",
                reviewer_id
            )));
        }
        Ok(())
    }

    /// Fige le contenu ACTUEL du document dans une nouvelle version
    /// (numéro = nombre de versions existantes + 1).
    fn snapshot(&self, doc: &PedagogicalDocument, changes: String) -> ApiResult<()> {
        let next_number = self.version_repo.count_for_document(&doc.document_id)? as i32 + 1;
        let version = DocumentVersion {
            version_id: Uuid::new_v4().to_string(),
            document_id: doc.document_id.clone(),
            version_number: next_number,
            content: doc.content.clone(),
            changes: Some(changes),
            created_at: Utc::now().naive_utc(),
        };
        self.version_repo.insert(&version)?;
        Ok(())
    }

    fn append_review(
        &self,
        document_id: &str,
        reviewer_id: &str,
        decision: ReviewDecision,
        comments: Option<String>,
        section_comments: Option<serde_json::Value>,
        created_at: chrono::NaiveDateTime,
    ) -> ApiResult<()> {
        let review = DocumentReview {
            review_id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            reviewer_id: reviewer_id.to_string(),
            decision,
            comments,
            section_comments,
            created_at,
        };
        self.review_repo.insert(&review)?;
        Ok(())
    }
}

fn invalid_state(doc: &PedagogicalDocument, action: &str) -> ApiError {
    ApiError::InvalidState {
        entity: format!("document {}", doc.document_id),
        current: doc.status.code().to_string(),
        action: action.to_string(),
    }
}

fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
