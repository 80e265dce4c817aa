// ==========================================
// Scolaris - Dispatcher de notifications
// ==========================================
// Diffusion au mieux: une ligne persistée par destinataire, puis
// trois tentatives de canal indépendantes et attendues en parallèle.
// Toute défaillance est journalisée et absorbée ici; l'opération
// métier qui a déclenché l'événement n'échoue jamais à cause d'une
// notification.
// ==========================================

use crate::domain::document::{DocumentStatus, PedagogicalDocument};
use crate::domain::duty::WeeklySemainier;
use crate::domain::notification::{DeliveryChannel, DocumentNotification, NotificationEventKind};
use crate::domain::teacher::TeacherRecord;
use crate::domain::types::Role;
use crate::repository::error::RepositoryResult;
use crate::repository::notification_repo::NotificationRepository;
use crate::repository::teacher_repo::TeacherDirectoryRepository;
use crate::notify::provider::DeliveryProvider;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

// ==========================================
// WorkflowEvent - événement à diffuser
// ==========================================
#[derive(Debug, Clone)]
pub struct WorkflowEvent {
    pub kind: NotificationEventKind,
    /// Document ou semainier à l'origine de l'événement.
    pub subject_id: String,
    pub org_id: String,
    /// Enseignant propriétaire du document/cahier.
    pub owner_teacher_id: String,
    /// Rôle de l'auteur pour un événement de commentaire.
    pub comment_author_role: Option<Role>,
    pub title: String,
    pub message: String,
}

impl WorkflowEvent {
    /// Événement de workflow documentaire avec message standard.
    pub fn for_document(kind: NotificationEventKind, doc: &PedagogicalDocument) -> Self {
        let label = doc.document_type.label();
        let (title, message) = match (&kind, &doc.status) {
            (NotificationEventKind::DocumentSubmitted, _) => (
                "Document soumis".to_string(),
                format!("Le {} « {} » attend une décision de la direction.", label, doc.title),
            ),
            (NotificationEventKind::DocumentApproved, _) => (
                "Document approuvé".to_string(),
                format!("Votre {} « {} » a été approuvé.", label, doc.title),
            ),
            (NotificationEventKind::DocumentRejected, DocumentStatus::Rejected { reason, .. }) => (
                "Document rejeté".to_string(),
                format!("Votre {} « {} » a été rejeté. Motif: {}", label, doc.title, reason),
            ),
            (NotificationEventKind::DocumentRejected, _) => (
                "Document rejeté".to_string(),
                format!("Votre {} « {} » a été rejeté.", label, doc.title),
            ),
            (NotificationEventKind::DocumentAcknowledged, _) => (
                "Cahier de textes visé".to_string(),
                format!("Votre {} « {} » a été visé par la direction.", label, doc.title),
            ),
            (NotificationEventKind::CommentAdded, _) => (
                "Nouveau commentaire".to_string(),
                format!("Un commentaire a été ajouté sur le {} « {} ».", label, doc.title),
            ),
            (other, _) => (
                other.as_str().to_string(),
                format!("Événement sur le {} « {} ».", label, doc.title),
            ),
        };

        Self {
            kind,
            subject_id: doc.document_id.clone(),
            org_id: doc.scope.org_id.clone(),
            owner_teacher_id: doc.teacher_id.clone(),
            comment_author_role: None,
            title,
            message,
        }
    }

    /// Événement de workflow du semainier avec message standard.
    pub fn for_semainier(kind: NotificationEventKind, semainier: &WeeklySemainier) -> Self {
        let (title, message) = match kind {
            NotificationEventKind::SemainierSubmitted => (
                "Semainier soumis".to_string(),
                format!(
                    "Le cahier du semainier de la semaine du {} attend validation.",
                    semainier.week_start_date
                ),
            ),
            NotificationEventKind::SemainierValidated => (
                "Semainier validé".to_string(),
                format!(
                    "Votre cahier de la semaine du {} a été validé.",
                    semainier.week_start_date
                ),
            ),
            other => (
                other.as_str().to_string(),
                format!("Événement sur le semainier {}.", semainier.semainier_id),
            ),
        };

        Self {
            kind,
            subject_id: semainier.semainier_id.clone(),
            org_id: semainier.scope.org_id.clone(),
            owner_teacher_id: semainier.teacher_id.clone(),
            comment_author_role: None,
            title,
            message,
        }
    }

    pub fn with_comment_author(mut self, role: Role) -> Self {
        self.comment_author_role = Some(role);
        self
    }
}

// ==========================================
// NotificationDispatcher
// ==========================================
pub struct NotificationDispatcher {
    notification_repo: Arc<NotificationRepository>,
    directory_repo: Arc<TeacherDirectoryRepository>,
    email: Arc<dyn DeliveryProvider>,
    sms: Arc<dyn DeliveryProvider>,
    whatsapp: Arc<dyn DeliveryProvider>,
}

impl NotificationDispatcher {
    pub fn new(
        notification_repo: Arc<NotificationRepository>,
        directory_repo: Arc<TeacherDirectoryRepository>,
        email: Arc<dyn DeliveryProvider>,
        sms: Arc<dyn DeliveryProvider>,
        whatsapp: Arc<dyn DeliveryProvider>,
    ) -> Self {
        Self {
            notification_repo,
            directory_repo,
            email,
            sms,
            whatsapp,
        }
    }

    /// Diffuse un événement. Ne retourne jamais d'erreur: tout échec
    /// (résolution, persistance, livraison) est journalisé et absorbé.
    pub async fn dispatch(&self, event: WorkflowEvent) {
        let recipients = match self.resolve_recipients(&event) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    event = event.kind.as_str(),
                    subject_id = %event.subject_id,
                    "résolution des destinataires impossible: {}",
                    e
                );
                return;
            }
        };

        if recipients.is_empty() {
            warn!(
                event = event.kind.as_str(),
                subject_id = %event.subject_id,
                "aucun destinataire résolu, notification ignorée"
            );
            return;
        }

        let deliveries = recipients
            .into_iter()
            .map(|recipient| self.notify_recipient(event.clone(), recipient));
        join_all(deliveries).await;
    }

    /// Règles de résolution:
    /// - soumissions: tous les rôles de direction de l'établissement;
    /// - décisions / validations: l'enseignant propriétaire;
    /// - commentaire d'enseignant: le premier directeur de
    ///   l'établissement (aucun directeur = aucun destinataire).
    fn resolve_recipients(&self, event: &WorkflowEvent) -> RepositoryResult<Vec<TeacherRecord>> {
        match event.kind {
            NotificationEventKind::DocumentSubmitted | NotificationEventKind::SemainierSubmitted => {
                self.directory_repo.list_reviewers(&event.org_id)
            }
            NotificationEventKind::CommentAdded
                if event.comment_author_role == Some(Role::Teacher) =>
            {
                let reviewers = self.directory_repo.list_reviewers(&event.org_id)?;
                Ok(reviewers.into_iter().take(1).collect())
            }
            _ => Ok(self
                .directory_repo
                .find_by_id(&event.owner_teacher_id)?
                .into_iter()
                .collect()),
        }
    }

    async fn notify_recipient(&self, event: WorkflowEvent, recipient: TeacherRecord) {
        let notification = DocumentNotification::new(
            event.kind,
            event.subject_id.clone(),
            recipient.teacher_id.clone(),
            event.title.clone(),
            event.message.clone(),
        );

        if let Err(e) = self.notification_repo.insert(&notification) {
            warn!(
                recipient = %recipient.teacher_id,
                "persistance de la notification impossible: {}",
                e
            );
            return;
        }

        // Trois canaux indépendants: l'échec de l'un n'empêche pas
        // les autres.
        let attempts = DeliveryChannel::ALL
            .iter()
            .map(|channel| self.attempt_channel(*channel, &notification, &recipient, &event));
        join_all(attempts).await;
    }

    async fn attempt_channel(
        &self,
        channel: DeliveryChannel,
        notification: &DocumentNotification,
        recipient: &TeacherRecord,
        event: &WorkflowEvent,
    ) {
        let (provider, destination) = match channel {
            DeliveryChannel::Email => (&self.email, recipient.email.clone()),
            DeliveryChannel::Sms => (&self.sms, recipient.phone.clone()),
            DeliveryChannel::Whatsapp => (&self.whatsapp, recipient.phone.clone()),
        };

        let Some(destination) = destination else {
            debug!(
                channel = channel.as_str(),
                recipient = %recipient.teacher_id,
                "pas d'adresse pour ce canal, envoi ignoré"
            );
            return;
        };

        let subject = matches!(channel, DeliveryChannel::Email).then_some(event.title.as_str());

        match provider.send(&destination, subject, &event.message).await {
            Ok(()) => {
                if let Err(e) = self.notification_repo.mark_channel_sent(
                    &notification.notification_id,
                    channel,
                    Utc::now().naive_utc(),
                ) {
                    warn!(
                        channel = channel.as_str(),
                        notification_id = %notification.notification_id,
                        "drapeau d'envoi non enregistré: {}",
                        e
                    );
                }
            }
            Err(e) => {
                // Drapeau laissé à false; l'opération appelante n'est
                // pas impactée.
                warn!(
                    channel = channel.as_str(),
                    recipient = %recipient.teacher_id,
                    "livraison échouée: {}",
                    e
                );
            }
        }
    }

    /// Marque une notification comme lue in-app.
    pub fn mark_read(&self, notification_id: &str) -> RepositoryResult<bool> {
        self.notification_repo
            .mark_read(notification_id, Utc::now().naive_utc())
    }

    /// Notifications d'un destinataire, plus récentes d'abord.
    pub fn list_for_recipient(
        &self,
        recipient_id: &str,
    ) -> RepositoryResult<Vec<DocumentNotification>> {
        self.notification_repo.list_for_recipient(recipient_id)
    }
}
