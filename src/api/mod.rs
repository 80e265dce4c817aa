// ==========================================
// Scolaris - Couche API
// ==========================================
// Responsabilité: opérations métier exposées à une couche transport
// (HTTP, commandes, etc.) qui n'existe pas ici.
// ==========================================

pub mod error;
pub mod document_api;
pub mod duty_api;
pub mod alert_api;

// Réexports des types clés
pub use error::{ApiError, ApiResult};
pub use document_api::{CreateDocumentRequest, DocumentApi, DocumentStats, UpdateDocumentRequest};
pub use duty_api::{DailyEntryRequest, DutyApi, IncidentRequest};
pub use alert_api::AlertApi;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::domain::notification::DeliveryChannel;
use crate::notify::{DeliveryProvider, LogOnlyProvider, NotificationDispatcher};
use crate::repository::document_repo::{
    DocumentCommentRepository, DocumentRepository, DocumentReviewRepository,
    DocumentVersionRepository,
};
use crate::repository::duty_repo::{AssignmentRepository, SemainierRepository};
use crate::repository::notification_repo::NotificationRepository;
use crate::repository::teacher_repo::TeacherDirectoryRepository;

// ==========================================
// Services - câblage complet de l'application
// ==========================================
// Construit les dépôts, le diffuseur et les API à partir d'une
// connexion partagée. Les fournisseurs de livraison par défaut se
// contentent de journaliser.
pub struct Services {
    pub directory_repo: Arc<TeacherDirectoryRepository>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub documents: DocumentApi,
    pub duty: DutyApi,
    pub alerts: AlertApi,
}

impl Services {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self::with_providers(
            conn,
            Arc::new(LogOnlyProvider::new(DeliveryChannel::Email)),
            Arc::new(LogOnlyProvider::new(DeliveryChannel::Sms)),
            Arc::new(LogOnlyProvider::new(DeliveryChannel::Whatsapp)),
        )
    }

    pub fn with_providers(
        conn: Arc<Mutex<Connection>>,
        email: Arc<dyn DeliveryProvider>,
        sms: Arc<dyn DeliveryProvider>,
        whatsapp: Arc<dyn DeliveryProvider>,
    ) -> Self {
        let directory_repo = Arc::new(TeacherDirectoryRepository::new(conn.clone()));
        let document_repo = Arc::new(DocumentRepository::new(conn.clone()));
        let version_repo = Arc::new(DocumentVersionRepository::new(conn.clone()));
        let review_repo = Arc::new(DocumentReviewRepository::new(conn.clone()));
        let comment_repo = Arc::new(DocumentCommentRepository::new(conn.clone()));
        let assignment_repo = Arc::new(AssignmentRepository::new(conn.clone()));
        let semainier_repo = Arc::new(SemainierRepository::new(conn.clone()));
        let notification_repo = Arc::new(NotificationRepository::new(conn.clone()));

        let dispatcher = Arc::new(NotificationDispatcher::new(
            notification_repo,
            directory_repo.clone(),
            email,
            sms,
            whatsapp,
        ));

        let documents = DocumentApi::new(
            document_repo.clone(),
            version_repo,
            review_repo,
            comment_repo,
            directory_repo.clone(),
            dispatcher.clone(),
        );
        let duty = DutyApi::new(
            assignment_repo,
            semainier_repo.clone(),
            directory_repo.clone(),
            dispatcher.clone(),
        );
        let alerts = AlertApi::new(document_repo, semainier_repo, conn);

        Self {
            directory_repo,
            dispatcher,
            documents,
            duty,
            alerts,
        }
    }
}
