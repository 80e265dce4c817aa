// ==========================================
// Scolaris - Modèle de notification
// ==========================================
// Un enregistrement par couple (événement, destinataire), avec un
// drapeau d'envoi indépendant par canal. Créé par le dispatcher;
// modifié uniquement pour basculer un drapeau ou marquer la lecture.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::types::ParseEnumError;

// ==========================================
// NotificationEventKind - événements de workflow
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEventKind {
    DocumentSubmitted,
    DocumentApproved,
    DocumentRejected,
    DocumentAcknowledged,
    CommentAdded,
    SemainierSubmitted,
    SemainierValidated,
}

impl NotificationEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEventKind::DocumentSubmitted => "DOCUMENT_SUBMITTED",
            NotificationEventKind::DocumentApproved => "DOCUMENT_APPROVED",
            NotificationEventKind::DocumentRejected => "DOCUMENT_REJECTED",
            NotificationEventKind::DocumentAcknowledged => "DOCUMENT_ACKNOWLEDGED",
            NotificationEventKind::CommentAdded => "COMMENT_ADDED",
            NotificationEventKind::SemainierSubmitted => "SEMAINIER_SUBMITTED",
            NotificationEventKind::SemainierValidated => "SEMAINIER_VALIDATED",
        }
    }
}

impl fmt::Display for NotificationEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationEventKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOCUMENT_SUBMITTED" => Ok(NotificationEventKind::DocumentSubmitted),
            "DOCUMENT_APPROVED" => Ok(NotificationEventKind::DocumentApproved),
            "DOCUMENT_REJECTED" => Ok(NotificationEventKind::DocumentRejected),
            "DOCUMENT_ACKNOWLEDGED" => Ok(NotificationEventKind::DocumentAcknowledged),
            "COMMENT_ADDED" => Ok(NotificationEventKind::CommentAdded),
            "SEMAINIER_SUBMITTED" => Ok(NotificationEventKind::SemainierSubmitted),
            "SEMAINIER_VALIDATED" => Ok(NotificationEventKind::SemainierValidated),
            other => Err(ParseEnumError { kind: "NotificationEventKind", value: other.to_string() }),
        }
    }
}

// ==========================================
// DeliveryChannel - canaux de diffusion
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryChannel {
    Email,
    Sms,
    Whatsapp,
}

impl DeliveryChannel {
    pub const ALL: [DeliveryChannel; 3] =
        [DeliveryChannel::Email, DeliveryChannel::Sms, DeliveryChannel::Whatsapp];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Email => "EMAIL",
            DeliveryChannel::Sms => "SMS",
            DeliveryChannel::Whatsapp => "WHATSAPP",
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// DocumentNotification - ligne persistée
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNotification {
    pub notification_id: String,
    pub event_kind: NotificationEventKind,
    /// Identité du document ou du semainier à l'origine de l'événement.
    pub subject_id: String,
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    pub email_sent: bool,
    pub email_sent_at: Option<NaiveDateTime>,
    pub sms_sent: bool,
    pub sms_sent_at: Option<NaiveDateTime>,
    pub whatsapp_sent: bool,
    pub whatsapp_sent_at: Option<NaiveDateTime>,
    pub is_read: bool,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl DocumentNotification {
    /// Nouvelle notification, aucun canal encore tenté.
    pub fn new(
        event_kind: NotificationEventKind,
        subject_id: String,
        recipient_id: String,
        title: String,
        message: String,
    ) -> Self {
        Self {
            notification_id: uuid::Uuid::new_v4().to_string(),
            event_kind,
            subject_id,
            recipient_id,
            title,
            message,
            email_sent: false,
            email_sent_at: None,
            sms_sent: false,
            sms_sent_at: None,
            whatsapp_sent: false,
            whatsapp_sent_at: None,
            is_read: false,
            read_at: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}
