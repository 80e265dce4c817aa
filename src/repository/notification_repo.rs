// ==========================================
// Scolaris - Repository des notifications
// ==========================================
// Créées par le dispatcher; modifiées uniquement pour basculer un
// drapeau de canal ou marquer la lecture in-app.
// ==========================================

use crate::domain::notification::{DeliveryChannel, DocumentNotification, NotificationEventKind};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{fmt_dt, parse_dt, parse_enum};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct NotificationRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_NOTIFICATION: &str = r#"SELECT notification_id, event_kind, subject_id, recipient_id,
       title, message, email_sent, email_sent_at, sms_sent, sms_sent_at,
       whatsapp_sent, whatsapp_sent_at, is_read, read_at, created_at
  FROM document_notification"#;

impl NotificationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, notification: &DocumentNotification) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO document_notification (
                notification_id, event_kind, subject_id, recipient_id,
                title, message, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &notification.notification_id,
                notification.event_kind.as_str(),
                &notification.subject_id,
                &notification.recipient_id,
                &notification.title,
                &notification.message,
                fmt_dt(&notification.created_at),
            ],
        )?;

        Ok(notification.notification_id.clone())
    }

    pub fn find_by_id(
        &self,
        notification_id: &str,
    ) -> RepositoryResult<Option<DocumentNotification>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE notification_id = ?", SELECT_NOTIFICATION),
            params![notification_id],
            map_row,
        ) {
            Ok(n) => Ok(Some(n)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Bascule le drapeau d'envoi d'un canal après une livraison réussie.
    pub fn mark_channel_sent(
        &self,
        notification_id: &str,
        channel: DeliveryChannel,
        sent_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let sql = match channel {
            DeliveryChannel::Email => {
                "UPDATE document_notification SET email_sent = 1, email_sent_at = ? WHERE notification_id = ?"
            }
            DeliveryChannel::Sms => {
                "UPDATE document_notification SET sms_sent = 1, sms_sent_at = ? WHERE notification_id = ?"
            }
            DeliveryChannel::Whatsapp => {
                "UPDATE document_notification SET whatsapp_sent = 1, whatsapp_sent_at = ? WHERE notification_id = ?"
            }
        };

        conn.execute(sql, params![fmt_dt(&sent_at), notification_id])?;

        Ok(())
    }

    /// Marque la notification comme lue in-app.
    pub fn mark_read(&self, notification_id: &str, read_at: NaiveDateTime) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE document_notification SET is_read = 1, read_at = ? WHERE notification_id = ?",
            params![fmt_dt(&read_at), notification_id],
        )?;

        Ok(affected > 0)
    }

    /// Notifications d'un destinataire, plus récentes d'abord.
    pub fn list_for_recipient(
        &self,
        recipient_id: &str,
    ) -> RepositoryResult<Vec<DocumentNotification>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE recipient_id = ? ORDER BY created_at DESC",
            SELECT_NOTIFICATION
        ))?;

        let notifications = stmt
            .query_map(params![recipient_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notifications)
    }

    /// Notifications rattachées à un document ou un semainier.
    pub fn list_for_subject(&self, subject_id: &str) -> RepositoryResult<Vec<DocumentNotification>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE subject_id = ? ORDER BY created_at ASC",
            SELECT_NOTIFICATION
        ))?;

        let notifications = stmt
            .query_map(params![subject_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notifications)
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DocumentNotification> {
    let opt_dt = |idx: usize, v: Option<String>| -> rusqlite::Result<Option<NaiveDateTime>> {
        v.map(|s| parse_dt(idx, &s)).transpose()
    };

    Ok(DocumentNotification {
        notification_id: row.get(0)?,
        event_kind: parse_enum::<NotificationEventKind>(1, &row.get::<_, String>(1)?)?,
        subject_id: row.get(2)?,
        recipient_id: row.get(3)?,
        title: row.get(4)?,
        message: row.get(5)?,
        email_sent: row.get::<_, i64>(6)? != 0,
        email_sent_at: opt_dt(7, row.get(7)?)?,
        sms_sent: row.get::<_, i64>(8)? != 0,
        sms_sent_at: opt_dt(9, row.get(9)?)?,
        whatsapp_sent: row.get::<_, i64>(10)? != 0,
        whatsapp_sent_at: opt_dt(11, row.get(11)?)?,
        is_read: row.get::<_, i64>(12)? != 0,
        read_at: opt_dt(13, row.get(13)?)?,
        created_at: parse_dt(14, &row.get::<_, String>(14)?)?,
    })
}
