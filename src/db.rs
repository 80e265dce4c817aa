// ==========================================
// Scolaris - Initialisation SQLite
// ==========================================
// Objectifs:
// - PRAGMA uniformes pour toutes les connexions (foreign_keys, busy_timeout)
// - Création du schéma et suivi de schema_version
// ==========================================

use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use std::time::Duration;

/// busy_timeout par défaut (millisecondes)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Version de schéma attendue par le code courant.
///
/// Utilisée en avertissement au démarrage (pas de migration automatique)
/// pour éviter de tourner silencieusement sur une base trop ancienne.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Applique les PRAGMA uniformes sur une connexion.
///
/// foreign_keys et busy_timeout doivent être configurés par connexion.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Ouvre une connexion SQLite avec la configuration uniforme.
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Chemin par défaut de la base de données (répertoire de données utilisateur).
pub fn default_db_path() -> String {
    let mut dir: PathBuf = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("scolaris");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("création du répertoire de données impossible: {}", e);
    }
    dir.push("scolaris.db");
    dir.to_string_lossy().to_string()
}

/// Lit schema_version (None si la table n'existe pas encore).
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// Crée l'intégralité du schéma (idempotent) et enregistre la version.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Configuration clé/valeur (portée globale)
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        -- Annuaire des enseignants / directeurs (collaborateur lecture seule)
        CREATE TABLE IF NOT EXISTS teacher_directory (
            teacher_id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            school_level TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            role TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_teacher_scope
            ON teacher_directory (org_id, academic_year, school_level);

        -- Documents pédagogiques
        CREATE TABLE IF NOT EXISTS pedagogical_document (
            document_id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            school_level TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            class_id TEXT,
            subject_id TEXT,
            document_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            title TEXT NOT NULL,
            description TEXT,
            content TEXT NOT NULL DEFAULT '',
            week_start_date TEXT,
            week_end_date TEXT,
            submitted_at TEXT,
            validated_by TEXT,
            validated_at TEXT,
            rejection_reason TEXT,
            acknowledged_by TEXT,
            acknowledged_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_document_scope
            ON pedagogical_document (org_id, academic_year, school_level, status);
        CREATE INDEX IF NOT EXISTS idx_document_teacher
            ON pedagogical_document (teacher_id);

        -- Versions (instantanés immuables du contenu)
        CREATE TABLE IF NOT EXISTS document_version (
            version_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES pedagogical_document(document_id)
                ON DELETE CASCADE,
            version_number INTEGER NOT NULL,
            content TEXT NOT NULL,
            changes TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (document_id, version_number)
        );

        -- Revues (une par décision du directeur)
        CREATE TABLE IF NOT EXISTS document_review (
            review_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES pedagogical_document(document_id)
                ON DELETE CASCADE,
            reviewer_id TEXT NOT NULL,
            decision TEXT NOT NULL,
            comments TEXT,
            section_comments TEXT,
            created_at TEXT NOT NULL
        );

        -- Commentaires (fil append-only)
        CREATE TABLE IF NOT EXISTS document_comment (
            comment_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES pedagogical_document(document_id)
                ON DELETE CASCADE,
            author_id TEXT NOT NULL,
            author_role TEXT NOT NULL,
            section TEXT,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Affectations hebdomadaires du semainier
        CREATE TABLE IF NOT EXISTS weekly_duty_assignment (
            assignment_id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            school_level TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            week_start_date TEXT NOT NULL,
            week_end_date TEXT NOT NULL,
            week_number INTEGER NOT NULL,
            assignment_mode TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            assigned_by TEXT,
            reason TEXT,
            created_at TEXT NOT NULL
        );
        -- Invariant: une seule affectation active par semaine et par portée.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_assignment_active_week
            ON weekly_duty_assignment (org_id, academic_year, school_level, week_start_date)
            WHERE is_active = 1;

        -- Cahier du semainier (1:1 avec l'affectation)
        CREATE TABLE IF NOT EXISTS weekly_semainier (
            semainier_id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL UNIQUE
                REFERENCES weekly_duty_assignment(assignment_id) ON DELETE CASCADE,
            org_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            school_level TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            week_start_date TEXT NOT NULL,
            week_end_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'EN_COURS',
            content TEXT NOT NULL DEFAULT '',
            submitted_at TEXT,
            validated_by TEXT,
            validated_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Entrées quotidiennes (une par date, upsert)
        CREATE TABLE IF NOT EXISTS semainier_daily_entry (
            entry_id TEXT PRIMARY KEY,
            semainier_id TEXT NOT NULL REFERENCES weekly_semainier(semainier_id)
                ON DELETE CASCADE,
            entry_date TEXT NOT NULL,
            observations TEXT,
            actions TEXT,
            events_json TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (semainier_id, entry_date)
        );

        -- Incidents (append-only, jamais bloqués par le statut du semainier)
        CREATE TABLE IF NOT EXISTS semainier_incident (
            incident_id TEXT PRIMARY KEY,
            semainier_id TEXT NOT NULL REFERENCES weekly_semainier(semainier_id)
                ON DELETE CASCADE,
            incident_date TEXT NOT NULL,
            incident_type TEXT NOT NULL,
            description TEXT,
            severity TEXT NOT NULL,
            reported_by TEXT NOT NULL,
            escalated_to_qhse INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        -- Notifications (une par couple événement/destinataire)
        CREATE TABLE IF NOT EXISTS document_notification (
            notification_id TEXT PRIMARY KEY,
            event_kind TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            email_sent INTEGER NOT NULL DEFAULT 0,
            email_sent_at TEXT,
            sms_sent INTEGER NOT NULL DEFAULT 0,
            sms_sent_at TEXT,
            whatsapp_sent INTEGER NOT NULL DEFAULT 0,
            whatsapp_sent_at TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            read_at TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notification_recipient
            ON document_notification (recipient_id, is_read);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
