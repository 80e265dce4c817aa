// ==========================================
// Scolaris - Repository annuaire
// ==========================================
// Collaborateur lecture seule pour le coeur: existence, rôle,
// statut. L'insertion n'est exposée que pour l'amorçage et les
// jeux de test. L'ordre de rotation est l'ordre d'insertion (rowid).
// ==========================================

use crate::domain::teacher::{SchoolScope, TeacherRecord, TeacherStatus};
use crate::domain::types::Role;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{fmt_dt, parse_dt, parse_enum};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct TeacherDirectoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TeacherDirectoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Insère une entrée d'annuaire (amorçage / tests).
    pub fn insert(&self, record: &TeacherRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO teacher_directory (
                teacher_id, org_id, academic_year, school_level,
                full_name, email, phone, role, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &record.teacher_id,
                &record.scope.org_id,
                &record.scope.academic_year,
                &record.scope.school_level,
                &record.full_name,
                &record.email,
                &record.phone,
                record.role.as_str(),
                record.status.as_str(),
                fmt_dt(&record.created_at),
            ],
        )?;

        Ok(())
    }

    /// Recherche par identifiant, sans filtre de portée.
    pub fn find_by_id(&self, teacher_id: &str) -> RepositoryResult<Option<TeacherRecord>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE teacher_id = ?", SELECT_BASE),
            params![teacher_id],
            map_row,
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Recherche dans une portée (établissement, année, niveau).
    pub fn find_in_scope(
        &self,
        scope: &SchoolScope,
        teacher_id: &str,
    ) -> RepositoryResult<Option<TeacherRecord>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                "{} WHERE teacher_id = ? AND org_id = ? AND academic_year = ? AND school_level = ?",
                SELECT_BASE
            ),
            params![teacher_id, &scope.org_id, &scope.academic_year, &scope.school_level],
            map_row,
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Enseignants actifs d'une portée, dans l'ordre de rotation
    /// (ordre d'insertion, déterministe).
    pub fn list_active_in_scope(&self, scope: &SchoolScope) -> RepositoryResult<Vec<TeacherRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{} WHERE org_id = ? AND academic_year = ? AND school_level = ?
                 AND role = 'TEACHER' AND status = 'active'
               ORDER BY rowid ASC"#,
            SELECT_BASE
        ))?;

        let records = stmt
            .query_map(
                params![&scope.org_id, &scope.academic_year, &scope.school_level],
                map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Utilisateurs à rôle de direction (DIRECTOR/ADMIN) d'un établissement.
    pub fn list_reviewers(&self, org_id: &str) -> RepositoryResult<Vec<TeacherRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{} WHERE org_id = ? AND role IN ('DIRECTOR', 'ADMIN') AND status = 'active'
               ORDER BY rowid ASC"#,
            SELECT_BASE
        ))?;

        let records = stmt
            .query_map(params![org_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

const SELECT_BASE: &str = r#"SELECT teacher_id, org_id, academic_year, school_level,
       full_name, email, phone, role, status, created_at
  FROM teacher_directory"#;

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<TeacherRecord> {
    Ok(TeacherRecord {
        teacher_id: row.get(0)?,
        scope: SchoolScope {
            org_id: row.get(1)?,
            academic_year: row.get(2)?,
            school_level: row.get(3)?,
        },
        full_name: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        role: parse_enum::<Role>(7, &row.get::<_, String>(7)?)?,
        status: parse_enum::<TeacherStatus>(8, &row.get::<_, String>(8)?)?,
        created_at: parse_dt(9, &row.get::<_, String>(9)?)?,
    })
}
