// ==========================================
// Scolaris - Repositories du tour de semaine
// ==========================================
// Affectations hebdomadaires et cahier du semainier (entrées
// quotidiennes, incidents). L'index unique partiel
// idx_assignment_active_week porte l'invariant "une seule affectation
// active par semaine": une course d'insertion ressort en violation
// de contrainte, pas en doublon silencieux.
// ==========================================

use crate::domain::duty::{
    SemainierDailyEntry, SemainierIncident, SemainierStatus, WeeklyDutyAssignment, WeeklySemainier,
};
use crate::domain::teacher::SchoolScope;
use crate::domain::types::{AssignmentMode, IncidentSeverity};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{fmt_date, fmt_dt, parse_date, parse_dt, parse_enum};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AssignmentRepository
// ==========================================
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_ASSIGNMENT: &str = r#"SELECT assignment_id, org_id, academic_year, school_level,
       teacher_id, week_start_date, week_end_date, week_number,
       assignment_mode, is_active, assigned_by, reason, created_at
  FROM weekly_duty_assignment"#;

impl AssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, assignment: &WeeklyDutyAssignment) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO weekly_duty_assignment (
                assignment_id, org_id, academic_year, school_level,
                teacher_id, week_start_date, week_end_date, week_number,
                assignment_mode, is_active, assigned_by, reason, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &assignment.assignment_id,
                &assignment.scope.org_id,
                &assignment.scope.academic_year,
                &assignment.scope.school_level,
                &assignment.teacher_id,
                fmt_date(&assignment.week_start_date),
                fmt_date(&assignment.week_end_date),
                assignment.week_number,
                assignment.assignment_mode.as_str(),
                assignment.is_active as i64,
                &assignment.assigned_by,
                &assignment.reason,
                fmt_dt(&assignment.created_at),
            ],
        )?;

        Ok(assignment.assignment_id.clone())
    }

    pub fn find_by_id(&self, assignment_id: &str) -> RepositoryResult<Option<WeeklyDutyAssignment>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE assignment_id = ?", SELECT_ASSIGNMENT),
            params![assignment_id],
            map_assignment_row,
        ) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Affectation active d'une semaine exacte dans une portée.
    pub fn find_active_for_week(
        &self,
        scope: &SchoolScope,
        week_start: NaiveDate,
    ) -> RepositoryResult<Option<WeeklyDutyAssignment>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                r#"{} WHERE org_id = ? AND academic_year = ? AND school_level = ?
                     AND week_start_date = ? AND is_active = 1"#,
                SELECT_ASSIGNMENT
            ),
            params![
                &scope.org_id,
                &scope.academic_year,
                &scope.school_level,
                fmt_date(&week_start)
            ],
            map_assignment_row,
        ) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Affectation active la plus récente d'une portée (toutes semaines),
    /// point de reprise de la rotation.
    pub fn find_latest_active(
        &self,
        scope: &SchoolScope,
    ) -> RepositoryResult<Option<WeeklyDutyAssignment>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                r#"{} WHERE org_id = ? AND academic_year = ? AND school_level = ?
                     AND is_active = 1
                   ORDER BY week_start_date DESC
                   LIMIT 1"#,
                SELECT_ASSIGNMENT
            ),
            params![&scope.org_id, &scope.academic_year, &scope.school_level],
            map_assignment_row,
        ) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Affectation active dont la fenêtre contient la date donnée,
    /// optionnellement restreinte à un enseignant.
    pub fn find_active_covering(
        &self,
        scope: &SchoolScope,
        date: NaiveDate,
        teacher_id: Option<&str>,
    ) -> RepositoryResult<Option<WeeklyDutyAssignment>> {
        let conn = self.get_conn()?;

        let base = format!(
            r#"{} WHERE org_id = ? AND academic_year = ? AND school_level = ?
                 AND is_active = 1 AND week_start_date <= ? AND week_end_date >= ?"#,
            SELECT_ASSIGNMENT
        );
        let date_s = fmt_date(&date);

        let result = match teacher_id {
            Some(tid) => conn.query_row(
                &format!("{} AND teacher_id = ?", base),
                params![
                    &scope.org_id,
                    &scope.academic_year,
                    &scope.school_level,
                    &date_s,
                    &date_s,
                    tid
                ],
                map_assignment_row,
            ),
            None => conn.query_row(
                &base,
                params![
                    &scope.org_id,
                    &scope.academic_year,
                    &scope.school_level,
                    &date_s,
                    &date_s
                ],
                map_assignment_row,
            ),
        };

        match result {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Désactive une affectation (piste d'audit conservée).
    pub fn deactivate(&self, assignment_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE weekly_duty_assignment SET is_active = 0 WHERE assignment_id = ?",
            params![assignment_id],
        )?;

        Ok(affected > 0)
    }
}

fn map_assignment_row(row: &rusqlite::Row) -> rusqlite::Result<WeeklyDutyAssignment> {
    Ok(WeeklyDutyAssignment {
        assignment_id: row.get(0)?,
        scope: SchoolScope {
            org_id: row.get(1)?,
            academic_year: row.get(2)?,
            school_level: row.get(3)?,
        },
        teacher_id: row.get(4)?,
        week_start_date: parse_date(5, &row.get::<_, String>(5)?)?,
        week_end_date: parse_date(6, &row.get::<_, String>(6)?)?,
        week_number: row.get(7)?,
        assignment_mode: parse_enum::<AssignmentMode>(8, &row.get::<_, String>(8)?)?,
        is_active: row.get::<_, i64>(9)? != 0,
        assigned_by: row.get(10)?,
        reason: row.get(11)?,
        created_at: parse_dt(12, &row.get::<_, String>(12)?)?,
    })
}

// ==========================================
// SemainierRepository
// ==========================================
// Cahier + entrées quotidiennes + incidents.
pub struct SemainierRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_SEMAINIER: &str = r#"SELECT semainier_id, assignment_id, org_id, academic_year,
       school_level, teacher_id, week_start_date, week_end_date,
       status, content, submitted_at, validated_by, validated_at,
       created_at, updated_at
  FROM weekly_semainier"#;

const SELECT_INCIDENT: &str = r#"SELECT incident_id, semainier_id, incident_date, incident_type,
       description, severity, reported_by, escalated_to_qhse, created_at
  FROM semainier_incident"#;

impl SemainierRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, semainier: &WeeklySemainier) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO weekly_semainier (
                semainier_id, assignment_id, org_id, academic_year, school_level,
                teacher_id, week_start_date, week_end_date, status, content,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &semainier.semainier_id,
                &semainier.assignment_id,
                &semainier.scope.org_id,
                &semainier.scope.academic_year,
                &semainier.scope.school_level,
                &semainier.teacher_id,
                fmt_date(&semainier.week_start_date),
                fmt_date(&semainier.week_end_date),
                semainier.status.code(),
                &semainier.content,
                fmt_dt(&semainier.created_at),
                fmt_dt(&semainier.updated_at),
            ],
        )?;

        Ok(semainier.semainier_id.clone())
    }

    pub fn find_by_id(&self, semainier_id: &str) -> RepositoryResult<Option<WeeklySemainier>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE semainier_id = ?", SELECT_SEMAINIER),
            params![semainier_id],
            map_semainier_row,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Cahier attaché à une affectation (relation 1:1).
    pub fn find_by_assignment(
        &self,
        assignment_id: &str,
    ) -> RepositoryResult<Option<WeeklySemainier>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE assignment_id = ?", SELECT_SEMAINIER),
            params![assignment_id],
            map_semainier_row,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Réécrit le contenu tant que le cahier est EN_COURS.
    pub fn update_content_en_cours(
        &self,
        semainier_id: &str,
        content: &str,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE weekly_semainier SET content = ?, updated_at = ?
               WHERE semainier_id = ? AND status = 'EN_COURS'"#,
            params![content, fmt_dt(&updated_at), semainier_id],
        )?;

        Ok(affected > 0)
    }

    /// EN_COURS -> SOUMIS. false si le statut courant n'est pas EN_COURS.
    pub fn mark_soumis(
        &self,
        semainier_id: &str,
        submitted_at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE weekly_semainier
               SET status = 'SOUMIS', submitted_at = ?, updated_at = ?
               WHERE semainier_id = ? AND status = 'EN_COURS'"#,
            params![fmt_dt(&submitted_at), fmt_dt(&submitted_at), semainier_id],
        )?;

        Ok(affected > 0)
    }

    /// SOUMIS -> VALIDATED. false si le statut courant n'est pas SOUMIS.
    pub fn mark_validated(
        &self,
        semainier_id: &str,
        validated_by: &str,
        validated_at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE weekly_semainier
               SET status = 'VALIDATED', validated_by = ?, validated_at = ?, updated_at = ?
               WHERE semainier_id = ? AND status = 'SOUMIS'"#,
            params![validated_by, fmt_dt(&validated_at), fmt_dt(&validated_at), semainier_id],
        )?;

        Ok(affected > 0)
    }

    /// Cahiers soumis d'une portée, plus anciens d'abord.
    pub fn list_soumis(&self, scope: &SchoolScope) -> RepositoryResult<Vec<WeeklySemainier>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{} WHERE org_id = ? AND academic_year = ? AND school_level = ?
                 AND status = 'SOUMIS'
               ORDER BY submitted_at ASC"#,
            SELECT_SEMAINIER
        ))?;

        let semainiers = stmt
            .query_map(
                params![&scope.org_id, &scope.academic_year, &scope.school_level],
                map_semainier_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(semainiers)
    }

    /// Tous les cahiers d'un établissement (année optionnelle),
    /// pour l'agrégation KPI/alertes.
    pub fn list_for_tenant(
        &self,
        org_id: &str,
        academic_year: Option<&str>,
    ) -> RepositoryResult<Vec<WeeklySemainier>> {
        let conn = self.get_conn()?;

        let semainiers = match academic_year {
            Some(year) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE org_id = ? AND academic_year = ? ORDER BY week_start_date ASC",
                    SELECT_SEMAINIER
                ))?;
                let rows = stmt
                    .query_map(params![org_id, year], map_semainier_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE org_id = ? ORDER BY week_start_date ASC",
                    SELECT_SEMAINIER
                ))?;
                let rows = stmt
                    .query_map(params![org_id], map_semainier_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(semainiers)
    }

    // ==========================================
    // Entrées quotidiennes
    // ==========================================

    /// Insère ou met à jour l'entrée du jour (clé semainier + date).
    /// Idempotent: deux appels sur la même date modifient la même ligne.
    pub fn upsert_daily_entry(&self, entry: &SemainierDailyEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO semainier_daily_entry (
                entry_id, semainier_id, entry_date, observations, actions,
                events_json, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (semainier_id, entry_date) DO UPDATE SET
                observations = excluded.observations,
                actions = excluded.actions,
                events_json = excluded.events_json,
                updated_at = excluded.updated_at"#,
            params![
                &entry.entry_id,
                &entry.semainier_id,
                fmt_date(&entry.entry_date),
                &entry.observations,
                &entry.actions,
                entry.events.as_ref().map(|v| v.to_string()),
                fmt_dt(&entry.created_at),
                fmt_dt(&entry.updated_at),
            ],
        )?;

        Ok(())
    }

    /// Entrées d'un cahier, ordre chronologique.
    pub fn list_entries(&self, semainier_id: &str) -> RepositoryResult<Vec<SemainierDailyEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT entry_id, semainier_id, entry_date, observations, actions,
                      events_json, created_at, updated_at
               FROM semainier_daily_entry
               WHERE semainier_id = ?
               ORDER BY entry_date ASC"#,
        )?;

        let entries = stmt
            .query_map(params![semainier_id], |row| {
                let events = row
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

                Ok(SemainierDailyEntry {
                    entry_id: row.get(0)?,
                    semainier_id: row.get(1)?,
                    entry_date: parse_date(2, &row.get::<_, String>(2)?)?,
                    observations: row.get(3)?,
                    actions: row.get(4)?,
                    events,
                    created_at: parse_dt(6, &row.get::<_, String>(6)?)?,
                    updated_at: parse_dt(7, &row.get::<_, String>(7)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    // ==========================================
    // Incidents
    // ==========================================

    pub fn insert_incident(&self, incident: &SemainierIncident) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO semainier_incident (
                incident_id, semainier_id, incident_date, incident_type,
                description, severity, reported_by, escalated_to_qhse, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &incident.incident_id,
                &incident.semainier_id,
                fmt_date(&incident.incident_date),
                &incident.incident_type,
                &incident.description,
                incident.severity.as_str(),
                &incident.reported_by,
                incident.escalated_to_qhse as i64,
                fmt_dt(&incident.created_at),
            ],
        )?;

        Ok(())
    }

    pub fn list_incidents(&self, semainier_id: &str) -> RepositoryResult<Vec<SemainierIncident>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE semainier_id = ? ORDER BY incident_date ASC, created_at ASC",
            SELECT_INCIDENT
        ))?;

        let incidents = stmt
            .query_map(params![semainier_id], map_incident_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(incidents)
    }

    /// Incidents de tous les cahiers d'un établissement (année optionnelle).
    pub fn list_incidents_for_tenant(
        &self,
        org_id: &str,
        academic_year: Option<&str>,
    ) -> RepositoryResult<Vec<SemainierIncident>> {
        let conn = self.get_conn()?;

        let base = r#"SELECT i.incident_id, i.semainier_id, i.incident_date, i.incident_type,
       i.description, i.severity, i.reported_by, i.escalated_to_qhse, i.created_at
  FROM semainier_incident i
  JOIN weekly_semainier s ON s.semainier_id = i.semainier_id"#;

        let incidents = match academic_year {
            Some(year) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE s.org_id = ? AND s.academic_year = ?",
                    base
                ))?;
                let rows = stmt
                    .query_map(params![org_id, year], map_incident_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!("{} WHERE s.org_id = ?", base))?;
                let rows = stmt
                    .query_map(params![org_id], map_incident_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(incidents)
    }
}

fn map_semainier_row(row: &rusqlite::Row) -> rusqlite::Result<WeeklySemainier> {
    let status_code: String = row.get(8)?;

    let opt_dt = |idx: usize, v: Option<String>| -> rusqlite::Result<Option<NaiveDateTime>> {
        v.map(|s| parse_dt(idx, &s)).transpose()
    };

    let submitted_at = opt_dt(10, row.get(10)?)?;
    let validated_by: Option<String> = row.get(11)?;
    let validated_at = opt_dt(12, row.get(12)?)?;

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
        "EN_COURS" => SemainierStatus::EnCours,
        "SOUMIS" => SemainierStatus::Soumis {
            submitted_at: submitted_at.ok_or_else(|| corrupt(10, "submitted_at"))?,
        },
        "VALIDATED" => SemainierStatus::Validated {
            validated_by: validated_by.ok_or_else(|| corrupt(11, "validated_by"))?,
            validated_at: validated_at.ok_or_else(|| corrupt(12, "validated_at"))?,
        },
        _ => return Err(corrupt(8, "status")),
    };

    Ok(WeeklySemainier {
        semainier_id: row.get(0)?,
        assignment_id: row.get(1)?,
        scope: SchoolScope {
            org_id: row.get(2)?,
            academic_year: row.get(3)?,
            school_level: row.get(4)?,
        },
        teacher_id: row.get(5)?,
        week_start_date: parse_date(6, &row.get::<_, String>(6)?)?,
        week_end_date: parse_date(7, &row.get::<_, String>(7)?)?,
        status,
        content: row.get(9)?,
        created_at: parse_dt(13, &row.get::<_, String>(13)?)?,
        updated_at: parse_dt(14, &row.get::<_, String>(14)?)?,
    })
}

fn map_incident_row(row: &rusqlite::Row) -> rusqlite::Result<SemainierIncident> {
    Ok(SemainierIncident {
        incident_id: row.get(0)?,
        semainier_id: row.get(1)?,
        incident_date: parse_date(2, &row.get::<_, String>(2)?)?,
        incident_type: row.get(3)?,
        description: row.get(4)?,
        severity: parse_enum::<IncidentSeverity>(5, &row.get::<_, String>(5)?)?,
        reported_by: row.get(6)?,
        escalated_to_qhse: row.get::<_, i64>(7)? != 0,
        created_at: parse_dt(8, &row.get::<_, String>(8)?)?,
    })
}
