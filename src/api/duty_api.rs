// ==========================================
// Scolaris - API de la rotation des semainiers
// ==========================================
// Affectation hebdomadaire du surveillant de semaine (rotation
// automatique ou dérogation manuelle), puis cycle de vie du cahier:
//   EN_COURS --submit--> SOUMIS --validate--> VALIDATED
// La rotation reprend toujours depuis l'affectation ACTIVE la plus
// récente, quel que soit son mode: une dérogation manuelle décale la
// suite de la rotation.
// ==========================================

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::duty::{
    SemainierDailyEntry, SemainierIncident, SemainierStatus, WeeklyDutyAssignment, WeeklySemainier,
};
use crate::domain::notification::NotificationEventKind;
use crate::domain::teacher::SchoolScope;
use crate::domain::types::{AssignmentMode, IncidentSeverity};
use crate::engine::rotation::RotationEngine;
use crate::notify::{NotificationDispatcher, WorkflowEvent};
use crate::repository::duty_repo::{AssignmentRepository, SemainierRepository};
use crate::repository::teacher_repo::TeacherDirectoryRepository;

const DEFAULT_MANUAL_REASON: &str = "Affectation manuelle par la direction";

// ==========================================
// Requêtes
// ==========================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyEntryRequest {
    pub observations: Option<String>,
    pub actions: Option<String>,
    /// Événements structurés de la journée (JSON libre).
    pub events: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentRequest {
    pub incident_type: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
}

// ==========================================
// DutyApi
// ==========================================
pub struct DutyApi {
    assignment_repo: Arc<AssignmentRepository>,
    semainier_repo: Arc<SemainierRepository>,
    directory_repo: Arc<TeacherDirectoryRepository>,
    rotation: RotationEngine,
    dispatcher: Arc<NotificationDispatcher>,
}

impl DutyApi {
    pub fn new(
        assignment_repo: Arc<AssignmentRepository>,
        semainier_repo: Arc<SemainierRepository>,
        directory_repo: Arc<TeacherDirectoryRepository>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            assignment_repo,
            semainier_repo,
            directory_repo,
            rotation: RotationEngine::new(),
            dispatcher,
        }
    }

    // ==========================================
    // Affectation
    // ==========================================

    /// Affectation automatique par rotation déterministe. Conflict si
    /// la semaine a déjà une affectation active.
    pub fn assign_auto(
        &self,
        scope: &SchoolScope,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> ApiResult<WeeklyDutyAssignment> {
        check_week_bounds(week_start, week_end)?;

        if self
            .assignment_repo
            .find_active_for_week(scope, week_start)?
            .is_some()
        {
            return Err(ApiError::Conflict(format!(
                "la semaine du {} a déjà une affectation active",
                week_start
            )));
        }

        let teachers = self.directory_repo.list_active_in_scope(scope)?;
        if teachers.is_empty() {
            return Err(ApiError::NotFound(format!(
                "aucun enseignant actif dans la portée {}",
                scope
            )));
        }

        let last = self.assignment_repo.find_latest_active(scope)?;
        let next = self
            .rotation
            .next_assignee(&teachers, last.as_ref())
            .ok_or_else(|| {
                ApiError::NotFound(format!("aucun enseignant actif dans la portée {}", scope))
            })?;

        let assignment = WeeklyDutyAssignment {
            assignment_id: Uuid::new_v4().to_string(),
            scope: scope.clone(),
            teacher_id: next.teacher_id.clone(),
            week_start_date: week_start,
            week_end_date: week_end,
            week_number: week_start.iso_week().week() as i32,
            assignment_mode: AssignmentMode::Auto,
            is_active: true,
            assigned_by: None,
            reason: None,
            created_at: Utc::now().naive_utc(),
        };

        // L'index d'unicité partiel sur (portée, semaine, active)
        // transforme une course concurrente en Conflict.
        self.assignment_repo.insert(&assignment)?;
        info!(
            assignment_id = %assignment.assignment_id,
            teacher_id = %assignment.teacher_id,
            week_start = %week_start,
            "affectation automatique créée"
        );

        Ok(assignment)
    }

    /// Dérogation manuelle: l'affectation précédente de la semaine est
    /// désactivée (jamais supprimée) avant l'insertion.
    pub fn assign_manual(
        &self,
        scope: &SchoolScope,
        week_start: NaiveDate,
        week_end: NaiveDate,
        teacher_id: &str,
        assigned_by: &str,
        reason: Option<String>,
    ) -> ApiResult<WeeklyDutyAssignment> {
        check_week_bounds(week_start, week_end)?;

        let target = self
            .directory_repo
            .find_in_scope(scope, teacher_id)?
            .filter(|t| t.is_active())
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "enseignant actif {} introuvable dans la portée {}",
                    teacher_id, scope
                ))
            })?;

        if let Some(existing) = self.assignment_repo.find_active_for_week(scope, week_start)? {
            self.assignment_repo.deactivate(&existing.assignment_id)?;
            info!(
                assignment_id = %existing.assignment_id,
                "affectation précédente désactivée par dérogation manuelle"
            );
        }

        let assignment = WeeklyDutyAssignment {
            assignment_id: Uuid::new_v4().to_string(),
            scope: scope.clone(),
            teacher_id: target.teacher_id.clone(),
            week_start_date: week_start,
            week_end_date: week_end,
            week_number: week_start.iso_week().week() as i32,
            assignment_mode: AssignmentMode::Manual,
            is_active: true,
            assigned_by: Some(assigned_by.to_string()),
            reason: Some(reason.unwrap_or_else(|| DEFAULT_MANUAL_REASON.to_string())),
            created_at: Utc::now().naive_utc(),
        };

        self.assignment_repo.insert(&assignment)?;
        info!(
            assignment_id = %assignment.assignment_id,
            teacher_id = %assignment.teacher_id,
            assigned_by,
            week_start = %week_start,
            "affectation manuelle créée"
        );

        Ok(assignment)
    }

    // ==========================================
    // Cahier du semainier
    // ==========================================

    /// Crée le cahier EN_COURS de l'affectation (borné sur sa semaine)
    /// ou réécrit son contenu tant qu'il n'est pas soumis.
    pub fn create_or_update_semainier(
        &self,
        assignment_id: &str,
        teacher_id: &str,
        content: &str,
    ) -> ApiResult<WeeklySemainier> {
        let assignment = self
            .assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("affectation {}", assignment_id)))?;

        if !assignment.is_active {
            return Err(ApiError::InvalidState {
                entity: format!("affectation {}", assignment_id),
                current: "inactive".to_string(),
                action: "create_or_update_semainier".to_string(),
            });
        }
        if assignment.teacher_id != teacher_id {
            return Err(ApiError::Forbidden(format!(
                "l'affectation {} n'appartient pas à l'enseignant {}",
                assignment_id, teacher_id
            )));
        }

        let now = Utc::now().naive_utc();
        match self.semainier_repo.find_by_assignment(assignment_id)? {
            None => {
                let semainier = WeeklySemainier {
                    semainier_id: Uuid::new_v4().to_string(),
                    assignment_id: assignment_id.to_string(),
                    scope: assignment.scope.clone(),
                    teacher_id: teacher_id.to_string(),
                    week_start_date: assignment.week_start_date,
                    week_end_date: assignment.week_end_date,
                    status: SemainierStatus::EnCours,
                    content: content.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                self.semainier_repo.insert(&semainier)?;
                info!(semainier_id = %semainier.semainier_id, assignment_id, "cahier du semainier ouvert");
                Ok(semainier)
            }
            Some(mut semainier) => {
                if !self
                    .semainier_repo
                    .update_content_en_cours(&semainier.semainier_id, content, now)?
                {
                    return Err(invalid_state(&semainier, "create_or_update_semainier"));
                }
                semainier.content = content.to_string();
                semainier.updated_at = now;
                Ok(semainier)
            }
        }
    }

    /// Entrée quotidienne, une par (cahier, date): réécrire la même
    /// date met à jour la même ligne.
    pub fn add_daily_entry(
        &self,
        semainier_id: &str,
        entry_date: NaiveDate,
        request: DailyEntryRequest,
    ) -> ApiResult<SemainierDailyEntry> {
        let semainier = self.load_semainier(semainier_id)?;

        if !semainier.status.is_en_cours() {
            return Err(invalid_state(&semainier, "add_daily_entry"));
        }
        if !semainier.week_contains(entry_date) {
            return Err(ApiError::Validation(format!(
                "la date {} est hors de la semaine du cahier ({} au {})",
                entry_date, semainier.week_start_date, semainier.week_end_date
            )));
        }

        let now = Utc::now().naive_utc();
        let entry = SemainierDailyEntry {
            entry_id: Uuid::new_v4().to_string(),
            semainier_id: semainier_id.to_string(),
            entry_date,
            observations: request.observations,
            actions: request.actions,
            events: request.events,
            created_at: now,
            updated_at: now,
        };
        self.semainier_repo.upsert_daily_entry(&entry)?;

        Ok(entry)
    }

    /// Déclare un incident. Jamais bloqué par le statut du cahier: un
    /// incident découvert après soumission reste déclarable.
    /// L'escalade QHSE est dérivée de la gravité, pas fournie.
    pub fn report_incident(
        &self,
        semainier_id: &str,
        incident_date: NaiveDate,
        reported_by: &str,
        request: IncidentRequest,
    ) -> ApiResult<SemainierIncident> {
        if request.incident_type.trim().is_empty() {
            return Err(ApiError::Validation(
                "le type d'incident est obligatoire".to_string(),
            ));
        }
        self.load_semainier(semainier_id)?;

        let incident = SemainierIncident::new(
            semainier_id.to_string(),
            incident_date,
            request.incident_type.trim().to_string(),
            request.description,
            request.severity,
            reported_by.to_string(),
        );
        self.semainier_repo.insert_incident(&incident)?;

        if incident.escalated_to_qhse {
            info!(
                incident_id = %incident.incident_id,
                severity = incident.severity.as_str(),
                "incident escaladé au référent QHSE"
            );
        }

        Ok(incident)
    }

    /// EN_COURS -> SOUMIS puis notification de la direction. La
    /// soumission anticipée (avant la fin de semaine) est permise et
    /// simplement journalisée.
    pub async fn submit_semainier(
        &self,
        semainier_id: &str,
        teacher_id: &str,
    ) -> ApiResult<WeeklySemainier> {
        let semainier = self.load_semainier(semainier_id)?;

        let assignment = self
            .assignment_repo
            .find_by_id(&semainier.assignment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("affectation {}", semainier.assignment_id)))?;
        if !assignment.is_active {
            return Err(ApiError::InvalidState {
                entity: format!("affectation {}", assignment.assignment_id),
                current: "inactive".to_string(),
                action: "submit_semainier".to_string(),
            });
        }
        if assignment.teacher_id != teacher_id {
            return Err(ApiError::Forbidden(format!(
                "le cahier {} n'appartient pas à l'enseignant {}",
                semainier_id, teacher_id
            )));
        }
        if !semainier.status.is_en_cours() {
            return Err(invalid_state(&semainier, "submit_semainier"));
        }

        let submitted_at = Utc::now().naive_utc();
        if submitted_at.date() < semainier.week_end_date {
            info!(
                semainier_id,
                week_end = %semainier.week_end_date,
                "soumission anticipée du cahier avant la fin de semaine"
            );
        }

        if !self.semainier_repo.mark_soumis(semainier_id, submitted_at)? {
            let current = self.load_semainier(semainier_id)?;
            return Err(invalid_state(&current, "submit_semainier"));
        }

        let mut semainier = semainier;
        semainier.status = SemainierStatus::Soumis { submitted_at };
        semainier.updated_at = submitted_at;
        info!(semainier_id, teacher_id, "cahier du semainier soumis");

        self.dispatcher
            .dispatch(WorkflowEvent::for_semainier(
                NotificationEventKind::SemainierSubmitted,
                &semainier,
            ))
            .await;

        Ok(semainier)
    }

    /// SOUMIS -> VALIDATED. Un cahier qui n'est pas au statut SOUMIS
    /// est traité comme absent de la file de validation.
    pub async fn validate_semainier(
        &self,
        semainier_id: &str,
        reviewer_id: &str,
    ) -> ApiResult<WeeklySemainier> {
        let semainier = self.load_semainier(semainier_id)?;
        self.require_reviewer(reviewer_id)?;

        if !semainier.status.is_soumis() {
            return Err(ApiError::NotFound(format!(
                "aucun cahier {} en attente de validation",
                semainier_id
            )));
        }

        let validated_at = Utc::now().naive_utc();
        if !self
            .semainier_repo
            .mark_validated(semainier_id, reviewer_id, validated_at)?
        {
            return Err(ApiError::NotFound(format!(
                "aucun cahier {} en attente de validation",
                semainier_id
            )));
        }

        let mut semainier = semainier;
        semainier.status = SemainierStatus::Validated {
            validated_by: reviewer_id.to_string(),
            validated_at,
        };
        semainier.updated_at = validated_at;
        info!(semainier_id, reviewer_id, "cahier du semainier validé");

        self.dispatcher
            .dispatch(WorkflowEvent::for_semainier(
                NotificationEventKind::SemainierValidated,
                &semainier,
            ))
            .await;

        Ok(semainier)
    }

    // ==========================================
    // Lectures
    // ==========================================

    pub fn list_submitted(&self, scope: &SchoolScope) -> ApiResult<Vec<WeeklySemainier>> {
        Ok(self.semainier_repo.list_soumis(scope)?)
    }

    pub fn list_entries(&self, semainier_id: &str) -> ApiResult<Vec<SemainierDailyEntry>> {
        self.load_semainier(semainier_id)?;
        Ok(self.semainier_repo.list_entries(semainier_id)?)
    }

    pub fn list_incidents(&self, semainier_id: &str) -> ApiResult<Vec<SemainierIncident>> {
        self.load_semainier(semainier_id)?;
        Ok(self.semainier_repo.list_incidents(semainier_id)?)
    }

    /// Affectation de l'enseignant dont la fenêtre contient
    /// aujourd'hui, avec son cahier s'il existe.
    pub fn get_current(
        &self,
        scope: &SchoolScope,
        teacher_id: &str,
    ) -> ApiResult<Option<(WeeklyDutyAssignment, Option<WeeklySemainier>)>> {
        self.get_current_at(scope, teacher_id, Utc::now().date_naive())
    }

    pub fn get_current_at(
        &self,
        scope: &SchoolScope,
        teacher_id: &str,
        today: NaiveDate,
    ) -> ApiResult<Option<(WeeklyDutyAssignment, Option<WeeklySemainier>)>> {
        let assignment = match self
            .assignment_repo
            .find_active_covering(scope, today, Some(teacher_id))?
        {
            Some(a) => a,
            None => return Ok(None),
        };

        let semainier = self
            .semainier_repo
            .find_by_assignment(&assignment.assignment_id)?;

        Ok(Some((assignment, semainier)))
    }

    // ==========================================
    // Aides internes
    // ==========================================

    fn load_semainier(&self, semainier_id: &str) -> ApiResult<WeeklySemainier> {
        self.semainier_repo
            .find_by_id(semainier_id)?
            .ok_or_else(|| ApiError::NotFound(format!("cahier {}", semainier_id)))
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
}

fn check_week_bounds(week_start: NaiveDate, week_end: NaiveDate) -> ApiResult<()> {
    if week_end < week_start {
        return Err(ApiError::Validation(format!(
            "bornes de semaine incohérentes: {} après {}",
            week_start, week_end
        )));
    }
    Ok(())
}

fn invalid_state(semainier: &WeeklySemainier, action: &str) -> ApiError {
    ApiError::InvalidState {
        entity: format!("cahier {}", semainier.semainier_id),
        current: semainier.status.code().to_string(),
        action: action.to_string(),
    }
}
