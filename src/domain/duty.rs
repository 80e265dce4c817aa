// ==========================================
// Scolaris - Modèles du tour de semaine
// ==========================================
// L'affectation désigne l'enseignant de service; le semainier est
// le cahier hebdomadaire qui en dépend (1:1). Deux objets distincts,
// deux machines à états distinctes.
// ==========================================

use crate::domain::teacher::SchoolScope;
use crate::domain::types::{AssignmentMode, IncidentSeverity};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// WeeklyDutyAssignment - affectation hebdomadaire
// ==========================================
// Invariant: au plus une affectation active par
// (portée, week_start_date). Une dérogation manuelle désactive
// l'enregistrement précédent sans le supprimer (piste d'audit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyDutyAssignment {
    pub assignment_id: String,
    pub scope: SchoolScope,
    pub teacher_id: String,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub week_number: i32, // numéro ISO de la semaine
    pub assignment_mode: AssignmentMode,
    pub is_active: bool,
    pub assigned_by: Option<String>, // renseigné en mode MANUAL
    pub reason: Option<String>,      // renseigné en mode MANUAL
    pub created_at: NaiveDateTime,
}

impl WeeklyDutyAssignment {
    /// La fenêtre hebdomadaire contient-elle cette date?
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.week_start_date <= date && date <= self.week_end_date
    }
}

// ==========================================
// SemainierStatus - machine à états du cahier
// ==========================================
// EN_COURS -> SOUMIS -> VALIDATED
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemainierStatus {
    EnCours,
    Soumis {
        submitted_at: NaiveDateTime,
    },
    Validated {
        validated_by: String,
        validated_at: NaiveDateTime,
    },
}

impl SemainierStatus {
    pub fn code(&self) -> &'static str {
        match self {
            SemainierStatus::EnCours => "EN_COURS",
            SemainierStatus::Soumis { .. } => "SOUMIS",
            SemainierStatus::Validated { .. } => "VALIDATED",
        }
    }

    pub fn is_en_cours(&self) -> bool {
        matches!(self, SemainierStatus::EnCours)
    }

    pub fn is_soumis(&self) -> bool {
        matches!(self, SemainierStatus::Soumis { .. })
    }
}

// ==========================================
// WeeklySemainier - cahier du semainier
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySemainier {
    pub semainier_id: String,
    pub assignment_id: String,
    pub scope: SchoolScope,
    pub teacher_id: String,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub status: SemainierStatus,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl WeeklySemainier {
    /// La date tombe-t-elle dans la semaine du cahier?
    pub fn week_contains(&self, date: NaiveDate) -> bool {
        self.week_start_date <= date && date <= self.week_end_date
    }
}

// ==========================================
// SemainierDailyEntry - entrée quotidienne
// ==========================================
// Unique par (semainier, date); l'écriture répétée sur la même date
// met à jour la même ligne.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemainierDailyEntry {
    pub entry_id: String,
    pub semainier_id: String,
    pub entry_date: NaiveDate,
    pub observations: Option<String>,
    pub actions: Option<String>,
    /// Événements structurés de la journée (JSON libre).
    pub events: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// SemainierIncident - incident déclaré
// ==========================================
// Append-only. escalated_to_qhse est dérivé de la gravité, jamais
// fourni par l'appelant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemainierIncident {
    pub incident_id: String,
    pub semainier_id: String,
    pub incident_date: NaiveDate,
    pub incident_type: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
    pub reported_by: String,
    pub escalated_to_qhse: bool,
    pub created_at: NaiveDateTime,
}

impl SemainierIncident {
    pub fn new(
        semainier_id: String,
        incident_date: NaiveDate,
        incident_type: String,
        description: Option<String>,
        severity: IncidentSeverity,
        reported_by: String,
    ) -> Self {
        Self {
            incident_id: uuid::Uuid::new_v4().to_string(),
            semainier_id,
            incident_date,
            incident_type,
            description,
            severity,
            reported_by,
            escalated_to_qhse: severity.requires_escalation(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_escalation_follows_severity() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let low = SemainierIncident::new(
            "s-1".into(),
            date,
            "RETARD".into(),
            None,
            IncidentSeverity::Low,
            "t-1".into(),
        );
        assert!(!low.escalated_to_qhse);

        let critical = SemainierIncident::new(
            "s-1".into(),
            date,
            "ACCIDENT".into(),
            None,
            IncidentSeverity::Critical,
            "t-1".into(),
        );
        assert!(critical.escalated_to_qhse);
    }

    #[test]
    fn test_assignment_week_window() {
        let a = WeeklyDutyAssignment {
            assignment_id: "a-1".into(),
            scope: SchoolScope::new("org", "2025-2026", "COLLEGE"),
            teacher_id: "t-1".into(),
            week_start_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            week_end_date: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
            week_number: 11,
            assignment_mode: AssignmentMode::Auto,
            is_active: true,
            assigned_by: None,
            reason: None,
            created_at: chrono::Utc::now().naive_utc(),
        };
        assert!(a.covers(NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()));
        assert!(!a.covers(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()));
    }
}
