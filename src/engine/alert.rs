// ==========================================
// Scolaris - Moteur KPI / alertes
// ==========================================
// Agrégation pure en lecture seule: l'appelant charge les données
// d'une portée (établissement, année optionnelle) et injecte la date
// du jour, le moteur produit indicateurs et alertes classées.
// Aucune écriture, aucune erreur sur entrée vide.
// ==========================================

use crate::config::AlertThresholds;
use crate::domain::document::{DocumentStatus, PedagogicalDocument};
use crate::domain::duty::{SemainierIncident, WeeklySemainier};
use crate::domain::types::{AlertCategory, AlertSeverity, IncidentSeverity};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// Indicateurs agrégés
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentKpis {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, i64>,
    /// Documents sortis du brouillon / total.
    pub submission_rate: f64,
    /// Approuvés / documents sortis du brouillon.
    pub approval_rate: f64,
    /// Rejetés / documents sortis du brouillon.
    pub rejection_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemainierKpis {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub incident_total: i64,
    pub incident_high_count: i64,
    pub incident_critical_count: i64,
    /// Incidents / cahiers.
    pub incident_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardKpis {
    pub documents: DocumentKpis,
    pub semainiers: SemainierKpis,
}

/// Alerte opérationnelle classée.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalAlert {
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    /// Nombre d'entités concernées par la règle.
    pub count: i64,
}

// ==========================================
// AlertEngine
// ==========================================
pub struct AlertEngine;

impl AlertEngine {
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // KPI
    // ==========================================

    pub fn compute_kpis(
        &self,
        documents: &[PedagogicalDocument],
        semainiers: &[WeeklySemainier],
        incidents: &[SemainierIncident],
    ) -> DashboardKpis {
        DashboardKpis {
            documents: self.compute_document_kpis(documents),
            semainiers: self.compute_semainier_kpis(semainiers, incidents),
        }
    }

    fn compute_document_kpis(&self, documents: &[PedagogicalDocument]) -> DocumentKpis {
        let mut by_status: BTreeMap<String, i64> = BTreeMap::new();
        let mut by_type: BTreeMap<String, i64> = BTreeMap::new();
        let mut submitted_total = 0i64;
        let mut approved = 0i64;
        let mut rejected = 0i64;

        for doc in documents {
            *by_status.entry(doc.status.code().to_string()).or_insert(0) += 1;
            *by_type.entry(doc.document_type.as_str().to_string()).or_insert(0) += 1;

            if !doc.status.is_draft() {
                submitted_total += 1;
            }
            match &doc.status {
                DocumentStatus::Approved { .. } => approved += 1,
                DocumentStatus::Rejected { .. } => rejected += 1,
                _ => {}
            }
        }

        let total = documents.len() as i64;

        DocumentKpis {
            total,
            by_status,
            by_type,
            submission_rate: ratio(submitted_total, total),
            approval_rate: ratio(approved, submitted_total),
            rejection_rate: ratio(rejected, submitted_total),
        }
    }

    fn compute_semainier_kpis(
        &self,
        semainiers: &[WeeklySemainier],
        incidents: &[SemainierIncident],
    ) -> SemainierKpis {
        let mut by_status: BTreeMap<String, i64> = BTreeMap::new();
        for s in semainiers {
            *by_status.entry(s.status.code().to_string()).or_insert(0) += 1;
        }

        let incident_high_count = incidents
            .iter()
            .filter(|i| i.severity == IncidentSeverity::High)
            .count() as i64;
        let incident_critical_count = incidents
            .iter()
            .filter(|i| i.severity == IncidentSeverity::Critical)
            .count() as i64;

        SemainierKpis {
            total: semainiers.len() as i64,
            by_status,
            incident_total: incidents.len() as i64,
            incident_high_count,
            incident_critical_count,
            incident_rate: ratio(incidents.len() as i64, semainiers.len() as i64),
        }
    }

    // ==========================================
    // Règles d'alerte (évaluées indépendamment)
    // ==========================================

    pub fn generate_alerts(
        &self,
        documents: &[PedagogicalDocument],
        semainiers: &[WeeklySemainier],
        incidents: &[SemainierIncident],
        thresholds: &AlertThresholds,
        today: NaiveDate,
    ) -> Vec<OperationalAlert> {
        let mut alerts = Vec::new();

        if let Some(a) = self.check_submission_delay(documents, thresholds, today) {
            alerts.push(a);
        }
        if let Some(a) = self.check_high_rejection_rate(documents, thresholds) {
            alerts.push(a);
        }
        if let Some(a) = self.check_non_conform_teachers(documents, thresholds) {
            alerts.push(a);
        }
        if let Some(a) = self.check_pedagogical_overload(documents, thresholds) {
            alerts.push(a);
        }
        if let Some(a) = self.check_recurring_incidents(semainiers, incidents, thresholds, today) {
            alerts.push(a);
        }
        if let Some(a) = self.check_overdue_semainiers(semainiers, today) {
            alerts.push(a);
        }
        if let Some(a) = self.check_pending_validation(documents, thresholds, today) {
            alerts.push(a);
        }

        // Tri: le plus urgent d'abord (Critical < High < Medium < Low).
        alerts.sort_by_key(|a| a.severity);
        alerts
    }

    /// Brouillons créés il y a plus de N jours et jamais soumis.
    fn check_submission_delay(
        &self,
        documents: &[PedagogicalDocument],
        thresholds: &AlertThresholds,
        today: NaiveDate,
    ) -> Option<OperationalAlert> {
        let cutoff = today - Duration::days(thresholds.draft_age_days);
        let stale = documents
            .iter()
            .filter(|d| d.status.is_draft() && d.created_at.date() < cutoff)
            .count() as i64;

        if stale == 0 {
            return None;
        }

        Some(OperationalAlert {
            severity: AlertSeverity::Medium,
            category: AlertCategory::SubmissionDelay,
            title: "Brouillons en retard de soumission".to_string(),
            description: format!(
                "{} document(s) en brouillon depuis plus de {} jours",
                stale, thresholds.draft_age_days
            ),
            recommendation: "Relancer les enseignants concernés pour soumission".to_string(),
            count: stale,
        })
    }

    /// Taux de rejet global au-delà du seuil.
    fn check_high_rejection_rate(
        &self,
        documents: &[PedagogicalDocument],
        thresholds: &AlertThresholds,
    ) -> Option<OperationalAlert> {
        let mut submitted = 0i64;
        let mut approved = 0i64;
        let mut rejected = 0i64;

        for doc in documents {
            match &doc.status {
                DocumentStatus::Submitted { .. } => submitted += 1,
                DocumentStatus::Approved { .. } => approved += 1,
                DocumentStatus::Rejected { .. } => rejected += 1,
                _ => {}
            }
        }

        let denominator = submitted + approved + rejected;
        if denominator == 0 {
            return None;
        }

        let rate = rejected as f64 / denominator as f64;
        if rate <= thresholds.rejection_rate {
            return None;
        }

        Some(OperationalAlert {
            severity: AlertSeverity::High,
            category: AlertCategory::HighRejectionRate,
            title: "Taux de rejet élevé".to_string(),
            description: format!(
                "{:.0}% des documents traités sont rejetés (seuil {:.0}%)",
                rate * 100.0,
                thresholds.rejection_rate * 100.0
            ),
            recommendation: "Analyser les motifs de rejet et accompagner les équipes".to_string(),
            count: rejected,
        })
    }

    /// Enseignants dont plus de la moitié des documents décidés sont rejetés.
    fn check_non_conform_teachers(
        &self,
        documents: &[PedagogicalDocument],
        thresholds: &AlertThresholds,
    ) -> Option<OperationalAlert> {
        // teacher_id -> (approuvés, rejetés)
        let mut per_teacher: HashMap<&str, (i64, i64)> = HashMap::new();

        for doc in documents {
            let entry = per_teacher.entry(doc.teacher_id.as_str()).or_insert((0, 0));
            match &doc.status {
                DocumentStatus::Approved { .. } => entry.0 += 1,
                DocumentStatus::Rejected { .. } => entry.1 += 1,
                _ => {}
            }
        }

        let non_conform = per_teacher
            .values()
            .filter(|(approved, rejected)| {
                let decided = approved + rejected;
                *rejected >= 1
                    && decided > 0
                    && (*rejected as f64 / decided as f64) > thresholds.teacher_rejection_rate
            })
            .count() as i64;

        if non_conform == 0 {
            return None;
        }

        Some(OperationalAlert {
            severity: AlertSeverity::High,
            category: AlertCategory::NonConformTeachers,
            title: "Enseignants en difficulté de conformité".to_string(),
            description: format!(
                "{} enseignant(s) avec plus de {:.0}% de documents rejetés",
                non_conform,
                thresholds.teacher_rejection_rate * 100.0
            ),
            recommendation: "Prévoir un accompagnement pédagogique individualisé".to_string(),
            count: non_conform,
        })
    }

    /// Enseignants dépassant le volume documentaire de référence.
    fn check_pedagogical_overload(
        &self,
        documents: &[PedagogicalDocument],
        thresholds: &AlertThresholds,
    ) -> Option<OperationalAlert> {
        let mut per_teacher: HashMap<&str, i64> = HashMap::new();
        for doc in documents {
            *per_teacher.entry(doc.teacher_id.as_str()).or_insert(0) += 1;
        }

        let overloaded = per_teacher
            .values()
            .filter(|&&count| count > thresholds.overload_document_count)
            .count() as i64;

        if overloaded == 0 {
            return None;
        }

        Some(OperationalAlert {
            severity: AlertSeverity::Medium,
            category: AlertCategory::PedagogicalOverload,
            title: "Surcharge documentaire".to_string(),
            description: format!(
                "{} enseignant(s) avec plus de {} documents sur la période",
                overloaded, thresholds.overload_document_count
            ),
            recommendation: "Vérifier la répartition des classes et des matières".to_string(),
            count: overloaded,
        })
    }

    /// Types d'incident récurrents sur les semaines récentes.
    fn check_recurring_incidents(
        &self,
        semainiers: &[WeeklySemainier],
        incidents: &[SemainierIncident],
        thresholds: &AlertThresholds,
        today: NaiveDate,
    ) -> Option<OperationalAlert> {
        let cutoff = today - Duration::days(thresholds.recurring_window_days);

        let recent_semainiers: std::collections::HashSet<&str> = semainiers
            .iter()
            .filter(|s| s.week_start_date >= cutoff)
            .map(|s| s.semainier_id.as_str())
            .collect();

        let mut per_type: HashMap<&str, i64> = HashMap::new();
        for incident in incidents {
            if recent_semainiers.contains(incident.semainier_id.as_str()) {
                *per_type.entry(incident.incident_type.as_str()).or_insert(0) += 1;
            }
        }

        let recurring: Vec<(&str, i64)> = per_type
            .into_iter()
            .filter(|(_, count)| *count >= thresholds.recurring_incident_count)
            .collect();

        if recurring.is_empty() {
            return None;
        }

        let mut types: Vec<&str> = recurring.iter().map(|(t, _)| *t).collect();
        types.sort_unstable();

        Some(OperationalAlert {
            severity: AlertSeverity::Medium,
            category: AlertCategory::RecurringIncidents,
            title: "Incidents récurrents".to_string(),
            description: format!(
                "Type(s) d'incident signalé(s) au moins {} fois sur {} jours: {}",
                thresholds.recurring_incident_count,
                thresholds.recurring_window_days,
                types.join(", ")
            ),
            recommendation: "Déclencher une analyse de cause avec l'équipe QHSE".to_string(),
            count: recurring.len() as i64,
        })
    }

    /// Cahiers encore EN_COURS après la fin de leur semaine.
    fn check_overdue_semainiers(
        &self,
        semainiers: &[WeeklySemainier],
        today: NaiveDate,
    ) -> Option<OperationalAlert> {
        let overdue = semainiers
            .iter()
            .filter(|s| s.status.is_en_cours() && s.week_end_date < today)
            .count() as i64;

        if overdue == 0 {
            return None;
        }

        Some(OperationalAlert {
            severity: AlertSeverity::Low,
            category: AlertCategory::OverdueSemainier,
            title: "Semainiers non soumis".to_string(),
            description: format!("{} cahier(s) de semaine échue encore en cours", overdue),
            recommendation: "Rappeler la clôture hebdomadaire aux semainiers".to_string(),
            count: overdue,
        })
    }

    /// Soumissions sans décision depuis plus de N jours.
    fn check_pending_validation(
        &self,
        documents: &[PedagogicalDocument],
        thresholds: &AlertThresholds,
        today: NaiveDate,
    ) -> Option<OperationalAlert> {
        let cutoff = today - Duration::days(thresholds.pending_validation_days);
        let pending = documents
            .iter()
            .filter(|d| match &d.status {
                DocumentStatus::Submitted { submitted_at } => submitted_at.date() < cutoff,
                _ => false,
            })
            .count() as i64;

        if pending == 0 {
            return None;
        }

        Some(OperationalAlert {
            severity: AlertSeverity::High,
            category: AlertCategory::PendingValidation,
            title: "Validations en attente".to_string(),
            description: format!(
                "{} document(s) soumis depuis plus de {} jours sans décision",
                pending, thresholds.pending_validation_days
            ),
            recommendation: "Planifier une session de revue avec la direction".to_string(),
            count: pending,
        })
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::teacher::SchoolScope;
    use crate::domain::types::DocumentType;
    use chrono::Utc;

    fn doc(teacher_id: &str, status: DocumentStatus) -> PedagogicalDocument {
        PedagogicalDocument {
            document_id: uuid::Uuid::new_v4().to_string(),
            scope: SchoolScope::new("org", "2025-2026", "COLLEGE"),
            teacher_id: teacher_id.to_string(),
            class_id: None,
            subject_id: None,
            document_type: DocumentType::FichePedagogique,
            status,
            title: "Fiche".to_string(),
            description: None,
            content: String::new(),
            week_start_date: None,
            week_end_date: None,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    fn rejected(teacher_id: &str) -> PedagogicalDocument {
        doc(
            teacher_id,
            DocumentStatus::Rejected {
                validated_by: "dir".into(),
                validated_at: Utc::now().naive_utc(),
                reason: "incomplet".into(),
            },
        )
    }

    fn approved(teacher_id: &str) -> PedagogicalDocument {
        doc(
            teacher_id,
            DocumentStatus::Approved {
                validated_by: "dir".into(),
                validated_at: Utc::now().naive_utc(),
            },
        )
    }

    #[test]
    fn test_rejection_rate_threshold_boundary() {
        let engine = AlertEngine::new();
        let thresholds = AlertThresholds::default();
        let today = Utc::now().date_naive();

        // 2 rejets sur 4 traités: 50% > 30% -> alerte présente.
        let docs = vec![rejected("a"), rejected("b"), approved("c"), approved("d")];
        let alerts = engine.generate_alerts(&docs, &[], &[], &thresholds, today);
        assert!(alerts
            .iter()
            .any(|a| a.category == AlertCategory::HighRejectionRate));

        // 1 rejet sur 4: 25% <= 30% -> pas d'alerte.
        let docs = vec![rejected("a"), approved("b"), approved("c"), approved("d")];
        let alerts = engine.generate_alerts(&docs, &[], &[], &thresholds, today);
        assert!(!alerts
            .iter()
            .any(|a| a.category == AlertCategory::HighRejectionRate));
    }

    #[test]
    fn test_empty_scope_produces_no_alerts() {
        let engine = AlertEngine::new();
        let alerts = engine.generate_alerts(
            &[],
            &[],
            &[],
            &AlertThresholds::default(),
            Utc::now().date_naive(),
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_alerts_sorted_most_urgent_first() {
        let engine = AlertEngine::new();
        let thresholds = AlertThresholds::default();
        let today = Utc::now().date_naive();

        // Déclenche HIGH_REJECTION_RATE (High) et SUBMISSION_DELAY (Medium).
        let old_draft = {
            let mut d = doc("a", DocumentStatus::Draft);
            d.created_at = (Utc::now() - Duration::days(10)).naive_utc();
            d
        };
        let docs = vec![old_draft, rejected("b"), rejected("c"), approved("d")];

        let alerts = engine.generate_alerts(&docs, &[], &[], &thresholds, today);
        assert!(alerts.len() >= 2);
        for pair in alerts.windows(2) {
            assert!(pair[0].severity <= pair[1].severity);
        }
        assert_eq!(alerts[0].severity, AlertSeverity::High);
    }

    #[test]
    fn test_kpi_rates_on_empty_input() {
        let engine = AlertEngine::new();
        let kpis = engine.compute_kpis(&[], &[], &[]);
        assert_eq!(kpis.documents.total, 0);
        assert_eq!(kpis.documents.rejection_rate, 0.0);
        assert_eq!(kpis.semainiers.incident_rate, 0.0);
    }
}
