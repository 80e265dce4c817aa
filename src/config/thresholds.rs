// ==========================================
// Scolaris - Seuils du moteur d'alertes
// ==========================================
// Valeurs chargées depuis config_kv (portée globale), avec défauts
// intégrés: l'absence de configuration ne bloque jamais l'agrégation.
// ==========================================

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Seuils des règles d'alerte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// SUBMISSION_DELAY: âge (jours) d'un brouillon jamais soumis.
    pub draft_age_days: i64,
    /// HIGH_REJECTION_RATE: taux de rejet global (ratio).
    pub rejection_rate: f64,
    /// NON_CONFORM_TEACHERS: taux de rejet par enseignant (ratio).
    pub teacher_rejection_rate: f64,
    /// PEDAGOGICAL_OVERLOAD: nombre de documents au-delà duquel un
    /// enseignant est considéré en surcharge.
    pub overload_document_count: i64,
    /// RECURRING_INCIDENTS: occurrences d'un même type d'incident.
    pub recurring_incident_count: i64,
    /// RECURRING_INCIDENTS: fenêtre d'observation (jours).
    pub recurring_window_days: i64,
    /// PENDING_VALIDATION: ancienneté (jours) d'une soumission sans décision.
    pub pending_validation_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            draft_age_days: 7,
            rejection_rate: 0.30,
            teacher_rejection_rate: 0.50,
            overload_document_count: 20,
            recurring_incident_count: 5,
            recurring_window_days: 30,
            pending_validation_days: 5,
        }
    }
}

impl AlertThresholds {
    /// Charge les seuils depuis config_kv; chaque clé absente ou
    /// illisible garde sa valeur par défaut.
    pub fn load(conn: &Arc<Mutex<Connection>>) -> Self {
        let mut thresholds = Self::default();

        let guard = match conn.lock() {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!("verrou config indisponible, seuils par défaut: {}", e);
                return thresholds;
            }
        };

        let read = |key: &str| -> Option<String> {
            guard
                .query_row(
                    "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .ok()
        };

        if let Some(v) = read("alert.draft_age_days").and_then(|s| s.parse().ok()) {
            thresholds.draft_age_days = v;
        }
        if let Some(v) = read("alert.rejection_rate").and_then(|s| s.parse().ok()) {
            thresholds.rejection_rate = v;
        }
        if let Some(v) = read("alert.teacher_rejection_rate").and_then(|s| s.parse().ok()) {
            thresholds.teacher_rejection_rate = v;
        }
        if let Some(v) = read("alert.overload_document_count").and_then(|s| s.parse().ok()) {
            thresholds.overload_document_count = v;
        }
        if let Some(v) = read("alert.recurring_incident_count").and_then(|s| s.parse().ok()) {
            thresholds.recurring_incident_count = v;
        }
        if let Some(v) = read("alert.recurring_window_days").and_then(|s| s.parse().ok()) {
            thresholds.recurring_window_days = v;
        }
        if let Some(v) = read("alert.pending_validation_days").and_then(|s| s.parse().ok()) {
            thresholds.pending_validation_days = v;
        }

        thresholds
    }

    /// Persiste une valeur de seuil (outillage d'administration).
    pub fn set_value(
        conn: &Arc<Mutex<Connection>>,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let guard = conn.lock().map_err(|e| format!("verrou config: {}", e))?;
        guard.execute(
            r#"INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
               ON CONFLICT (scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = datetime('now')"#,
            params![key, value],
        )?;
        Ok(())
    }
}
