// ==========================================
// Rotation des semainiers - tests d'intégration
// ==========================================
// Rotation automatique déterministe, dérogation manuelle avec piste
// d'audit, puis cycle de vie du cahier EN_COURS -> SOUMIS -> VALIDATED.
// ==========================================


use chrono::NaiveDate;
use scolaris::api::{ApiError, DailyEntryRequest, IncidentRequest, Services};
use scolaris::domain::duty::SemainierStatus;
use scolaris::domain::types::{AssignmentMode, IncidentSeverity};
use test_helpers::{create_test_db, seed_director, seed_teacher, test_scope};

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Semaine scolaire du lundi au vendredi.
fn week(start: NaiveDate) -> (NaiveDate, NaiveDate) {
    (start, start + chrono::Duration::days(4))
}

#[test]
fn test_auto_rotation_is_deterministic_round_robin() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_teacher(&conn, &scope, "T2", "Moussa Koné").unwrap();
    seed_teacher(&conn, &scope, "T3", "Fatou Traoré").unwrap();

    let mut assigned = Vec::new();
    for start in [
        d(2026, 3, 2),
        d(2026, 3, 9),
        d(2026, 3, 16),
        d(2026, 3, 23),
    ] {
        let (ws, we) = week(start);
        let a = services.duty.assign_auto(&scope, ws, we).unwrap();
        assert_eq!(a.assignment_mode, AssignmentMode::Auto);
        assert!(a.is_active);
        assigned.push(a.teacher_id);
    }

    // Ordre d'insertion dans l'annuaire, puis retour au début.
    assert_eq!(assigned, vec!["T1", "T2", "T3", "T1"]);
}

#[test]
fn test_auto_rotation_conflicts_on_duplicate_week() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();

    let (ws, we) = week(d(2026, 3, 2));
    services.duty.assign_auto(&scope, ws, we).unwrap();

    let err = services.duty.assign_auto(&scope, ws, we).unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[test]
fn test_auto_rotation_requires_active_teachers() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();

    let (ws, we) = week(d(2026, 3, 2));
    let err = services.duty.assign_auto(&scope, ws, we).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_manual_override_shifts_rotation_continuity() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_teacher(&conn, &scope, "T2", "Moussa Koné").unwrap();

    // Semaine 1 en auto: T1.
    let (w1s, w1e) = week(d(2026, 3, 2));
    let first = services.duty.assign_auto(&scope, w1s, w1e).unwrap();
    assert_eq!(first.teacher_id, "T1");

    // Semaine 2 imposée à T1 par la direction.
    let (w2s, w2e) = week(d(2026, 3, 9));
    let manual = services
        .duty
        .assign_manual(&scope, w2s, w2e, "T1", "D1", None)
        .unwrap();
    assert_eq!(manual.assignment_mode, AssignmentMode::Manual);
    assert_eq!(manual.assigned_by.as_deref(), Some("D1"));
    assert!(manual.reason.is_some());

    // La rotation reprend APRÈS la dérogation: T1 vient de servir,
    // la semaine 3 revient donc à T2.
    let (w3s, w3e) = week(d(2026, 3, 16));
    let third = services.duty.assign_auto(&scope, w3s, w3e).unwrap();
    assert_eq!(third.teacher_id, "T2");
}

#[test]
fn test_manual_override_deactivates_previous_record() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_teacher(&conn, &scope, "T2", "Moussa Koné").unwrap();

    let (ws, we) = week(d(2026, 3, 2));
    services.duty.assign_auto(&scope, ws, we).unwrap();
    let manual = services
        .duty
        .assign_manual(&scope, ws, we, "T2", "D1", Some("Remplacement".to_string()))
        .unwrap();

    // L'ancienne affectation est conservée mais inactive: une seule
    // affectation active par semaine.
    let current = services
        .duty
        .get_current_at(&scope, "T2", ws)
        .unwrap()
        .expect("affectation active attendue");
    assert_eq!(current.0.assignment_id, manual.assignment_id);
    assert!(services.duty.get_current_at(&scope, "T1", ws).unwrap().is_none());

    let guard = conn.lock().unwrap();
    let active: i64 = guard
        .query_row(
            "SELECT COUNT(*) FROM weekly_duty_assignment WHERE week_start_date = ? AND is_active = 1",
            [ws.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )
        .unwrap();
    let total: i64 = guard
        .query_row(
            "SELECT COUNT(*) FROM weekly_duty_assignment WHERE week_start_date = ?",
            [ws.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(active, 1);
    assert_eq!(total, 2);
}

#[test]
fn test_rotation_restarts_when_last_assignee_departs() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_teacher(&conn, &scope, "T2", "Moussa Koné").unwrap();
    seed_teacher(&conn, &scope, "T3", "Fatou Traoré").unwrap();

    let (w1s, w1e) = week(d(2026, 3, 2));
    let first = services.duty.assign_auto(&scope, w1s, w1e).unwrap();
    assert_eq!(first.teacher_id, "T1");

    // T1 quitte l'établissement: la rotation repart de l'index 0,
    // c'est-à-dire T2 (premier actif restant).
    conn.lock()
        .unwrap()
        .execute(
            "UPDATE teacher_directory SET status = 'inactive' WHERE teacher_id = 'T1'",
            [],
        )
        .unwrap();

    let (w2s, w2e) = week(d(2026, 3, 9));
    let second = services.duty.assign_auto(&scope, w2s, w2e).unwrap();
    assert_eq!(second.teacher_id, "T2");
}

#[tokio::test]
async fn test_semainier_full_lifecycle() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    let (ws, we) = week(d(2026, 3, 2));
    let assignment = services.duty.assign_auto(&scope, ws, we).unwrap();

    // Seul le titulaire de l'affectation ouvre le cahier.
    let err = services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "D1", "plan")
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let semainier = services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "T1", "Plan de la semaine")
        .unwrap();
    assert_eq!(semainier.status, SemainierStatus::EnCours);
    assert_eq!(semainier.week_start_date, ws);
    assert_eq!(semainier.week_end_date, we);

    // Réécriture du contenu tant que le cahier est EN_COURS.
    let updated = services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "T1", "Plan ajusté")
        .unwrap();
    assert_eq!(updated.semainier_id, semainier.semainier_id);
    assert_eq!(updated.content, "Plan ajusté");

    let submitted = services
        .duty
        .submit_semainier(&semainier.semainier_id, "T1")
        .await
        .unwrap();
    assert!(submitted.status.is_soumis());

    // Plus de réécriture après soumission.
    let err = services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "T1", "tard")
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState { .. }));

    let queue = services.duty.list_submitted(&scope).unwrap();
    assert_eq!(queue.len(), 1);

    let validated = services
        .duty
        .validate_semainier(&semainier.semainier_id, "D1")
        .await
        .unwrap();
    assert!(matches!(
        validated.status,
        SemainierStatus::Validated { ref validated_by, .. } if validated_by == "D1"
    ));

    // Une seconde validation ne trouve plus rien à valider.
    let err = services
        .duty
        .validate_semainier(&semainier.semainier_id, "D1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_daily_entry_bounds_and_idempotence() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();

    let (ws, we) = week(d(2026, 3, 2));
    let assignment = services.duty.assign_auto(&scope, ws, we).unwrap();
    let semainier = services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "T1", "Plan")
        .unwrap();

    // Hors de la fenêtre hebdomadaire: refus.
    let err = services
        .duty
        .add_daily_entry(
            &semainier.semainier_id,
            d(2026, 3, 9),
            DailyEntryRequest::default(),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    // Deux écritures sur la même date: une seule ligne, la seconde gagne.
    let tuesday = d(2026, 3, 3);
    services
        .duty
        .add_daily_entry(
            &semainier.semainier_id,
            tuesday,
            DailyEntryRequest {
                observations: Some("RAS".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    services
        .duty
        .add_daily_entry(
            &semainier.semainier_id,
            tuesday,
            DailyEntryRequest {
                observations: Some("Deux absences en 6e A".to_string()),
                actions: Some("Familles prévenues".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let entries = services.duty.list_entries(&semainier.semainier_id).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].observations.as_deref(), Some("Deux absences en 6e A"));
    assert_eq!(entries[0].actions.as_deref(), Some("Familles prévenues"));
}

#[tokio::test]
async fn test_incident_reporting_is_status_agnostic_and_escalates() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    let (ws, we) = week(d(2026, 3, 2));
    let assignment = services.duty.assign_auto(&scope, ws, we).unwrap();
    let semainier = services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "T1", "Plan")
        .unwrap();

    let minor = services
        .duty
        .report_incident(
            &semainier.semainier_id,
            d(2026, 3, 3),
            "T1",
            IncidentRequest {
                incident_type: "RETARD".to_string(),
                description: None,
                severity: IncidentSeverity::Low,
            },
        )
        .unwrap();
    assert!(!minor.escalated_to_qhse);

    services
        .duty
        .submit_semainier(&semainier.semainier_id, "T1")
        .await
        .unwrap();

    // L'incident découvert après soumission reste déclarable, et la
    // gravité haute escalade automatiquement.
    let severe = services
        .duty
        .report_incident(
            &semainier.semainier_id,
            d(2026, 3, 5),
            "T1",
            IncidentRequest {
                incident_type: "BAGARRE".to_string(),
                description: Some("Intervention de la vie scolaire".to_string()),
                severity: IncidentSeverity::High,
            },
        )
        .unwrap();
    assert!(severe.escalated_to_qhse);

    let incidents = services.duty.list_incidents(&semainier.semainier_id).unwrap();
    assert_eq!(incidents.len(), 2);
}

#[test]
fn test_get_current_matches_week_window() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();

    let (ws, we) = week(d(2026, 3, 2));
    let assignment = services.duty.assign_auto(&scope, ws, we).unwrap();
    let semainier = services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "T1", "Plan")
        .unwrap();

    // Jour dans la fenêtre: affectation et cahier retrouvés.
    let current = services
        .duty
        .get_current_at(&scope, "T1", d(2026, 3, 4))
        .unwrap()
        .expect("affectation attendue");
    assert_eq!(current.0.assignment_id, assignment.assignment_id);
    assert_eq!(
        current.1.as_ref().map(|s| s.semainier_id.as_str()),
        Some(semainier.semainier_id.as_str())
    );

    // Jour hors fenêtre: rien.
    assert!(services
        .duty
        .get_current_at(&scope, "T1", d(2026, 3, 9))
        .unwrap()
        .is_none());
}
