// ==========================================
// Indicateurs et alertes - tests d'intégration
// ==========================================
// Les règles sont évaluées sur les données d'un établissement avec
// une date du jour injectée, et les seuils sont relus depuis
// config_kv à chaque appel.
// ==========================================


use chrono::NaiveDate;
use scolaris::api::{CreateDocumentRequest, Services};
use scolaris::config::AlertThresholds;
use scolaris::domain::types::{AlertCategory, AlertSeverity, DocumentType};
use test_helpers::{create_test_db, seed_director, seed_teacher, test_scope};

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn fiche(title: &str) -> CreateDocumentRequest {
    CreateDocumentRequest {
        document_type: DocumentType::FichePedagogique,
        title: title.to_string(),
        description: None,
        content: "contenu".to_string(),
        class_id: None,
        subject_id: None,
        week_start_date: None,
        week_end_date: None,
    }
}

#[test]
fn test_empty_scope_yields_zero_kpis_and_no_alerts() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn);
    let scope = test_scope();

    let kpis = services.alerts.get_kpis(&scope.org_id, None).unwrap();
    assert_eq!(kpis.documents.total, 0);
    assert_eq!(kpis.documents.submission_rate, 0.0);
    assert_eq!(kpis.semainiers.total, 0);

    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 15))
        .unwrap();
    assert!(alerts.is_empty());
}

#[tokio::test]
async fn test_high_rejection_rate_alert_fires_above_threshold() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    // 1 rejeté sur 2 traités: 50% > seuil par défaut de 30%.
    let ok = services.documents.create(&scope, "T1", fiche("Bon")).unwrap();
    services.documents.submit(&ok.document_id, "T1").await.unwrap();
    services.documents.approve(&ok.document_id, "D1", None, None).await.unwrap();

    let ko = services.documents.create(&scope, "T1", fiche("Mauvais")).unwrap();
    services.documents.submit(&ko.document_id, "T1").await.unwrap();
    services
        .documents
        .reject(&ko.document_id, "D1", "Incomplet", None, None)
        .await
        .unwrap();

    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 15))
        .unwrap();
    let rejection = alerts
        .iter()
        .find(|a| a.category == AlertCategory::HighRejectionRate)
        .expect("alerte de taux de rejet attendue");
    assert_eq!(rejection.severity, AlertSeverity::High);
    assert_eq!(rejection.count, 1);

    // Le KPI suit la même lecture.
    let kpis = services.alerts.get_kpis(&scope.org_id, None).unwrap();
    assert!((kpis.documents.rejection_rate - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_thresholds_are_reloaded_from_config() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    let ko = services.documents.create(&scope, "T1", fiche("Mauvais")).unwrap();
    services.documents.submit(&ko.document_id, "T1").await.unwrap();
    services
        .documents
        .reject(&ko.document_id, "D1", "Incomplet", None, None)
        .await
        .unwrap();

    // 100% de rejet: alerte avec le seuil par défaut.
    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 15))
        .unwrap();
    assert!(alerts.iter().any(|a| a.category == AlertCategory::HighRejectionRate));

    // Seuil relevé au-delà de 100%: l'alerte disparaît au prochain appel.
    AlertThresholds::set_value(&conn, "alert.rejection_rate", "1.5").unwrap();
    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 15))
        .unwrap();
    assert!(!alerts.iter().any(|a| a.category == AlertCategory::HighRejectionRate));
}

#[tokio::test]
async fn test_pending_validation_alert_after_five_days() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();

    let doc = services.documents.create(&scope, "T1", fiche("En attente")).unwrap();
    services.documents.submit(&doc.document_id, "T1").await.unwrap();

    // Soumis il y a dix jours.
    conn.lock()
        .unwrap()
        .execute(
            "UPDATE pedagogical_document SET submitted_at = '2026-03-05 08:00:00' WHERE document_id = ?",
            [&doc.document_id],
        )
        .unwrap();

    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 15))
        .unwrap();
    let pending = alerts
        .iter()
        .find(|a| a.category == AlertCategory::PendingValidation)
        .expect("alerte de validation en attente attendue");
    assert_eq!(pending.severity, AlertSeverity::High);
    assert_eq!(pending.count, 1);

    // Évaluée deux jours après la soumission, la règle se tait.
    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 7))
        .unwrap();
    assert!(!alerts.iter().any(|a| a.category == AlertCategory::PendingValidation));
}

#[tokio::test]
async fn test_alerts_sorted_most_urgent_first() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    // HIGH: 100% de rejet.
    let ko = services.documents.create(&scope, "T1", fiche("Mauvais")).unwrap();
    services.documents.submit(&ko.document_id, "T1").await.unwrap();
    services
        .documents
        .reject(&ko.document_id, "D1", "Incomplet", None, None)
        .await
        .unwrap();

    // MEDIUM: brouillon vieux de plus de sept jours.
    let stale = services.documents.create(&scope, "T1", fiche("Oublié")).unwrap();
    conn.lock()
        .unwrap()
        .execute(
            "UPDATE pedagogical_document SET created_at = '2026-03-01 08:00:00' WHERE document_id = ?",
            [&stale.document_id],
        )
        .unwrap();

    // LOW: cahier EN_COURS d'une semaine échue.
    let assignment = services
        .duty
        .assign_auto(&scope, d(2026, 3, 2), d(2026, 3, 6))
        .unwrap();
    services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "T1", "Plan")
        .unwrap();

    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 15))
        .unwrap();
    assert!(alerts.len() >= 3);

    // Classement du plus urgent au moins urgent.
    let severities: Vec<AlertSeverity> = alerts.iter().map(|a| a.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort();
    assert_eq!(severities, sorted);
    assert_eq!(alerts.first().unwrap().severity, AlertSeverity::High);
    assert_eq!(alerts.last().unwrap().severity, AlertSeverity::Low);
}

#[tokio::test]
async fn test_recurring_incident_alert_counts_by_type() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();

    let assignment = services
        .duty
        .assign_auto(&scope, d(2026, 3, 2), d(2026, 3, 6))
        .unwrap();
    let semainier = services
        .duty
        .create_or_update_semainier(&assignment.assignment_id, "T1", "Plan")
        .unwrap();

    // Cinq signalements du même type dans la fenêtre de trente jours.
    for day in 2..7 {
        services
            .duty
            .report_incident(
                &semainier.semainier_id,
                d(2026, 3, day),
                "T1",
                scolaris::api::IncidentRequest {
                    incident_type: "RETARD".to_string(),
                    description: None,
                    severity: scolaris::domain::types::IncidentSeverity::Low,
                },
            )
            .unwrap();
    }

    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 15))
        .unwrap();
    let recurring = alerts
        .iter()
        .find(|a| a.category == AlertCategory::RecurringIncidents)
        .expect("alerte d'incidents récurrents attendue");
    assert!(recurring.description.contains("RETARD"));

    // Quatre signalements seulement: sous le seuil, pas d'alerte.
    // (vérifié en retirant un incident)
    conn.lock()
        .unwrap()
        .execute(
            "DELETE FROM semainier_incident WHERE incident_date = '2026-03-02'",
            [],
        )
        .unwrap();
    let alerts = services
        .alerts
        .generate_alerts_at(&scope.org_id, None, d(2026, 3, 15))
        .unwrap();
    assert!(!alerts.iter().any(|a| a.category == AlertCategory::RecurringIncidents));
}
