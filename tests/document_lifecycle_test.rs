// ==========================================
// Cycle de vie documentaire - tests d'intégration
// ==========================================
// DRAFT -> SUBMITTED -> APPROVED / REJECTED / ACKNOWLEDGED, avec
// versionnage, motif de rejet obligatoire et garde de propriété sur
// les commentaires.
// ==========================================


use scolaris::api::{ApiError, CreateDocumentRequest, Services, UpdateDocumentRequest};
use scolaris::domain::document::DocumentStatus;
use scolaris::domain::types::{DocumentType, ReviewDecision, Role};
use test_helpers::{create_test_db, seed_director, seed_teacher, test_scope};

fn fiche_request(title: &str) -> CreateDocumentRequest {
    CreateDocumentRequest {
        document_type: DocumentType::FichePedagogique,
        title: title.to_string(),
        description: Some("Séance de géométrie".to_string()),
        content: "v1".to_string(),
        class_id: Some("6EME-A".to_string()),
        subject_id: Some("MATH".to_string()),
        week_start_date: None,
        week_end_date: None,
    }
}

#[test]
fn test_create_requires_teacher_in_scope() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();

    let err = services
        .documents
        .create(&scope, "T-INCONNU", fiche_request("Fiche"))
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    let doc = services
        .documents
        .create(&scope, "T1", fiche_request("Fiche"))
        .unwrap();
    assert!(matches!(doc.status, DocumentStatus::Draft));
}

#[test]
fn test_update_snapshots_pre_change_content() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();

    let doc = services
        .documents
        .create(&scope, "T1", fiche_request("Fiche"))
        .unwrap();

    // Deux mises à jour de contenu: deux versions figées AVANT chaque
    // modification, numérotées 1 puis 2.
    for new_content in ["v2", "v3"] {
        services
            .documents
            .update(
                &doc.document_id,
                "T1",
                UpdateDocumentRequest {
                    content: Some(new_content.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let versions = services.documents.get_versions(&doc.document_id).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version_number, 1);
    assert_eq!(versions[0].content, "v1");
    assert_eq!(versions[1].version_number, 2);
    assert_eq!(versions[1].content, "v2");

    // Une mise à jour sans changement de contenu ne crée pas de version.
    services
        .documents
        .update(
            &doc.document_id,
            "T1",
            UpdateDocumentRequest {
                title: Some("Fiche revue".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(services.documents.get_versions(&doc.document_id).unwrap().len(), 2);
}

#[test]
fn test_rejected_patch_leaves_no_version_row() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();

    let doc = services
        .documents
        .create(&scope, "T1", fiche_request("Fiche"))
        .unwrap();

    // Patch combinant un titre blanc et un changement de contenu:
    // refusé avant toute écriture, donc aucune version créée et le
    // document inchangé.
    let err = services
        .documents
        .update(
            &doc.document_id,
            "T1",
            UpdateDocumentRequest {
                title: Some("   ".to_string()),
                content: Some("v2".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(services.documents.get_versions(&doc.document_id).unwrap().is_empty());

    let unchanged = services.documents.get(&doc.document_id).unwrap();
    assert_eq!(unchanged.title, "Fiche");
    assert_eq!(unchanged.content, "v1");
}

#[tokio::test]
async fn test_submit_then_approve_full_path() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    let doc = services
        .documents
        .create(&scope, "T1", fiche_request("Fiche"))
        .unwrap();

    let submitted = services.documents.submit(&doc.document_id, "T1").await.unwrap();
    assert!(submitted.status.is_submitted());

    // La soumission fige le contenu courant.
    let versions = services.documents.get_versions(&doc.document_id).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].content, "v1");

    // Un document soumis n'est plus modifiable par l'enseignant.
    let err = services
        .documents
        .update(
            &doc.document_id,
            "T1",
            UpdateDocumentRequest {
                content: Some("triche".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState { .. }));

    let approved = services
        .documents
        .approve(&doc.document_id, "D1", Some("Conforme".to_string()), None)
        .await
        .unwrap();
    assert!(matches!(approved.status, DocumentStatus::Approved { ref validated_by, .. } if validated_by == "D1"));

    let reviews = services.documents.get_reviews(&doc.document_id).unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].decision, ReviewDecision::Approved);

    // APPROVED est terminal.
    let err = services
        .documents
        .reject(&doc.document_id, "D1", "trop tard", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState { .. }));
}

#[tokio::test]
async fn test_reject_requires_non_blank_reason() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    let doc = services
        .documents
        .create(&scope, "T1", fiche_request("Fiche"))
        .unwrap();
    services.documents.submit(&doc.document_id, "T1").await.unwrap();

    // Motif blanc refusé avant toute écriture: le document reste SOUMIS.
    let err = services
        .documents
        .reject(&doc.document_id, "D1", "   ", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(services.documents.get(&doc.document_id).unwrap().status.is_submitted());
    assert!(services.documents.get_reviews(&doc.document_id).unwrap().is_empty());

    let rejected = services
        .documents
        .reject(&doc.document_id, "D1", "Objectifs absents", None, None)
        .await
        .unwrap();
    match rejected.status {
        DocumentStatus::Rejected { ref reason, .. } => assert_eq!(reason, "Objectifs absents"),
        other => panic!("statut inattendu: {:?}", other),
    }
}

#[tokio::test]
async fn test_acknowledge_only_for_cahier_texte() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    // Une fiche pédagogique ne se fait pas viser.
    let fiche = services
        .documents
        .create(&scope, "T1", fiche_request("Fiche"))
        .unwrap();
    services.documents.submit(&fiche.document_id, "T1").await.unwrap();
    let err = services
        .documents
        .acknowledge(&fiche.document_id, "D1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    // Le cahier de textes, si: visa + commentaire optionnel.
    let mut request = fiche_request("Cahier de textes");
    request.document_type = DocumentType::CahierTexte;
    let cahier = services.documents.create(&scope, "T1", request).unwrap();
    services.documents.submit(&cahier.document_id, "T1").await.unwrap();

    let acknowledged = services
        .documents
        .acknowledge(&cahier.document_id, "D1", Some("Vu".to_string()))
        .await
        .unwrap();
    assert!(matches!(acknowledged.status, DocumentStatus::Acknowledged { .. }));

    let comments = services.documents.get_comments(&cahier.document_id).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content, "Vu");
    assert_eq!(comments[0].author_role, Role::Director);
}

#[tokio::test]
async fn test_comment_ownership_guard() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_teacher(&conn, &scope, "T2", "Moussa Koné").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    let doc = services
        .documents
        .create(&scope, "T1", fiche_request("Fiche"))
        .unwrap();

    // Un enseignant ne commente que ses propres documents.
    let err = services
        .documents
        .add_comment(&doc.document_id, "T2", Role::Teacher, "Intéressant", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    // Le propriétaire et la direction, eux, commentent librement,
    // quel que soit le statut.
    services
        .documents
        .add_comment(&doc.document_id, "T1", Role::Teacher, "Note perso", None)
        .await
        .unwrap();
    services
        .documents
        .add_comment(&doc.document_id, "D1", Role::Director, "À étoffer", Some("objectifs".to_string()))
        .await
        .unwrap();

    assert_eq!(services.documents.get_comments(&doc.document_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_only_in_draft() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();

    let draft = services
        .documents
        .create(&scope, "T1", fiche_request("Brouillon"))
        .unwrap();
    services.documents.delete(&draft.document_id, "T1").unwrap();
    assert!(matches!(
        services.documents.get(&draft.document_id).unwrap_err(),
        ApiError::NotFound(_)
    ));

    let submitted = services
        .documents
        .create(&scope, "T1", fiche_request("Soumis"))
        .unwrap();
    services.documents.submit(&submitted.document_id, "T1").await.unwrap();
    let err = services
        .documents
        .delete(&submitted.document_id, "T1")
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState { .. }));
}

#[tokio::test]
async fn test_stats_rates_over_submitted_documents() {
    let (_tmp, conn) = create_test_db().unwrap();
    let services = Services::new(conn.clone());
    let scope = test_scope();
    seed_teacher(&conn, &scope, "T1", "Awa Diabaté").unwrap();
    seed_director(&conn, &scope, "D1", "Mme la Directrice").unwrap();

    // 4 documents: 1 brouillon, 1 soumis, 1 approuvé, 1 rejeté.
    services.documents.create(&scope, "T1", fiche_request("Brouillon")).unwrap();

    let pending = services.documents.create(&scope, "T1", fiche_request("En attente")).unwrap();
    services.documents.submit(&pending.document_id, "T1").await.unwrap();

    let ok = services.documents.create(&scope, "T1", fiche_request("Bon")).unwrap();
    services.documents.submit(&ok.document_id, "T1").await.unwrap();
    services.documents.approve(&ok.document_id, "D1", None, None).await.unwrap();

    let ko = services.documents.create(&scope, "T1", fiche_request("Mauvais")).unwrap();
    services.documents.submit(&ko.document_id, "T1").await.unwrap();
    services
        .documents
        .reject(&ko.document_id, "D1", "Incomplet", None, None)
        .await
        .unwrap();

    let stats = services.documents.get_stats(&scope).unwrap();
    assert_eq!(stats.total, 4);
    // 3 documents sortis du brouillon sur 4.
    assert!((stats.submission_rate - 0.75).abs() < 1e-9);
    // 1 approuvé et 1 rejeté sur 3 soumis.
    assert!((stats.approval_rate - 1.0 / 3.0).abs() < 1e-9);
    assert!((stats.rejection_rate - 1.0 / 3.0).abs() < 1e-9);
}
