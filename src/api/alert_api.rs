// ==========================================
// Scolaris - API des indicateurs et alertes
// ==========================================
// Charge les données d'un établissement (année optionnelle) puis
// délègue l'agrégation au moteur pur. Les seuils sont relus dans
// config_kv à chaque appel: un ajustement prend effet sans
// redémarrage. Une portée vide produit des indicateurs à zéro et
// aucune alerte, jamais une erreur.
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use crate::api::error::ApiResult;
use crate::config::AlertThresholds;
use crate::engine::alert::{AlertEngine, DashboardKpis, OperationalAlert};
use crate::repository::document_repo::DocumentRepository;
use crate::repository::duty_repo::SemainierRepository;

pub struct AlertApi {
    document_repo: Arc<DocumentRepository>,
    semainier_repo: Arc<SemainierRepository>,
    conn: Arc<Mutex<Connection>>,
    engine: AlertEngine,
}

impl AlertApi {
    pub fn new(
        document_repo: Arc<DocumentRepository>,
        semainier_repo: Arc<SemainierRepository>,
        conn: Arc<Mutex<Connection>>,
    ) -> Self {
        Self {
            document_repo,
            semainier_repo,
            conn,
            engine: AlertEngine::new(),
        }
    }

    /// Indicateurs du tableau de bord de direction.
    pub fn get_kpis(&self, org_id: &str, academic_year: Option<&str>) -> ApiResult<DashboardKpis> {
        let documents = self.document_repo.list_for_tenant(org_id, academic_year)?;
        let semainiers = self.semainier_repo.list_for_tenant(org_id, academic_year)?;
        let incidents = self
            .semainier_repo
            .list_incidents_for_tenant(org_id, academic_year)?;

        Ok(self.engine.compute_kpis(&documents, &semainiers, &incidents))
    }

    /// Alertes opérationnelles classées de la plus urgente à la moins
    /// urgente, évaluées à la date du jour.
    pub fn generate_alerts(
        &self,
        org_id: &str,
        academic_year: Option<&str>,
    ) -> ApiResult<Vec<OperationalAlert>> {
        self.generate_alerts_at(org_id, academic_year, Utc::now().date_naive())
    }

    /// Variante avec date d'évaluation injectée, pour des règles
    /// temporelles reproductibles.
    pub fn generate_alerts_at(
        &self,
        org_id: &str,
        academic_year: Option<&str>,
        today: NaiveDate,
    ) -> ApiResult<Vec<OperationalAlert>> {
        let documents = self.document_repo.list_for_tenant(org_id, academic_year)?;
        let semainiers = self.semainier_repo.list_for_tenant(org_id, academic_year)?;
        let incidents = self
            .semainier_repo
            .list_incidents_for_tenant(org_id, academic_year)?;

        let thresholds = AlertThresholds::load(&self.conn);

        Ok(self
            .engine
            .generate_alerts(&documents, &semainiers, &incidents, &thresholds, today))
    }
}
