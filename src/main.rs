// ==========================================
// Scolaris - Point d'entrée
// ==========================================
// Service cœur sans interface: initialise la journalisation, ouvre la
// base et prépare le schéma. La couche transport (HTTP, commandes)
// est branchée au-dessus de api::Services.
// ==========================================

use std::sync::{Arc, Mutex};

use anyhow::Context;

use scolaris::api::Services;
use scolaris::db;
use scolaris::logging;

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - suivi pédagogique d'établissement", scolaris::APP_NAME);
    tracing::info!("version: {}", scolaris::VERSION);
    tracing::info!("==================================================");

    let db_path = db::default_db_path();
    tracing::info!("base de données: {}", db_path);

    let conn = db::open_sqlite_connection(&db_path)
        .with_context(|| format!("ouverture de la base {}", db_path))?;
    db::init_schema(&conn).context("initialisation du schéma")?;

    match db::read_schema_version(&conn).context("lecture de la version du schéma")? {
        Some(version) if version == db::CURRENT_SCHEMA_VERSION => {
            tracing::info!("schéma à jour (version {})", version);
        }
        Some(version) => {
            tracing::warn!(
                "version de schéma inattendue: {} (attendue {})",
                version,
                db::CURRENT_SCHEMA_VERSION
            );
        }
        None => {
            tracing::warn!("version de schéma absente");
        }
    }

    let _services = Services::new(Arc::new(Mutex::new(conn)));
    tracing::info!("services initialisés, prêt");

    Ok(())
}
