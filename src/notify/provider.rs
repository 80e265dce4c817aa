// ==========================================
// Scolaris - Fournisseurs de livraison
// ==========================================
// Trait unique pour les trois canaux externes (email, SMS, WhatsApp).
// Le coeur ne connaît que send(destination, sujet, corps); les
// implémentations réelles (SMTP, passerelles SMS/WhatsApp) vivent
// hors de ce crate.
// ==========================================

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::notification::DeliveryChannel;

/// Échec de livraison d'un canal. Jamais propagé au-delà du
/// dispatcher: journalisé et traduit en drapeau non envoyé.
#[derive(Error, Debug)]
#[error("échec de livraison: {0}")]
pub struct DeliveryError(pub String);

/// Contrat d'un canal de diffusion sortant.
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// Nom du canal (journalisation).
    fn name(&self) -> &str;

    /// Tente une livraison. Le sujet n'a de sens que pour l'email.
    async fn send(
        &self,
        destination: &str,
        subject: Option<&str>,
        body: &str,
    ) -> Result<(), DeliveryError>;
}

// ==========================================
// LogOnlyProvider - câblage par défaut
// ==========================================
// Trace la livraison sans rien envoyer. Utilisé au démarrage tant
// qu'aucun fournisseur réel n'est configuré.
pub struct LogOnlyProvider {
    channel: DeliveryChannel,
}

impl LogOnlyProvider {
    pub fn new(channel: DeliveryChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl DeliveryProvider for LogOnlyProvider {
    fn name(&self) -> &str {
        self.channel.as_str()
    }

    async fn send(
        &self,
        destination: &str,
        subject: Option<&str>,
        _body: &str,
    ) -> Result<(), DeliveryError> {
        tracing::info!(
            channel = self.channel.as_str(),
            destination,
            subject = subject.unwrap_or(""),
            "livraison simulée (fournisseur journal)"
        );
        Ok(())
    }
}
