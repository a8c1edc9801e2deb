/**
 * PUBLISHERS - Sorties enfichables pour les enveloppes
 *
 * RÔLE :
 * Ce module définit le contrat commun des sorties (log, http, ...) et le
 * registre qui les tient par nom.
 *
 * FONCTIONNEMENT :
 * - Publisher trait = interface commune : une tentative de livraison par
 *   cycle, au mieux, sans accusé de réception ni retry
 * - PublisherRegistry = catalogue nom -> publisher construit explicitement
 *   au démarrage (pas d'état global)
 * - resolve() filtre la liste de sorties demandée : noms inconnus ignorés
 *   avec warning, liste vide acceptée (les cycles tournent à vide)
 *
 * CONTRAT D'ERREUR :
 * Un échec de livraison est local au publisher et au cycle : journalisé par
 * la tâche d'envoi, jamais remonté à la boucle ni aux autres publishers.
 * L'expiration du délai (token annulé) est consultative : un publisher qui
 * fait de l'I/O doit l'observer et abandonner l'envoi en cours.
 */

mod http;
mod log;

pub use http::HttpPublisher;
pub use log::LogPublisher;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::BaliseConfig;
use crate::models::Envelope;

/// Erreurs possibles lors d'une tentative de livraison
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("delivery deadline exceeded")]
    DeadlineExceeded,
}

pub type SharedPublisher = Arc<dyn Publisher + Send + Sync>;

/// Interface commune que TOUTES les sorties doivent implémenter
#[async_trait]
pub trait Publisher {
    /// Une tentative de livraison de l'enveloppe, au mieux, sans retry.
    /// `deadline` est le délai partagé du cycle : annulé = abandonner.
    async fn publish(
        &self,
        deadline: CancellationToken,
        envelope: Arc<Envelope>,
    ) -> Result<(), PublishError>;
}

/// Registre central des sorties disponibles, construit au démarrage
#[derive(Default)]
pub struct PublisherRegistry {
    publishers: HashMap<String, SharedPublisher>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self {
            publishers: HashMap::new(),
        }
    }

    /// Enregistre une sortie sous un nom. Un nom déjà pris est remplacé :
    /// le dernier enregistrement gagne.
    pub fn register<P: Publisher + Send + Sync + 'static>(&mut self, name: &str, publisher: P) {
        self.publishers.insert(name.to_string(), Arc::new(publisher));
    }

    /// Résout la liste de sorties demandée, dans l'ordre demandé.
    /// Les noms inconnus sont ignorés avec un warning.
    pub fn resolve(&self, names: &[String]) -> Vec<(String, SharedPublisher)> {
        let mut selected = Vec::new();
        for name in names {
            match self.publishers.get(name) {
                Some(publisher) => {
                    info!(output = %name, "publisher loaded");
                    selected.push((name.clone(), publisher.clone()));
                }
                None => warn!(output = %name, "unknown output name, skipped"),
            }
        }
        selected
    }

    /// Noms de toutes les sorties enregistrées (triés)
    pub fn outputs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.publishers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Registre par défaut : les deux sorties de référence, "log" et "http"
pub fn default_registry(cfg: &BaliseConfig) -> PublisherRegistry {
    let mut registry = PublisherRegistry::new();
    registry.register("log", LogPublisher);
    registry.register("http", HttpPublisher::new(cfg.http_destination()));
    registry
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Sortie de test : enregistre chaque enveloppe livrée.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingPublisher {
        delivered: Arc<Mutex<Vec<Envelope>>>,
    }

    impl RecordingPublisher {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn delivered(&self) -> Vec<Envelope> {
            self.delivered.lock().clone()
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(
            &self,
            _deadline: CancellationToken,
            envelope: Arc<Envelope>,
        ) -> Result<(), PublishError> {
            self.delivered.lock().push(envelope.as_ref().clone());
            Ok(())
        }
    }

    /// Sortie de test : échoue systématiquement.
    pub(crate) struct FailingPublisher;

    #[async_trait]
    impl Publisher for FailingPublisher {
        async fn publish(
            &self,
            _deadline: CancellationToken,
            _envelope: Arc<Envelope>,
        ) -> Result<(), PublishError> {
            Err(PublishError::DeadlineExceeded)
        }
    }
}
