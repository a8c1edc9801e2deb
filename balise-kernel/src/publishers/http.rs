use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{PublishError, Publisher};
use crate::models::Envelope;

/// Sortie "http" : POST de l'enveloppe JSON vers l'URI configurée.
///
/// Sans URI configurée la livraison est ignorée avec un warning, cycle après
/// cycle; ce n'est pas une erreur. Le statut de la réponse n'est pas
/// interprété : seule une erreur de transport compte comme échec.
pub struct HttpPublisher {
    uri: Option<String>,
    client: reqwest::Client,
}

impl HttpPublisher {
    pub fn new(uri: Option<String>) -> Self {
        Self {
            uri,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(
        &self,
        deadline: CancellationToken,
        envelope: Arc<Envelope>,
    ) -> Result<(), PublishError> {
        let Some(uri) = self.uri.as_deref() else {
            warn!("http publisher: no destination configured (publisher_http_uri / BALISE_PUBLISHER_HTTP_URI), delivery skipped");
            return Ok(());
        };

        let body = serde_json::to_vec(envelope.as_ref())?;
        let request = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        tokio::select! {
            biased;
            _ = deadline.cancelled() => Err(PublishError::DeadlineExceeded),
            response = request.send() => {
                response?;
                Ok(())
            }
        }
    }
}
