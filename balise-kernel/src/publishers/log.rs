use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{PublishError, Publisher};
use crate::models::Envelope;

/// Sortie "log" : écrit l'enveloppe sérialisée dans le journal.
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(
        &self,
        _deadline: CancellationToken,
        envelope: Arc<Envelope>,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_string(envelope.as_ref())?;
        info!("{payload}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_reading;
    use crate::store::ReadingStore;
    use time::OffsetDateTime;

    #[tokio::test]
    async fn publish_succeeds_even_with_expired_deadline() {
        let store = ReadingStore::new();
        store.put(sample_reading("dev-1"));
        let envelope = Arc::new(Envelope::build("gw", 1, OffsetDateTime::now_utc(), &store));

        let deadline = CancellationToken::new();
        deadline.cancel();

        // pas d'I/O : le délai n'a pas d'effet sur cette sortie
        LogPublisher
            .publish(deadline, envelope)
            .await
            .unwrap();
    }
}
