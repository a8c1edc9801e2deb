use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::Envelope;
use crate::publishers::SharedPublisher;
use crate::store::ReadingStore;

/// Compteur de cycles, partagé entre la boucle de publication et l'API HTTP.
/// Démarre à zéro : la première enveloppe publiée porte 1.
#[derive(Clone, Default)]
pub struct CycleCounter(Arc<AtomicU64>);

impl CycleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Boucle de publication périodique : à chaque tick, construit une enveloppe
/// et la distribue à toutes les sorties résolues sans attendre leurs
/// livraisons.
pub struct PublishCycle {
    store: ReadingStore,
    outputs: Vec<(String, SharedPublisher)>,
    host: String,
    started: OffsetDateTime,
    tick: Duration,
    counter: CycleCounter,
}

impl PublishCycle {
    pub fn new(
        store: ReadingStore,
        outputs: Vec<(String, SharedPublisher)>,
        host: String,
        started: OffsetDateTime,
        tick: Duration,
        counter: CycleCounter,
    ) -> Self {
        Self {
            store,
            outputs,
            host,
            started,
            tick,
            counter,
        }
    }

    /// Tourne jusqu'à l'annulation du token. Premier déclenchement un tick
    /// complet après le démarrage; un tick manqué est sauté, jamais rattrapé.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut timer = interval_at(Instant::now() + self.tick, self.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_seconds = self.tick.as_secs(),
            outputs = self.outputs.len(),
            "publish cycle started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(cycles = self.counter.current(), "publish cycle stopped");
                    break;
                }
                _ = timer.tick() => self.fire(),
            }
        }
    }

    /// Un cycle : avance le compteur, fige l'enveloppe, lance une tâche de
    /// livraison par sortie. Le délai du cycle est partagé par toutes les
    /// livraisons et n'affecte jamais le cycle suivant.
    fn fire(&self) {
        let tick = self.counter.advance();
        if self.outputs.is_empty() {
            debug!(tick, "no outputs resolved, nothing to dispatch");
            return;
        }

        let envelope = Arc::new(Envelope::build(&self.host, tick, self.started, &self.store));
        let deadline = CancellationToken::new();

        let expiry = deadline.clone();
        let budget = self.tick;
        tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            expiry.cancel();
        });

        debug!(tick, devices = envelope.data.len(), "dispatching envelope");
        for (name, publisher) in &self.outputs {
            let name = name.clone();
            let publisher = publisher.clone();
            let envelope = envelope.clone();
            let deadline = deadline.clone();
            tokio::spawn(async move {
                if let Err(e) = publisher.publish(deadline, envelope).await {
                    warn!(output = %name, tick, error = %e, "publish failed");
                }
            });
        }
    }
}

pub fn spawn_publish_cycle(cycle: PublishCycle, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::task::spawn(cycle.run(shutdown))
}
