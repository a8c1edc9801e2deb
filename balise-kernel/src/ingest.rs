use tokio::sync::mpsc::Receiver;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info};

use crate::models::Reading;
use crate::store::ReadingStore;

/// Consomme le flux de mesures et alimente le store, une entrée par balise.
/// À la fermeture du canal la boucle se termine proprement : relancer le
/// scanner n'est pas de son ressort.
pub fn spawn_ingest_loop(store: ReadingStore, mut readings: Receiver<Reading>) -> JoinHandle<()> {
    task::spawn(async move {
        while let Some(reading) = readings.recv().await {
            debug!(device = %reading.device_id, "reading ingested");
            store.put(reading);
        }
        info!("readings stream closed, ingest loop exiting");
    })
}
