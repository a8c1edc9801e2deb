use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Reading, ReadingsMap};

/// Dernière mesure connue par balise, partagée entre l'ingestion, le cycle
/// de publication et l'API HTTP.
///
/// Verrou lecteurs/rédacteur : `put` prend l'accès exclusif le temps d'un
/// insert, `snapshot` l'accès partagé le temps de la copie. Le verrou n'est
/// jamais tenu pendant une I/O.
#[derive(Clone, Default)]
pub struct ReadingStore {
    readings: Arc<RwLock<ReadingsMap>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self {
            readings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insère ou remplace l'entrée de la balise. Le dernier arrivé gagne,
    /// sans regarder l'horodatage embarqué.
    pub fn put(&self, reading: Reading) {
        self.readings
            .write()
            .insert(reading.device_id.clone(), reading);
    }

    pub fn get(&self, device_id: &str) -> Option<Reading> {
        self.readings.read().get(device_id).cloned()
    }

    /// Copie indépendante des dernières mesures, sûre à itérer après retour
    /// quels que soient les `put` suivants.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.readings.read().len()
    }
}
