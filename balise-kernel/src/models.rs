use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::store::ReadingStore;

/// Dernière mesure décodée d'une balise. Jamais modifiée après création :
/// chaque observation produit une nouvelle valeur.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Reading {
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    pub version: String,
    pub humidity: f32,
    pub temperature: f32,
    pub pressure: u32,
    pub acceleration_x: f32,
    pub acceleration_y: f32,
    pub acceleration_z: f32,
    pub battery_voltage: f32,
    #[serde(rename = "TXPower")]
    pub tx_power: i8,
    pub movement_counter: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Instantané immuable de l'état des balises à un instant donné.
/// Partagé tel quel entre les publishers et l'API HTTP.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Envelope {
    pub host: String,
    pub tick: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub started: OffsetDateTime,
    pub data: Vec<Reading>,
}

impl Envelope {
    /// Construit l'enveloppe du cycle `tick` : copie indépendante du store,
    /// aucune référence partagée avec lui.
    pub fn build(host: &str, tick: u64, started: OffsetDateTime, store: &ReadingStore) -> Self {
        Self {
            host: host.to_owned(),
            tick,
            time: OffsetDateTime::now_utc(),
            started,
            data: store.snapshot(),
        }
    }
}

pub type ReadingsMap = HashMap<String, Reading>;

#[cfg(test)]
pub(crate) fn sample_reading(device_id: &str) -> Reading {
    use time::macros::datetime;

    Reading {
        device_id: device_id.to_string(),
        version: "5".to_string(),
        humidity: 41.5,
        temperature: 21.125,
        pressure: 100_044,
        acceleration_x: 0.004,
        acceleration_y: -0.004,
        acceleration_z: 1.036,
        battery_voltage: 2.977,
        tx_power: 4,
        movement_counter: 66,
        timestamp: datetime!(2024-03-14 12:00:00 UTC),
    }
}
