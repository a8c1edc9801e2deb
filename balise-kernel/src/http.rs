/**
 * API REST BALISE - Surface de consultation du kernel
 *
 * RÔLE :
 * Expose l'instantané courant des balises. Même forme JSON que celle envoyée
 * aux sorties : le même constructeur d'enveloppe sert les deux chemins.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum sur le port configuré
 * - GET /             -> enveloppe courante (host, tick, time, started, data)
 * - GET /health       -> sonde de vie
 * - GET /devices/{id} -> dernière mesure d'une balise, 404 si inconnue
 */

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use time::OffsetDateTime;

use crate::cycle::CycleCounter;
use crate::models::{Envelope, Reading};
use crate::store::ReadingStore;

#[derive(Clone)]
pub struct AppState {
    pub store: ReadingStore,
    pub host: String,
    pub started: OffsetDateTime,
    pub cycles: CycleCounter,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(get_envelope))
        .route("/health", get(|| async { "ok" }))
        .route("/devices/{id}", get(get_device))
        .with_state(app_state)
}

// GET / (enveloppe courante)
async fn get_envelope(State(app): State<AppState>) -> Json<Envelope> {
    Json(Envelope::build(
        &app.host,
        app.cycles.current(),
        app.started,
        &app.store,
    ))
}

// GET /devices/:id (détail)
async fn get_device(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Reading>, StatusCode> {
    let Some(reading) = app.store.get(&id) else {
        return Err(StatusCode::NOT_FOUND);
    };
    Ok(Json(reading))
}
