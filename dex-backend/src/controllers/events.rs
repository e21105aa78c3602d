//! Recent events API
//!
//! Replays the event bus buffer so polling clients can catch up on events they
//! missed. Live delivery is the `/api/events/ws` stream.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::gateway::actix_ws::ws_handler;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/events").route(web::get().to(list_events)))
        .service(web::resource("/api/events/ws").route(web::get().to(ws_handler)));
}

#[derive(Debug, Deserialize)]
pub struct EventParams {
    /// Only the newest `limit` events
    limit: Option<usize>,
}

async fn list_events(state: web::Data<AppState>, query: web::Query<EventParams>) -> impl Responder {
    let mut events = state.broadcaster.get_recent_events();
    if let Some(limit) = query.limit {
        let skip = events.len().saturating_sub(limit);
        events.drain(..skip);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": events.len(),
        "events": events
    }))
}
