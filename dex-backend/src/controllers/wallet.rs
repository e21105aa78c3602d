//! Wallet session endpoints
//!
//! The frontend reports wallet connector events here; the backend itself
//! never holds keys.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::gateway::DexEvent;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/wallet")
            .route("", web::get().to(get_wallet))
            .route("/connect", web::post().to(connect_wallet))
            .route("/disconnect", web::post().to(disconnect_wallet))
            .route("/chain", web::post().to(switch_chain)),
    );
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    address: String,
    chain_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct SwitchChainRequest {
    chain_id: u64,
}

fn publish_state(state: &web::Data<AppState>) -> HttpResponse {
    let wallet = state.wallet.state();
    state
        .broadcaster
        .broadcast(DexEvent::WalletChanged(wallet.clone()));
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "wallet": wallet
    }))
}

async fn get_wallet(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "wallet": state.wallet.state(),
        "expected_chain_id": state.config.chain_id
    }))
}

async fn connect_wallet(
    state: web::Data<AppState>,
    body: web::Json<ConnectRequest>,
) -> impl Responder {
    if body.address.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "address is required"
        }));
    }

    state.wallet.connect(&body.address, body.chain_id);
    publish_state(&state)
}

async fn disconnect_wallet(state: web::Data<AppState>) -> impl Responder {
    state.wallet.disconnect();
    publish_state(&state)
}

async fn switch_chain(
    state: web::Data<AppState>,
    body: web::Json<SwitchChainRequest>,
) -> impl Responder {
    if !state.wallet.is_connected() {
        return HttpResponse::Conflict().json(serde_json::json!({
            "success": false,
            "error": "wallet not connected"
        }));
    }
    state.wallet.switch_chain(body.chain_id);
    publish_state(&state)
}
