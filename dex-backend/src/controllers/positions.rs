//! Leveraged position endpoints

use actix_web::{web, Responder};
use serde::Deserialize;
use trade_queue_types::TradeSide;

use super::vault::respond;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/positions")
            .route("/open", web::post().to(open_position))
            .route("/{id}/close", web::post().to(close_position)),
    );
}

#[derive(Debug, Deserialize)]
pub struct OpenPositionRequest {
    symbol: String,
    /// `buy` opens a long, `sell` a short
    side: TradeSide,
    size: String,
    collateral: String,
}

async fn open_position(
    state: web::Data<AppState>,
    body: web::Json<OpenPositionRequest>,
) -> impl Responder {
    let is_long = body.side == TradeSide::Buy;
    respond(
        state
            .vault
            .open_position(&body.symbol, is_long, &body.size, &body.collateral)
            .await,
    )
}

async fn close_position(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    respond(state.vault.close_position(&path).await)
}
