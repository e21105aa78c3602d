//! Trade queue API endpoints

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use std::str::FromStr;
use trade_queue_types::{NewTradeRequest, TradeStatus};

use crate::trade_queue::QueueError;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/trades")
            .route("", web::post().to(enqueue_trade))
            .route("", web::get().to(list_trades))
            .route("/stats", web::get().to(get_stats))
            .route("/clear-completed", web::post().to(clear_completed))
            .route("/{id}", web::get().to(get_trade))
            .route("/{id}", web::delete().to(remove_trade))
            .route("/{id}/cancel", web::post().to(cancel_trade)),
    );
}

fn queue_error_response(err: &QueueError) -> HttpResponse {
    let body = serde_json::json!({
        "success": false,
        "error": err.to_string()
    });
    match err {
        QueueError::Validation(_) => HttpResponse::BadRequest().json(body),
        QueueError::NotFound(_) => HttpResponse::NotFound().json(body),
        QueueError::Processing(_) | QueueError::InvalidTransition(_) => {
            HttpResponse::Conflict().json(body)
        }
    }
}

async fn enqueue_trade(
    state: web::Data<AppState>,
    body: web::Json<NewTradeRequest>,
) -> impl Responder {
    match state.queue.enqueue(body.into_inner()) {
        Ok(trade) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "trade": trade
        })),
        Err(e) => {
            log::info!("[TradeQueue] Rejected trade: {}", e);
            queue_error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    status: Option<String>,
}

async fn list_trades(state: web::Data<AppState>, query: web::Query<ListParams>) -> impl Responder {
    let trades = match query.status.as_deref() {
        Some(raw) => match TradeStatus::from_str(raw) {
            Ok(status) => state.queue.list_by_status(status),
            Err(e) => {
                return HttpResponse::BadRequest().json(serde_json::json!({
                    "success": false,
                    "error": e
                }));
            }
        },
        None => state.queue.list(),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": trades.len(),
        "trades": trades
    }))
}

async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "stats": state.queue.stats()
    }))
}

async fn get_trade(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    match state.queue.get(&id) {
        Some(trade) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "trade": trade
        })),
        None => queue_error_response(&QueueError::NotFound(id)),
    }
}

async fn cancel_trade(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.queue.cancel(&path.into_inner()) {
        Ok(trade) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "trade": trade
        })),
        Err(e) => queue_error_response(&e),
    }
}

async fn remove_trade(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.queue.remove(&path.into_inner()) {
        Ok(trade) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "removed": trade.id
        })),
        Err(e) => queue_error_response(&e),
    }
}

async fn clear_completed(state: web::Data<AppState>) -> impl Responder {
    let removed = state.queue.clear_completed();
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "removed": removed
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    use crate::config::Config;

    #[actix_web::test]
    async fn test_enqueue_list_and_cancel() {
        let state = AppState::for_tests();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/trades")
            .set_json(json!({
                "kind": "limit",
                "side": "buy",
                "symbol": "ETH-USD",
                "amount": 2.0,
                "price": 3100.5,
                "priority": "high"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["trade"]["status"], "pending");
        assert_eq!(body["trade"]["max_retries"], Config::default().queue.default_max_retries);
        let id = body["trade"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/trades?status=pending")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);

        let req = test::TestRequest::post()
            .uri(&format!("/api/trades/{}/cancel", id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["trade"]["status"], "cancelled");

        let req = test::TestRequest::get().uri("/api/trades/stats").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stats"]["cancelled"], 1);
        assert_eq!(body["stats"]["pending"], 0);

        let req = test::TestRequest::post()
            .uri("/api/trades/clear-completed")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["removed"], 1);
    }

    #[actix_web::test]
    async fn test_error_statuses() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::for_tests()))
                .configure(config),
        )
        .await;

        // limit order without a price
        let req = test::TestRequest::post()
            .uri("/api/trades")
            .set_json(json!({
                "kind": "limit",
                "side": "sell",
                "symbol": "ETH-USD",
                "amount": 1.0
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/trades/missing").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/trades?status=bogus")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
