//! Transaction history API endpoints

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/transactions")
            .route("", web::get().to(list_transactions))
            .route("", web::delete().to(clear_transactions))
            .route("/pending", web::get().to(list_pending))
            .route("/hash/{hash}", web::get().to(get_by_hash)),
    );
}

#[derive(Debug, Deserialize)]
pub struct UserParams {
    user: Option<String>,
}

/// All records, or only those owned by `?user=`
async fn list_transactions(
    state: web::Data<AppState>,
    query: web::Query<UserParams>,
) -> impl Responder {
    let transactions = match query.user.as_deref() {
        Some(user) => state.tx_history.get_for_user(user),
        None => state.tx_history.get_all(),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": transactions.len(),
        "transactions": transactions
    }))
}

async fn list_pending(state: web::Data<AppState>) -> impl Responder {
    let transactions = state.tx_history.get_pending();
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": transactions.len(),
        "transactions": transactions
    }))
}

async fn get_by_hash(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.tx_history.find_by_hash(&path) {
        Some(transaction) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "transaction": transaction
        })),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": "Transaction not found"
        })),
    }
}

async fn clear_transactions(
    state: web::Data<AppState>,
    query: web::Query<UserParams>,
) -> impl Responder {
    let Some(user) = query.user.as_deref().filter(|u| !u.trim().is_empty()) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "user is required"
        }));
    };

    let removed = state.tx_history.clear_for_user(user);
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "removed": removed
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;
    use trade_queue_types::TxType;

    use crate::tx_history::NewTransactionRecord;

    #[actix_web::test]
    async fn test_list_filter_and_clear() {
        let state = AppState::for_tests();
        state.tx_history.add(NewTransactionRecord::pending(
            "0xaaa",
            TxType::Deposit,
            "10",
            "0xAbC0000000000000000000000000000000000001",
        ));
        state.tx_history.add(NewTransactionRecord::pending(
            "0xbbb",
            TxType::Withdraw,
            "4",
            "0x0000000000000000000000000000000000000002",
        ));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/transactions?user=0xabc0000000000000000000000000000000000001")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["transactions"][0]["hash"], "0xaaa");

        let req = test::TestRequest::get().uri("/api/transactions/hash/0xBBB").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["transaction"]["tx_type"], "withdraw");

        let req = test::TestRequest::delete().uri("/api/transactions").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::delete()
            .uri("/api/transactions?user=0xABC0000000000000000000000000000000000001")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["removed"], 1);

        let req = test::TestRequest::get().uri("/api/transactions").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
    }
}
