//! Vault, liquidity pool and faucet endpoints

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::contracts::ContractError;
use crate::tx_history::TransactionRecord;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/vault")
            .route("/deposit", web::post().to(deposit))
            .route("/withdraw", web::post().to(withdraw))
            .route("/pool/deposit", web::post().to(pool_deposit))
            .route("/pool/withdraw", web::post().to(pool_withdraw))
            .route("/mint", web::post().to(mint)),
    );
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// Token amount (deposits) or share amount (withdrawals), as a decimal string
    amount: String,
}

/// Request problems are 400s, anything from the chain is a 502
pub(super) fn respond(result: Result<TransactionRecord, ContractError>) -> HttpResponse {
    match result {
        Ok(transaction) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "transaction": transaction
        })),
        Err(e) => {
            let body = serde_json::json!({
                "success": false,
                "error": e.to_string()
            });
            match e {
                ContractError::WalletNotConnected
                | ContractError::WrongNetwork { .. }
                | ContractError::InvalidAddress(_)
                | ContractError::InvalidAmount(_)
                | ContractError::InvalidArgument(_) => HttpResponse::BadRequest().json(body),
                ContractError::Transaction(_) | ContractError::Reverted(_) => {
                    HttpResponse::BadGateway().json(body)
                }
            }
        }
    }
}

async fn deposit(state: web::Data<AppState>, body: web::Json<AmountRequest>) -> impl Responder {
    respond(state.vault.deposit(&body.amount).await)
}

async fn withdraw(state: web::Data<AppState>, body: web::Json<AmountRequest>) -> impl Responder {
    respond(state.vault.withdraw(&body.amount).await)
}

async fn pool_deposit(
    state: web::Data<AppState>,
    body: web::Json<AmountRequest>,
) -> impl Responder {
    respond(state.vault.pool_deposit(&body.amount).await)
}

async fn pool_withdraw(
    state: web::Data<AppState>,
    body: web::Json<AmountRequest>,
) -> impl Responder {
    respond(state.vault.pool_withdraw(&body.amount).await)
}

/// Testnet faucet
async fn mint(state: web::Data<AppState>, body: web::Json<AmountRequest>) -> impl Responder {
    respond(state.vault.mint(&body.amount).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn test_deposit_requires_wallet() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::for_tests()))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/vault/deposit")
            .set_json(json!({ "amount": "5" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_deposit_success() {
        let state = web::Data::new(AppState::for_tests());
        state
            .wallet
            .connect("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", state.config.chain_id);
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/vault/deposit")
            .set_json(json!({ "amount": "5" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["transaction"]["status"], "success");
        assert_eq!(state.tx_history.get_all().len(), 2);
    }

    #[actix_web::test]
    async fn test_chain_errors_are_bad_gateway() {
        let resp = respond(Err(ContractError::Reverted("0xabc".to_string())));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_mint_records_transaction() {
        let state = web::Data::new(AppState::for_tests());
        state
            .wallet
            .connect("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", state.config.chain_id);
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/vault/mint")
            .set_json(json!({ "amount": "100" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["transaction"]["tx_type"], "mint");
        assert_eq!(body["transaction"]["status"], "success");
    }
}
