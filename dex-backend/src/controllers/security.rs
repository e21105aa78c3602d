//! Security checklist endpoints

use actix_web::{web, HttpResponse, Responder};

use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/security")
            .route("", web::get().to(get_report))
            .route("/run", web::post().to(run_checks)),
    );
}

/// Latest report, `null` until the checklist has run once
async fn get_report(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "report": state.security.latest()
    }))
}

async fn run_checks(state: web::Data<AppState>) -> impl Responder {
    let report = state.security.run(&state.wallet.state()).await;
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "report": report
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_run_then_get() {
        let state = web::Data::new(AppState::for_tests());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/security").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["report"].is_null());

        state
            .wallet
            .connect("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", state.config.chain_id);
        let req = test::TestRequest::post().uri("/api/security/run").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["report"]["is_valid"], true);
        assert_eq!(body["report"]["checks"].as_array().unwrap().len(), 4);

        let req = test::TestRequest::get().uri("/api/security").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["report"]["is_valid"], true);
    }
}
