use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::review::router::submit_questionnaire_handler;
use crate::review::ReviewService;

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serializable")))
        .expect("request builds")
}

fn admin_request(method: &str, uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn root_reports_service_identity() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(Request::get("/api/").body(Body::empty()).expect("request builds"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["message"], json!("HILLIA Governance Backend"));
}

#[tokio::test]
async fn questionnaire_route_returns_a_receipt_without_internal_fields() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let body = serde_json::to_value(intake(true)).expect("intake serializes");

    let response = router
        .oneshot(json_post("/api/questionnaire", body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], json!("received"));
    assert!(payload.get("response_id").is_some());
    assert!(payload.get("internal_notes").is_none());
    assert!(payload.get("session_id").is_none());
}

#[tokio::test]
async fn questionnaire_without_consent_is_a_bad_request() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let mut body = serde_json::to_value(intake(false)).expect("intake serializes");
    body["consent"] = json!(false);

    let response = router
        .oneshot(json_post("/api/questionnaire", body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains("consent")));
}

#[tokio::test]
async fn submit_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(ReviewService::new(Arc::new(UnavailableRepository), gate()));

    let response =
        submit_questionnaire_handler::<UnavailableRepository>(State(service), axum::Json(intake(false)))
            .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn contact_route_returns_submission_id() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let body = serde_json::to_value(contact_intake()).expect("contact serializes");

    let response = router
        .oneshot(json_post("/api/contact", body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload.get("submission_id").is_some());
}

#[tokio::test]
async fn analytics_route_skips_events_without_consent() {
    let (service, repository) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_post(
            "/api/analytics/event?event_type=questionnaire_started&session_id=abc&consent=false",
            json!({}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload, json!({ "status": "skipped", "reason": "no consent" }));
    assert!(repository.events().is_empty());
}

#[tokio::test]
async fn analytics_route_records_consented_events() {
    let (service, repository) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_post(
            "/api/analytics/event?event_type=question_answered&session_id=abc",
            json!({ "question_id": "q1-life-phase" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], json!("recorded"));

    let events = repository.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "question_answered");
    assert_eq!(events[0].event_data["question_id"], json!("q1-life-phase"));
}

#[tokio::test]
async fn admin_routes_require_credentials() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/admin/stats")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn verify_route_locks_out_after_repeated_failures() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let wrong = basic(ADMIN_USER, "guess");

    for _ in 0..5 {
        let response = router
            .clone()
            .oneshot(admin_request("POST", "/api/admin/auth/verify", &wrong))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = router
        .oneshot(admin_request("POST", "/api/admin/auth/verify", &admin_header()))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn admin_can_review_update_and_delete_a_response() {
    let (service, _) = build_service();
    let record = service
        .submit_questionnaire(intake(true))
        .expect("submission succeeds");
    let router = router_with_service(service);
    let auth = admin_header();

    let listed = router
        .clone()
        .oneshot(admin_request(
            "GET",
            "/api/admin/questionnaire?status=unreviewed&limit=10",
            &auth,
        ))
        .await
        .expect("route executes");
    assert_eq!(listed.status(), StatusCode::OK);
    let payload = read_json_body(listed).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));
    assert_eq!(payload[0]["contact_info"]["email"], json!("ana@example.com"));

    let patch_uri = format!(
        "/api/admin/questionnaire/{}?status=reviewed&watched=true&community_fit=High",
        record.response_id
    );
    let patched = router
        .clone()
        .oneshot(admin_request("PATCH", &patch_uri, &auth))
        .await
        .expect("route executes");
    assert_eq!(patched.status(), StatusCode::OK);
    let payload = read_json_body(patched).await;
    assert_eq!(payload["status"], json!("updated"));

    let detail_uri = format!("/api/admin/questionnaire/{}", record.response_id);
    let detail = router
        .clone()
        .oneshot(admin_request("GET", &detail_uri, &auth))
        .await
        .expect("route executes");
    let payload = read_json_body(detail).await;
    assert_eq!(payload["status"], json!("reviewed"));
    assert_eq!(payload["watched"], json!(true));
    assert_eq!(payload["internal_score"]["community_fit"], json!("High"));

    let deleted = router
        .clone()
        .oneshot(admin_request("DELETE", &detail_uri, &auth))
        .await
        .expect("route executes");
    assert_eq!(deleted.status(), StatusCode::OK);

    let gone = router
        .oneshot(admin_request("GET", &detail_uri, &auth))
        .await
        .expect("route executes");
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_without_fields_is_a_bad_request() {
    let (service, _) = build_service();
    let record = service
        .submit_contact(contact_intake())
        .expect("contact succeeds");
    let router = router_with_service(service);

    let uri = format!("/api/admin/contact/{}", record.submission_id);
    let response = router
        .oneshot(admin_request("PATCH", &uri, &admin_header()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_route_returns_the_summary_shape() {
    let (service, _) = build_service();
    service
        .submit_questionnaire(intake(true))
        .expect("submission succeeds");
    let router = router_with_service(service);

    let response = router
        .oneshot(admin_request("GET", "/api/admin/stats", &admin_header()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["questionnaire"]["total"], json!(1));
    assert_eq!(
        payload["questionnaire"]["contact_consent"]["yes"],
        json!({ "count": 1, "percentage": 100.0 })
    );
    assert_eq!(payload["contact"]["total"], json!(0));
}
