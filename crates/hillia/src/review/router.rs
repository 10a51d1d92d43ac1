use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::AuthError;
use super::domain::{
    ContactIntake, ContactStatus, ContactUpdate, InternalScore, ListFilter, QuestionnaireIntake,
    QuestionnaireUpdate, ResponseStatus, ScoreLevel,
};
use super::repository::{RepositoryError, ReviewRepository};
use super::service::{EventOutcome, ReviewError, ReviewService};

type SharedService<R> = Arc<ReviewService<R>>;

/// Public intake endpoints plus the authenticated reading-room endpoints, all under `/api`.
pub fn review_router<R>(service: SharedService<R>) -> Router
where
    R: ReviewRepository + 'static,
{
    Router::new()
        .route("/api", get(root_handler))
        .route("/api/", get(root_handler))
        .route("/api/questionnaire", post(submit_questionnaire_handler::<R>))
        .route("/api/contact", post(submit_contact_handler::<R>))
        .route("/api/analytics/event", post(analytics_event_handler::<R>))
        .route("/api/admin/auth/verify", post(verify_handler::<R>))
        .route("/api/admin/stats", get(stats_handler::<R>))
        .route("/api/admin/questionnaire", get(list_questionnaires_handler::<R>))
        .route(
            "/api/admin/questionnaire/:response_id",
            get(get_questionnaire_handler::<R>)
                .patch(update_questionnaire_handler::<R>)
                .delete(delete_questionnaire_handler::<R>),
        )
        .route("/api/admin/contact", get(list_contacts_handler::<R>))
        .route(
            "/api/admin/contact/:submission_id",
            get(get_contact_handler::<R>)
                .patch(update_contact_handler::<R>)
                .delete(delete_contact_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery<S> {
    status: Option<S>,
    watched: Option<bool>,
    skip: Option<usize>,
    limit: Option<usize>,
}

impl<S> ListQuery<S> {
    fn into_filter(self) -> ListFilter<S> {
        ListFilter {
            status: self.status,
            watched: self.watched,
            skip: self.skip.unwrap_or(0),
            limit: self.limit.unwrap_or(ListFilter::<S>::DEFAULT_LIMIT),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionnairePatchQuery {
    status: Option<ResponseStatus>,
    internal_notes: Option<String>,
    watched: Option<bool>,
    community_fit: Option<ScoreLevel>,
    lifestyle_alignment: Option<ScoreLevel>,
    decision_maturity: Option<ScoreLevel>,
}

impl QuestionnairePatchQuery {
    fn into_update(self) -> QuestionnaireUpdate {
        let score = InternalScore {
            community_fit: self.community_fit,
            lifestyle_alignment: self.lifestyle_alignment,
            decision_maturity: self.decision_maturity,
        };
        QuestionnaireUpdate {
            status: self.status,
            internal_notes: self.internal_notes,
            internal_score: (!score.is_empty()).then_some(score),
            watched: self.watched,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactPatchQuery {
    status: Option<ContactStatus>,
    internal_notes: Option<String>,
    watched: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventQuery {
    event_type: String,
    session_id: String,
    #[serde(default = "default_consent")]
    consent: bool,
}

fn default_consent() -> bool {
    true
}

pub(crate) async fn root_handler() -> Response {
    let payload = json!({
        "message": "HILLIA Governance Backend",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_questionnaire_handler<R>(
    State(service): State<SharedService<R>>,
    axum::Json(intake): axum::Json<QuestionnaireIntake>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    match service.submit_questionnaire(intake) {
        Ok(record) => (StatusCode::OK, axum::Json(record.receipt())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_contact_handler<R>(
    State(service): State<SharedService<R>>,
    axum::Json(intake): axum::Json<ContactIntake>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    match service.submit_contact(intake) {
        Ok(record) => (StatusCode::OK, axum::Json(record.receipt())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn analytics_event_handler<R>(
    State(service): State<SharedService<R>>,
    Query(query): Query<EventQuery>,
    body: Bytes,
) -> Response
where
    R: ReviewRepository + 'static,
{
    let event_data = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_slice::<Value>(&body).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "analytics body is not json, storing empty data");
            json!({})
        })
    };

    match service.record_event(&query.event_type, &query.session_id, query.consent, event_data) {
        Ok(EventOutcome::Recorded { event_id }) => {
            let payload = json!({ "status": "recorded", "event_id": event_id });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(EventOutcome::Skipped) => {
            let payload = json!({ "status": "skipped", "reason": "no consent" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn verify_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
) -> Response
where
    R: ReviewRepository + 'static,
{
    match authorize(&service, &headers) {
        Ok(username) => {
            let payload = json!({ "status": "authenticated", "username": username });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn stats_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
) -> Response
where
    R: ReviewRepository + 'static,
{
    if let Err(response) = authorize(&service, &headers) {
        return response;
    }
    match service.stats() {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_questionnaires_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery<ResponseStatus>>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    if let Err(response) = authorize(&service, &headers) {
        return response;
    }
    match service.list_questionnaires(query.into_filter()) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_questionnaire_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path(response_id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    if let Err(response) = authorize(&service, &headers) {
        return response;
    }
    match service.questionnaire(&response_id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_questionnaire_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path(response_id): Path<String>,
    Query(query): Query<QuestionnairePatchQuery>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    let admin = match authorize(&service, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match service.update_questionnaire(&response_id, query.into_update(), &admin) {
        Ok(record) => {
            let payload = json!({ "status": "updated", "response_id": record.response_id });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_questionnaire_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path(response_id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    let admin = match authorize(&service, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match service.delete_questionnaire(&response_id, &admin) {
        Ok(()) => {
            let payload = json!({ "status": "deleted", "response_id": response_id });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_contacts_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery<ContactStatus>>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    if let Err(response) = authorize(&service, &headers) {
        return response;
    }
    match service.list_contacts(query.into_filter()) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_contact_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    if let Err(response) = authorize(&service, &headers) {
        return response;
    }
    match service.contact(&submission_id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_contact_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
    Query(query): Query<ContactPatchQuery>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    let admin = match authorize(&service, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let update = ContactUpdate {
        status: query.status,
        internal_notes: query.internal_notes,
        watched: query.watched,
    };
    match service.update_contact(&submission_id, update, &admin) {
        Ok(record) => {
            let payload = json!({ "status": "updated", "submission_id": record.submission_id });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_contact_handler<R>(
    State(service): State<SharedService<R>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
{
    let admin = match authorize(&service, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match service.delete_contact(&submission_id, &admin) {
        Ok(()) => {
            let payload = json!({ "status": "deleted", "submission_id": submission_id });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn authorize<R>(service: &ReviewService<R>, headers: &HeaderMap) -> Result<String, Response>
where
    R: ReviewRepository + 'static,
{
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    service.authorize(header).map_err(error_response)
}

fn error_response(err: ReviewError) -> Response {
    let status = match &err {
        ReviewError::ConsentRequired | ReviewError::EmptyUpdate => StatusCode::BAD_REQUEST,
        ReviewError::NotFound => StatusCode::NOT_FOUND,
        ReviewError::Auth(AuthError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
        ReviewError::Auth(_) => StatusCode::UNAUTHORIZED,
        ReviewError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ReviewError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    let mut response = (status, axum::Json(payload)).into_response();

    match &err {
        ReviewError::Auth(AuthError::RateLimited { retry_after_secs }) => {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        ReviewError::Auth(_) => {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"reading room\""),
            );
        }
        _ => {}
    }
    response
}
