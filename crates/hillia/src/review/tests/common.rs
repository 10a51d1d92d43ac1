use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use axum::Router;
use base64::{engine::general_purpose, Engine};
use serde_json::{json, Value};

use crate::config::{sha256_hex, AdminConfig};
use crate::questionnaire::domain::{ContactInfo, PreferredContact};
use crate::review::auth::AdminGate;
use crate::review::domain::{
    AnalyticsRecord, ContactIntake, ContactRecord, QuestionnaireIntake, QuestionnaireRecord,
};
use crate::review::repository::{RepositoryError, ReviewRepository};
use crate::review::{review_router, ReviewService};

pub(super) const ADMIN_USER: &str = "reader";
pub(super) const ADMIN_PASSWORD: &str = "quiet-hills";

pub(super) fn gate() -> Arc<AdminGate> {
    Arc::new(AdminGate::new(&AdminConfig {
        username: ADMIN_USER.to_string(),
        password_hash: sha256_hex(ADMIN_PASSWORD),
    }))
}

pub(super) fn build_service() -> (ReviewService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = ReviewService::new(repository.clone(), gate());
    (service, repository)
}

pub(super) fn router_with_service<R>(service: ReviewService<R>) -> Router
where
    R: ReviewRepository + 'static,
{
    review_router(Arc::new(service))
}

pub(super) fn basic(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{username}:{password}"))
    )
}

pub(super) fn admin_header() -> String {
    basic(ADMIN_USER, ADMIN_PASSWORD)
}

pub(super) fn intake(wants_contact: bool) -> QuestionnaireIntake {
    let mut life_stage = BTreeMap::new();
    life_stage.insert("q1-life-phase".to_string(), json!("Building roots"));

    let mut sections = BTreeMap::new();
    sections.insert("life-stage".to_string(), json!(life_stage));

    let mut free_text = BTreeMap::new();
    free_text.insert(
        "q21-ideal-community".to_string(),
        "Neighbours who share tools".to_string(),
    );

    QuestionnaireIntake {
        session_id: "1760000000000-abc123def".to_string(),
        consent: true,
        sections,
        free_text,
        contact_info: Some(ContactInfo {
            email: Some("ana@example.com".to_string()),
            phone: None,
            preferred_contact: Some(PreferredContact::Email),
        }),
        wants_contact,
    }
}

pub(super) fn contact_intake() -> ContactIntake {
    ContactIntake {
        name: "Ana".to_string(),
        city: "Porto".to_string(),
        reason: "Curious about the first village".to_string(),
        preferred_contact: Some(PreferredContact::Phone),
        email: None,
        phone: Some("+351 900 000 000".to_string()),
        consent: true,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    questionnaires: Mutex<Vec<QuestionnaireRecord>>,
    contacts: Mutex<Vec<ContactRecord>>,
    events: Mutex<Vec<AnalyticsRecord>>,
}

impl MemoryRepository {
    pub(super) fn events(&self) -> Vec<AnalyticsRecord> {
        self.events.lock().expect("repository mutex poisoned").clone()
    }
}

impl ReviewRepository for MemoryRepository {
    fn insert_questionnaire(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError> {
        let mut guard = self.questionnaires.lock().expect("repository mutex poisoned");
        if guard.iter().any(|r| r.response_id == record.response_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record);
        Ok(())
    }

    fn questionnaires(&self) -> Result<Vec<QuestionnaireRecord>, RepositoryError> {
        Ok(self.questionnaires.lock().expect("repository mutex poisoned").clone())
    }

    fn questionnaire(
        &self,
        response_id: &str,
    ) -> Result<Option<QuestionnaireRecord>, RepositoryError> {
        let guard = self.questionnaires.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|r| r.response_id == response_id).cloned())
    }

    fn update_questionnaire(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError> {
        let mut guard = self.questionnaires.lock().expect("repository mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|r| r.response_id == record.response_id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn delete_questionnaire(&self, response_id: &str) -> Result<(), RepositoryError> {
        let mut guard = self.questionnaires.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|r| r.response_id != response_id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn insert_contact(&self, record: ContactRecord) -> Result<(), RepositoryError> {
        self.contacts
            .lock()
            .expect("repository mutex poisoned")
            .push(record);
        Ok(())
    }

    fn contacts(&self) -> Result<Vec<ContactRecord>, RepositoryError> {
        Ok(self.contacts.lock().expect("repository mutex poisoned").clone())
    }

    fn contact(&self, submission_id: &str) -> Result<Option<ContactRecord>, RepositoryError> {
        let guard = self.contacts.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|r| r.submission_id == submission_id).cloned())
    }

    fn update_contact(&self, record: ContactRecord) -> Result<(), RepositoryError> {
        let mut guard = self.contacts.lock().expect("repository mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|r| r.submission_id == record.submission_id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn delete_contact(&self, submission_id: &str) -> Result<(), RepositoryError> {
        let mut guard = self.contacts.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|r| r.submission_id != submission_id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn insert_event(&self, record: AnalyticsRecord) -> Result<(), RepositoryError> {
        self.events
            .lock()
            .expect("repository mutex poisoned")
            .push(record);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl UnavailableRepository {
    fn down<T>() -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl ReviewRepository for UnavailableRepository {
    fn insert_questionnaire(&self, _record: QuestionnaireRecord) -> Result<(), RepositoryError> {
        Self::down()
    }

    fn questionnaires(&self) -> Result<Vec<QuestionnaireRecord>, RepositoryError> {
        Self::down()
    }

    fn questionnaire(
        &self,
        _response_id: &str,
    ) -> Result<Option<QuestionnaireRecord>, RepositoryError> {
        Self::down()
    }

    fn update_questionnaire(&self, _record: QuestionnaireRecord) -> Result<(), RepositoryError> {
        Self::down()
    }

    fn delete_questionnaire(&self, _response_id: &str) -> Result<(), RepositoryError> {
        Self::down()
    }

    fn insert_contact(&self, _record: ContactRecord) -> Result<(), RepositoryError> {
        Self::down()
    }

    fn contacts(&self) -> Result<Vec<ContactRecord>, RepositoryError> {
        Self::down()
    }

    fn contact(&self, _submission_id: &str) -> Result<Option<ContactRecord>, RepositoryError> {
        Self::down()
    }

    fn update_contact(&self, _record: ContactRecord) -> Result<(), RepositoryError> {
        Self::down()
    }

    fn delete_contact(&self, _submission_id: &str) -> Result<(), RepositoryError> {
        Self::down()
    }

    fn insert_event(&self, _record: AnalyticsRecord) -> Result<(), RepositoryError> {
        Self::down()
    }
}
