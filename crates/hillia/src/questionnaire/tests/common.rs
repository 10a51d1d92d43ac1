use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::questionnaire::analytics::{AnalyticsEvent, AnalyticsSink, EventType};
use crate::questionnaire::catalog::{Question, QuestionCatalog, QuestionKind, Section};
use crate::questionnaire::contact::{ContactAcknowledgement, ContactPayload};
use crate::questionnaire::store::{MemoryStorage, ResponseStore, SiteState, StateStorage};
use crate::questionnaire::submission::{
    Acknowledgement, SubmissionAdapter, SubmissionError, SubmissionPayload,
};
use crate::questionnaire::wizard::{Wizard, WizardContext, WizardSettings};

pub(super) fn settings() -> WizardSettings {
    WizardSettings {
        auto_advance_delay: Duration::from_millis(300),
        submit_timeout: Duration::from_millis(200),
    }
}

/// One section, one single-select question with options "A" and "B".
pub(super) fn single_question_catalog() -> Arc<QuestionCatalog> {
    Arc::new(QuestionCatalog::new(vec![Section::new(
        "only",
        "Only",
        "Section A",
        vec![Question::single("pick", "Pick one", vec!["A", "B"])],
    )]))
}

/// Three sections covering every question kind; the last section is optional.
pub(super) fn mixed_catalog() -> Arc<QuestionCatalog> {
    Arc::new(QuestionCatalog::new(vec![
        Section::new(
            "rhythm",
            "Rhythm",
            "Section A",
            vec![
                Question::single("s1", "Pace", vec!["Slow", "Brisk"]),
                Question::multiselect("m1", "Pastimes", 2, vec!["Reading", "Walking", "Hosting"]),
            ],
        ),
        Section::new(
            "values",
            "Values",
            "Section B",
            vec![
                Question::matrix(
                    "x1",
                    "Importance",
                    vec!["Privacy", "Silence"],
                    vec!["High", "Low"],
                ),
                Question::text("t1", "Anything else?"),
                Question::single("s2", "Pets", vec!["Yes", "No"]),
            ],
        ),
        Section::new(
            "signals",
            "Signals",
            "Section C",
            vec![Question::text("o1", "Last book")],
        )
        .optional(),
    ]))
}

#[derive(Default, Clone)]
pub(super) struct RecordingAnalytics {
    events: Arc<Mutex<Vec<AnalyticsEvent>>>,
}

impl RecordingAnalytics {
    pub(super) fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().expect("analytics mutex poisoned").clone()
    }

    pub(super) fn count(&self, event_type: EventType) -> usize {
        self.events()
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        self.events
            .lock()
            .expect("analytics mutex poisoned")
            .push(event);
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingAdapter {
    payloads: Arc<Mutex<Vec<SubmissionPayload>>>,
    contacts: Arc<Mutex<Vec<ContactPayload>>>,
}

impl RecordingAdapter {
    pub(super) fn payloads(&self) -> Vec<SubmissionPayload> {
        self.payloads.lock().expect("adapter mutex poisoned").clone()
    }

    pub(super) fn contacts(&self) -> Vec<ContactPayload> {
        self.contacts.lock().expect("adapter mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionAdapter for RecordingAdapter {
    async fn submit_questionnaire(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<Acknowledgement, SubmissionError> {
        self.payloads
            .lock()
            .expect("adapter mutex poisoned")
            .push(payload.clone());
        Ok(Acknowledgement {
            response_id: "resp-001".to_string(),
            timestamp: Utc::now(),
            status: "received".to_string(),
        })
    }

    async fn submit_contact(
        &self,
        payload: &ContactPayload,
    ) -> Result<ContactAcknowledgement, SubmissionError> {
        self.contacts
            .lock()
            .expect("adapter mutex poisoned")
            .push(payload.clone());
        Ok(ContactAcknowledgement {
            submission_id: "contact-001".to_string(),
            timestamp: Utc::now(),
        })
    }
}

pub(super) struct FailingAdapter;

#[async_trait]
impl SubmissionAdapter for FailingAdapter {
    async fn submit_questionnaire(
        &self,
        _payload: &SubmissionPayload,
    ) -> Result<Acknowledgement, SubmissionError> {
        Err(SubmissionError::Rejected { status: 503 })
    }

    async fn submit_contact(
        &self,
        _payload: &ContactPayload,
    ) -> Result<ContactAcknowledgement, SubmissionError> {
        Err(SubmissionError::Transport("connection refused".to_string()))
    }
}

/// Never answers within any reasonable timeout.
pub(super) struct StalledAdapter;

#[async_trait]
impl SubmissionAdapter for StalledAdapter {
    async fn submit_questionnaire(
        &self,
        _payload: &SubmissionPayload,
    ) -> Result<Acknowledgement, SubmissionError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(SubmissionError::Transport("stalled".to_string()))
    }

    async fn submit_contact(
        &self,
        _payload: &ContactPayload,
    ) -> Result<ContactAcknowledgement, SubmissionError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(SubmissionError::Transport("stalled".to_string()))
    }
}

pub(super) fn context(
    storage: &MemoryStorage,
    adapter: Arc<dyn SubmissionAdapter>,
    analytics: &RecordingAnalytics,
) -> WizardContext {
    let storage: Arc<dyn StateStorage> = Arc::new(storage.clone());
    WizardContext {
        store: ResponseStore::new(storage.clone()),
        site: SiteState::new(storage),
        adapter,
        analytics: Arc::new(analytics.clone()),
    }
}

pub(super) fn wizard_with(
    catalog: Arc<QuestionCatalog>,
    storage: &MemoryStorage,
    adapter: Arc<dyn SubmissionAdapter>,
    analytics: &RecordingAnalytics,
) -> Wizard {
    Wizard::resume(catalog, context(storage, adapter, analytics), settings())
}

pub(super) fn fresh_wizard(catalog: Arc<QuestionCatalog>) -> Wizard {
    wizard_with(
        catalog,
        &MemoryStorage::default(),
        Arc::new(RecordingAdapter::default()),
        &RecordingAnalytics::default(),
    )
}

/// Gives the current question a complete answer of the right kind.
pub(super) fn answer_current(wizard: &mut Wizard) {
    let Some(question) = wizard.current_question().cloned() else {
        panic!("no active question in phase {}", wizard.phase());
    };
    match question.kind {
        QuestionKind::Single => {
            let _ = wizard
                .select_single(question.options[0])
                .expect("single answer accepted");
        }
        QuestionKind::Multiselect => {
            wizard
                .toggle_multiselect(question.options[0])
                .expect("multiselect answer accepted");
        }
        QuestionKind::Matrix => {
            for row in &question.rows {
                wizard
                    .set_matrix_cell(*row, question.columns[0])
                    .expect("matrix answer accepted");
            }
        }
        QuestionKind::Text => {
            wizard.set_text("a few words").expect("text answer accepted");
        }
    }
}

/// Answers and advances until the wizard reaches the contact step.
pub(super) fn answer_everything(wizard: &mut Wizard) {
    wizard.begin();
    while wizard.current_question().is_some() {
        answer_current(wizard);
        assert!(wizard.advance().is_moved(), "answered question must advance");
    }
}
