//! End-to-end scenarios: the questionnaire wizard talking to a live reading-room router over
//! HTTP, plus resume-from-disk behavior through the public API only.

mod common {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use hillia::config::{sha256_hex, AdminConfig};
    use hillia::questionnaire::{
        AnalyticsSink, FileStorage, HttpAnalytics, HttpSubmissionAdapter, MemoryStorage,
        QuestionCatalog, QuestionKind, ResponseStore, SiteState, StateStorage, Wizard,
        WizardContext, WizardSettings,
    };
    use hillia::review::{
        review_router, AdminGate, AnalyticsRecord, ContactRecord, QuestionnaireRecord,
        RepositoryError, ReviewRepository, ReviewService,
    };

    #[derive(Default)]
    pub(super) struct VecRepository {
        questionnaires: Mutex<Vec<QuestionnaireRecord>>,
        contacts: Mutex<Vec<ContactRecord>>,
        events: Mutex<Vec<AnalyticsRecord>>,
    }

    impl VecRepository {
        pub(super) fn events(&self) -> Vec<AnalyticsRecord> {
            self.events.lock().expect("repository mutex poisoned").clone()
        }
    }

    impl ReviewRepository for VecRepository {
        fn insert_questionnaire(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError> {
            self.questionnaires
                .lock()
                .expect("repository mutex poisoned")
                .push(record);
            Ok(())
        }

        fn questionnaires(&self) -> Result<Vec<QuestionnaireRecord>, RepositoryError> {
            Ok(self
                .questionnaires
                .lock()
                .expect("repository mutex poisoned")
                .clone())
        }

        fn questionnaire(
            &self,
            response_id: &str,
        ) -> Result<Option<QuestionnaireRecord>, RepositoryError> {
            Ok(self
                .questionnaires()?
                .into_iter()
                .find(|record| record.response_id == response_id))
        }

        fn update_questionnaire(&self, _record: QuestionnaireRecord) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("read only".to_string()))
        }

        fn delete_questionnaire(&self, _response_id: &str) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("read only".to_string()))
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
            Ok(self
                .contacts()?
                .into_iter()
                .find(|record| record.submission_id == submission_id))
        }

        fn update_contact(&self, _record: ContactRecord) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("read only".to_string()))
        }

        fn delete_contact(&self, _submission_id: &str) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("read only".to_string()))
        }

        fn insert_event(&self, record: AnalyticsRecord) -> Result<(), RepositoryError> {
            self.events
                .lock()
                .expect("repository mutex poisoned")
                .push(record);
            Ok(())
        }
    }

    pub(super) struct Backend {
        pub(super) base_url: String,
        pub(super) service: Arc<ReviewService<VecRepository>>,
        pub(super) repository: Arc<VecRepository>,
    }

    /// Serves the reading room on an ephemeral local port.
    pub(super) async fn spawn_backend() -> Backend {
        let repository = Arc::new(VecRepository::default());
        let gate = Arc::new(AdminGate::new(&AdminConfig {
            username: "reader".to_string(),
            password_hash: sha256_hex("quiet-hills"),
        }));
        let service = Arc::new(ReviewService::new(repository.clone(), gate));
        let router = review_router(service.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("ephemeral port binds");
        let addr = listener.local_addr().expect("bound address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Backend {
            base_url: format!("http://{addr}"),
            service,
            repository,
        }
    }

    /// A base URL nothing listens on.
    pub(super) async fn dead_url() -> String {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("ephemeral port binds");
        let addr = listener.local_addr().expect("bound address");
        drop(listener);
        format!("http://{addr}")
    }

    pub(super) fn settings() -> WizardSettings {
        WizardSettings {
            auto_advance_delay: Duration::from_millis(1),
            submit_timeout: Duration::from_secs(5),
        }
    }

    pub(super) fn wizard(storage: Arc<dyn StateStorage>, base_url: &str) -> Wizard {
        let adapter = HttpSubmissionAdapter::new(base_url, settings().submit_timeout)
            .expect("http client builds");
        let analytics: Arc<dyn AnalyticsSink> =
            Arc::new(HttpAnalytics::new(reqwest::Client::new(), base_url));
        let context = WizardContext {
            store: ResponseStore::new(storage.clone()),
            site: SiteState::new(storage),
            adapter: Arc::new(adapter),
            analytics,
        };
        Wizard::resume(Arc::new(QuestionCatalog::hillia()), context, settings())
    }

    pub(super) fn memory() -> Arc<dyn StateStorage> {
        Arc::new(MemoryStorage::default())
    }

    pub(super) fn on_disk(root: &std::path::Path) -> Arc<dyn StateStorage> {
        Arc::new(FileStorage::new(root))
    }

    /// Answers the active question with its first choice, or plain text, and moves on.
    /// Optional text questions are skipped.
    pub(super) fn answer_and_advance(wizard: &mut Wizard) {
        let question = wizard.current_question().cloned().expect("active question");
        match question.kind {
            QuestionKind::Single => {
                let _ = wizard
                    .select_single(question.options[0])
                    .expect("single select");
            }
            QuestionKind::Multiselect => {
                wizard
                    .toggle_multiselect(question.options[0])
                    .expect("multiselect");
            }
            QuestionKind::Matrix => {
                for row in &question.rows {
                    wizard
                        .set_matrix_cell(*row, question.columns[0])
                        .expect("matrix cell");
                }
            }
            QuestionKind::Text if question.optional => {}
            QuestionKind::Text => wizard.set_text("A porch and a long table").expect("text"),
        }
        assert!(wizard.advance().is_moved(), "could not leave {}", question.id);
    }

    pub(super) async fn wait_for<F>(mut condition: F)
    where
        F: FnMut() -> bool,
    {
        for _ in 0..50 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not met in time");
    }
}

use common::*;
use hillia::questionnaire::{
    ContactDesk, ContactForm, HttpSubmissionAdapter, NoopAnalytics, PreferredContact, SiteState,
    WizardPhase,
};
use hillia::review::{hash_session, ListFilter};
use std::sync::Arc;

#[tokio::test]
async fn respondent_who_opts_in_is_stored_with_contact_details() {
    let backend = spawn_backend().await;
    let storage = memory();
    let mut wizard = wizard(storage.clone(), &backend.base_url);

    assert!(wizard.begin().is_moved());
    while wizard.phase() == WizardPhase::Answering {
        answer_and_advance(&mut wizard);
    }
    assert_eq!(wizard.phase(), WizardPhase::ContactConsent);
    assert_eq!(wizard.progress_percent(), 96);

    wizard.choose_contact(true).expect("opt in");
    wizard
        .set_preferred_contact(Some(PreferredContact::Email))
        .expect("preferred");
    wizard.set_email("ana@example.com").expect("email");
    assert!(wizard.can_submit());

    let acknowledgement = wizard.submit().await.expect("submit succeeds");
    assert!(!acknowledgement.is_local());
    assert_eq!(wizard.phase(), WizardPhase::Completed);
    assert_eq!(wizard.progress_percent(), 100);

    let records = backend
        .service
        .list_questionnaires(ListFilter::default())
        .expect("list succeeds");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.response_id, acknowledgement.response_id);
    assert!(record.wants_contact);
    assert_eq!(
        record
            .contact_info
            .as_ref()
            .and_then(|info| info.email.as_deref()),
        Some("ana@example.com")
    );
    assert!(record.sections.contains_key("life-stage"));
    assert!(!record.sections.contains_key("cultural-signals"));
    assert_eq!(
        record.free_text.get("q21-ideal-community").map(String::as_str),
        Some("A porch and a long table")
    );

    let session_id = SiteState::new(storage).session_id();
    assert_eq!(record.session_id, hash_session(&session_id));
}

#[tokio::test]
async fn unreachable_backend_still_completes_locally() {
    let storage = memory();
    let mut wizard = wizard(storage.clone(), &dead_url().await);

    wizard.begin();
    while wizard.phase() == WizardPhase::Answering {
        answer_and_advance(&mut wizard);
    }
    wizard.choose_contact(false).expect("stay anonymous");
    assert!(wizard.can_submit());

    let acknowledgement = wizard.submit().await.expect("submit completes");
    assert!(acknowledgement.is_local());
    assert_eq!(wizard.phase(), WizardPhase::Completed);
    assert_eq!(
        wizard.completion_message(),
        wizard.catalog().completion.anonymous_message
    );

    let resumed = common::wizard(storage, "http://127.0.0.1:9");
    assert_eq!(resumed.phase(), WizardPhase::Completed);
    assert!(resumed.responses().is_empty());
}

#[tokio::test]
async fn progress_survives_a_restart_on_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let base_url = dead_url().await;

    let mut first = wizard(on_disk(dir.path()), &base_url);
    first.begin();
    for _ in 0..5 {
        answer_and_advance(&mut first);
    }
    let cursor = first.cursor();
    let answered = first.responses().len();
    drop(first);

    let second = wizard(on_disk(dir.path()), &base_url);
    assert_eq!(second.cursor(), cursor);
    assert_eq!(second.responses().len(), answered);
    assert_eq!(second.phase(), WizardPhase::Answering);
}

#[tokio::test]
async fn started_and_completed_events_reach_the_reading_room() {
    let backend = spawn_backend().await;
    let mut wizard = wizard(memory(), &backend.base_url);

    wizard.begin();
    while wizard.phase() == WizardPhase::Answering {
        answer_and_advance(&mut wizard);
    }
    wizard.choose_contact(false).expect("stay anonymous");
    wizard.submit().await.expect("submit succeeds");

    let repository = backend.repository.clone();
    wait_for(|| repository.events().len() >= 2).await;
    let kinds: Vec<String> = repository
        .events()
        .into_iter()
        .map(|event| event.event_type)
        .collect();
    assert!(kinds.contains(&"questionnaire_started".to_string()));
    assert!(kinds.contains(&"questionnaire_completed".to_string()));
}

#[tokio::test]
async fn contact_form_is_delivered_over_http() {
    let backend = spawn_backend().await;
    let adapter = HttpSubmissionAdapter::new(backend.base_url.clone(), settings().submit_timeout)
        .expect("http client builds");
    let desk = ContactDesk::new(
        Arc::new(adapter),
        Arc::new(NoopAnalytics),
        SiteState::new(memory()),
        settings().submit_timeout,
    );

    let mut form = ContactForm::new("Ana", "Visiting in May");
    form.phone = Some("+351 900 000 000".to_string());
    form.prefer(Some(PreferredContact::WhatsApp));

    let acknowledgement = desk.submit(&form).await.expect("contact accepted");
    assert!(!acknowledgement.is_local());

    let stored = backend
        .service
        .contact(&acknowledgement.submission_id)
        .expect("contact stored");
    assert_eq!(stored.name, "Ana");
    assert_eq!(stored.preferred_contact, Some(PreferredContact::WhatsApp));
    assert_eq!(stored.phone.as_deref(), Some("+351 900 000 000"));
}
