use hillia::review::{
    AnalyticsRecord, ContactRecord, QuestionnaireRecord, RepositoryError, ReviewRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local reading-room storage. Records keep arrival order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewRepository {
    questionnaires: Arc<Mutex<Vec<QuestionnaireRecord>>>,
    contacts: Arc<Mutex<Vec<ContactRecord>>>,
    events: Arc<Mutex<Vec<AnalyticsRecord>>>,
}

impl InMemoryReviewRepository {
    #[cfg(test)]
    pub(crate) fn event_count(&self) -> usize {
        self.events.lock().expect("events mutex poisoned").len()
    }
}

impl ReviewRepository for InMemoryReviewRepository {
    fn insert_questionnaire(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError> {
        let mut guard = self
            .questionnaires
            .lock()
            .expect("questionnaire mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.response_id == record.response_id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record);
        Ok(())
    }

    fn questionnaires(&self) -> Result<Vec<QuestionnaireRecord>, RepositoryError> {
        let guard = self
            .questionnaires
            .lock()
            .expect("questionnaire mutex poisoned");
        Ok(guard.clone())
    }

    fn questionnaire(
        &self,
        response_id: &str,
    ) -> Result<Option<QuestionnaireRecord>, RepositoryError> {
        let guard = self
            .questionnaires
            .lock()
            .expect("questionnaire mutex poisoned");
        Ok(guard
            .iter()
            .find(|record| record.response_id == response_id)
            .cloned())
    }

    fn update_questionnaire(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError> {
        let mut guard = self
            .questionnaires
            .lock()
            .expect("questionnaire mutex poisoned");
        match guard
            .iter_mut()
            .find(|existing| existing.response_id == record.response_id)
        {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_questionnaire(&self, response_id: &str) -> Result<(), RepositoryError> {
        let mut guard = self
            .questionnaires
            .lock()
            .expect("questionnaire mutex poisoned");
        let position = guard
            .iter()
            .position(|record| record.response_id == response_id)
            .ok_or(RepositoryError::NotFound)?;
        guard.remove(position);
        Ok(())
    }

    fn insert_contact(&self, record: ContactRecord) -> Result<(), RepositoryError> {
        let mut guard = self.contacts.lock().expect("contact mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.submission_id == record.submission_id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record);
        Ok(())
    }

    fn contacts(&self) -> Result<Vec<ContactRecord>, RepositoryError> {
        Ok(self.contacts.lock().expect("contact mutex poisoned").clone())
    }

    fn contact(&self, submission_id: &str) -> Result<Option<ContactRecord>, RepositoryError> {
        let guard = self.contacts.lock().expect("contact mutex poisoned");
        Ok(guard
            .iter()
            .find(|record| record.submission_id == submission_id)
            .cloned())
    }

    fn update_contact(&self, record: ContactRecord) -> Result<(), RepositoryError> {
        let mut guard = self.contacts.lock().expect("contact mutex poisoned");
        match guard
            .iter_mut()
            .find(|existing| existing.submission_id == record.submission_id)
        {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_contact(&self, submission_id: &str) -> Result<(), RepositoryError> {
        let mut guard = self.contacts.lock().expect("contact mutex poisoned");
        let position = guard
            .iter()
            .position(|record| record.submission_id == submission_id)
            .ok_or(RepositoryError::NotFound)?;
        guard.remove(position);
        Ok(())
    }

    fn insert_event(&self, record: AnalyticsRecord) -> Result<(), RepositoryError> {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push(record);
        Ok(())
    }
}
