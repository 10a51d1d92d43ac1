use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::auth::{AdminGate, AuthError};
use super::domain::{
    AnalyticsRecord, ConsentSplit, ContactIntake, ContactRecord, ContactStats, ContactStatus,
    ContactUpdate, ListFilter, QuestionnaireIntake, QuestionnaireRecord, QuestionnaireStats,
    QuestionnaireUpdate, ResponseStatus, ReviewStats, Share,
};
use super::repository::{RepositoryError, ReviewRepository};
use crate::config::sha256_hex;

/// Outcome of an analytics post. Events without consent are acknowledged but not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Recorded { event_id: String },
    Skipped,
}

/// Intake and review operations behind the reading room.
pub struct ReviewService<R> {
    repository: Arc<R>,
    gate: Arc<AdminGate>,
}

impl<R> ReviewService<R>
where
    R: ReviewRepository + 'static,
{
    pub fn new(repository: Arc<R>, gate: Arc<AdminGate>) -> Self {
        Self { repository, gate }
    }

    pub fn authorize(&self, header: Option<&str>) -> Result<String, ReviewError> {
        Ok(self.gate.verify(header)?)
    }

    /// Stores a questionnaire as received. Contact details survive only when the
    /// respondent asked to be contacted.
    pub fn submit_questionnaire(
        &self,
        intake: QuestionnaireIntake,
    ) -> Result<QuestionnaireRecord, ReviewError> {
        if !intake.consent {
            return Err(ReviewError::ConsentRequired);
        }

        let record = QuestionnaireRecord {
            response_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            session_id: hash_session(&intake.session_id),
            consent: intake.consent,
            sections: intake.sections,
            free_text: intake.free_text,
            contact_info: if intake.wants_contact {
                intake.contact_info
            } else {
                None
            },
            wants_contact: intake.wants_contact,
            internal_score: Default::default(),
            internal_notes: String::new(),
            status: ResponseStatus::Unreviewed,
            watched: false,
        };

        self.repository.insert_questionnaire(record.clone())?;
        tracing::info!(response_id = %record.response_id, "questionnaire received");
        Ok(record)
    }

    pub fn submit_contact(&self, intake: ContactIntake) -> Result<ContactRecord, ReviewError> {
        if !intake.consent {
            return Err(ReviewError::ConsentRequired);
        }

        let record = ContactRecord {
            submission_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            name: intake.name,
            city: intake.city,
            reason: intake.reason,
            preferred_contact: intake.preferred_contact,
            email: intake.email,
            phone: intake.phone,
            consent: intake.consent,
            status: ContactStatus::New,
            internal_notes: String::new(),
            watched: false,
        };

        self.repository.insert_contact(record.clone())?;
        tracing::info!(submission_id = %record.submission_id, "contact request received");
        Ok(record)
    }

    pub fn record_event(
        &self,
        event_type: &str,
        session_id: &str,
        consent: bool,
        event_data: Value,
    ) -> Result<EventOutcome, ReviewError> {
        if !consent {
            return Ok(EventOutcome::Skipped);
        }

        let record = AnalyticsRecord {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            session_id: hash_session(session_id),
            event_type: event_type.to_string(),
            event_data,
            consent,
        };
        let event_id = record.event_id.clone();
        self.repository.insert_event(record)?;
        Ok(EventOutcome::Recorded { event_id })
    }

    pub fn list_questionnaires(
        &self,
        filter: ListFilter<ResponseStatus>,
    ) -> Result<Vec<QuestionnaireRecord>, ReviewError> {
        let records = self.repository.questionnaires()?;
        Ok(records
            .into_iter()
            .filter(|record| filter.status.map_or(true, |status| record.status == status))
            .filter(|record| filter.watched.map_or(true, |watched| record.watched == watched))
            .skip(filter.skip)
            .take(filter.limit)
            .collect())
    }

    pub fn questionnaire(&self, response_id: &str) -> Result<QuestionnaireRecord, ReviewError> {
        self.repository
            .questionnaire(response_id)?
            .ok_or(ReviewError::NotFound)
    }

    pub fn update_questionnaire(
        &self,
        response_id: &str,
        update: QuestionnaireUpdate,
        admin: &str,
    ) -> Result<QuestionnaireRecord, ReviewError> {
        if update.is_empty() {
            return Err(ReviewError::EmptyUpdate);
        }

        let mut record = self.questionnaire(response_id)?;
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(notes) = update.internal_notes {
            record.internal_notes = notes;
        }
        if let Some(score) = update.internal_score {
            record.internal_score = score;
        }
        if let Some(watched) = update.watched {
            record.watched = watched;
        }

        self.repository.update_questionnaire(record.clone())?;
        tracing::info!(admin, response_id, "questionnaire updated");
        Ok(record)
    }

    pub fn delete_questionnaire(&self, response_id: &str, admin: &str) -> Result<(), ReviewError> {
        self.repository.delete_questionnaire(response_id)?;
        tracing::info!(admin, response_id, "questionnaire deleted");
        Ok(())
    }

    pub fn list_contacts(
        &self,
        filter: ListFilter<ContactStatus>,
    ) -> Result<Vec<ContactRecord>, ReviewError> {
        let records = self.repository.contacts()?;
        Ok(records
            .into_iter()
            .filter(|record| filter.status.map_or(true, |status| record.status == status))
            .filter(|record| filter.watched.map_or(true, |watched| record.watched == watched))
            .skip(filter.skip)
            .take(filter.limit)
            .collect())
    }

    pub fn contact(&self, submission_id: &str) -> Result<ContactRecord, ReviewError> {
        self.repository
            .contact(submission_id)?
            .ok_or(ReviewError::NotFound)
    }

    pub fn update_contact(
        &self,
        submission_id: &str,
        update: ContactUpdate,
        admin: &str,
    ) -> Result<ContactRecord, ReviewError> {
        if update.is_empty() {
            return Err(ReviewError::EmptyUpdate);
        }

        let mut record = self.contact(submission_id)?;
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(notes) = update.internal_notes {
            record.internal_notes = notes;
        }
        if let Some(watched) = update.watched {
            record.watched = watched;
        }

        self.repository.update_contact(record.clone())?;
        tracing::info!(admin, submission_id, "contact request updated");
        Ok(record)
    }

    pub fn delete_contact(&self, submission_id: &str, admin: &str) -> Result<(), ReviewError> {
        self.repository.delete_contact(submission_id)?;
        tracing::info!(admin, submission_id, "contact request deleted");
        Ok(())
    }

    pub fn stats(&self) -> Result<ReviewStats, ReviewError> {
        let questionnaires = self.repository.questionnaires()?;
        let contacts = self.repository.contacts()?;

        let total = questionnaires.len();
        let by_status = ResponseStatus::ALL
            .into_iter()
            .map(|status| {
                let count = questionnaires
                    .iter()
                    .filter(|record| record.status == status)
                    .count();
                (status.label(), Share::of(count, total))
            })
            .collect::<BTreeMap<_, _>>();
        let wants_contact = questionnaires
            .iter()
            .filter(|record| record.wants_contact)
            .count();

        let contact_total = contacts.len();
        let contact_by_status = ContactStatus::ALL
            .into_iter()
            .map(|status| {
                let count = contacts.iter().filter(|record| record.status == status).count();
                (status.label(), Share::of(count, contact_total))
            })
            .collect::<BTreeMap<_, _>>();

        Ok(ReviewStats {
            questionnaire: QuestionnaireStats {
                total,
                by_status,
                contact_consent: ConsentSplit {
                    yes: Share::of(wants_contact, total),
                    no: Share::of(total - wants_contact, total),
                },
            },
            contact: ContactStats {
                total: contact_total,
                by_status: contact_by_status,
            },
        })
    }
}

/// First sixteen hex characters of the SHA-256 of a device session id.
pub fn hash_session(session_id: &str) -> String {
    sha256_hex(session_id).chars().take(16).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("consent required for data persistence")]
    ConsentRequired,
    #[error("no update data provided")]
    EmptyUpdate,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ReviewError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
