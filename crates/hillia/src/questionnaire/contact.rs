use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::analytics::{AnalyticsEvent, AnalyticsSink, EventType};
use super::domain::PreferredContact;
use super::store::SiteState;
use super::submission::{self, SubmissionAdapter};

/// The standalone "request a conversation" form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    #[serde(default)]
    pub city: String,
    pub reason: String,
    #[serde(default)]
    pub preferred_contact: Option<PreferredContact>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ContactForm {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
            ..Self::default()
        }
    }

    /// Name and reason are the only required fields.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.reason.trim().is_empty()
    }

    /// Switching the preferred channel clears the detail that belongs to the other one.
    pub fn prefer(&mut self, preferred: Option<PreferredContact>) {
        match preferred {
            Some(PreferredContact::Email) => self.phone = None,
            Some(PreferredContact::Phone) | Some(PreferredContact::WhatsApp) => self.email = None,
            Some(PreferredContact::NoPreference) | None => {
                self.email = None;
                self.phone = None;
            }
        }
        self.preferred_contact = preferred;
    }

    pub fn to_payload(&self) -> ContactPayload {
        ContactPayload {
            name: self.name.trim().to_string(),
            city: self.city.trim().to_string(),
            reason: self.reason.trim().to_string(),
            preferred_contact: self.preferred_contact,
            email: non_empty(self.email.as_deref()),
            phone: non_empty(self.phone.as_deref()),
            consent: true,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub name: String,
    pub city: String,
    pub reason: String,
    pub preferred_contact: Option<PreferredContact>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub consent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactAcknowledgement {
    pub submission_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ContactAcknowledgement {
    pub fn local(now: DateTime<Utc>) -> Self {
        Self {
            submission_id: format!("local-{}", now.timestamp_millis()),
            timestamp: now,
        }
    }

    pub fn is_local(&self) -> bool {
        self.submission_id.starts_with("local-")
    }
}

/// A contact request kept on the device because the backend never confirmed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredContactSubmission {
    #[serde(flatten)]
    pub payload: ContactPayload,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("name and reason are required")]
    Incomplete,
}

/// Sends contact requests. Like the questionnaire, a submission always ends in an
/// acknowledgement; failures fall back to a local record.
pub struct ContactDesk {
    adapter: Arc<dyn SubmissionAdapter>,
    analytics: Arc<dyn AnalyticsSink>,
    site: SiteState,
    timeout: Duration,
}

impl ContactDesk {
    pub fn new(
        adapter: Arc<dyn SubmissionAdapter>,
        analytics: Arc<dyn AnalyticsSink>,
        site: SiteState,
        timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            analytics,
            site,
            timeout,
        }
    }

    pub async fn submit(
        &self,
        form: &ContactForm,
    ) -> Result<ContactAcknowledgement, ContactError> {
        if !form.is_complete() {
            return Err(ContactError::Incomplete);
        }

        let payload = form.to_payload();
        let outcome = submission::bounded(self.timeout, self.adapter.submit_contact(&payload)).await;

        let acknowledgement = match outcome {
            Ok(ack) => ack,
            Err(err) => {
                tracing::warn!(error = %err, "contact submission failed, keeping it on this device");
                self.keep_locally(payload)
            }
        };

        self.analytics.track(
            AnalyticsEvent::new(EventType::ContactSubmitted, self.site.session_id())
                .with_data(json!({ "local": acknowledgement.is_local() })),
        );

        Ok(acknowledgement)
    }

    fn keep_locally(&self, payload: ContactPayload) -> ContactAcknowledgement {
        let acknowledgement = ContactAcknowledgement::local(Utc::now());
        let stored = StoredContactSubmission {
            payload,
            timestamp: acknowledgement.timestamp,
        };
        if let Err(err) = self.site.append_contact_submission(stored) {
            tracing::warn!(error = %err, "contact submission could not be stored locally");
        }
        acknowledgement
    }
}
