//! Fire-and-forget engagement events.
//!
//! Tracking never blocks or fails the caller: events without consent are skipped,
//! transport failures are logged at debug level and dropped.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    HomepageEntry,
    InvitationOpened,
    QuestionnaireStarted,
    QuestionnaireCompleted,
    QuestionnaireDropoff,
    ContactSubmitted,
}

impl EventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HomepageEntry => "homepage_entry",
            Self::InvitationOpened => "invitation_opened",
            Self::QuestionnaireStarted => "questionnaire_started",
            Self::QuestionnaireCompleted => "questionnaire_completed",
            Self::QuestionnaireDropoff => "questionnaire_dropoff",
            Self::ContactSubmitted => "contact_submitted",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::HomepageEntry,
            Self::InvitationOpened,
            Self::QuestionnaireStarted,
            Self::QuestionnaireCompleted,
            Self::QuestionnaireDropoff,
            Self::ContactSubmitted,
        ]
        .into_iter()
        .find(|event| event.as_str() == raw.trim())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub event_type: EventType,
    pub session_id: String,
    pub consent: bool,
    pub data: Value,
}

impl AnalyticsEvent {
    pub fn new(event_type: EventType, session_id: impl Into<String>) -> Self {
        Self {
            event_type,
            session_id: session_id.into(),
            consent: true,
            data: Value::Object(Default::default()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

}

pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: AnalyticsEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        tracing::trace!(event = %event.event_type, "analytics disabled");
    }
}

/// Posts events to `<backend>/api/analytics/event` with the event identity in the query.
#[derive(Debug, Clone)]
pub struct HttpAnalytics {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalytics {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/analytics/event", base_url.trim_end_matches('/')),
        }
    }
}

impl AnalyticsSink for HttpAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        if !event.consent {
            tracing::debug!(event = %event.event_type, "analytics skipped without consent");
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(event = %event.event_type, "no runtime available, dropping analytics event");
            return;
        };

        let request = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("event_type", event.event_type.as_str()),
                ("session_id", event.session_id.as_str()),
                ("consent", "true"),
            ])
            .json(&event.data);

        handle.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "analytics event rejected");
                }
                Err(err) => tracing::debug!(error = %err, "analytics event not delivered"),
            }
        });
    }
}
