use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::{QuestionCatalog, QuestionKind};
use super::contact::{ContactAcknowledgement, ContactPayload};
use super::domain::{ContactInfo, ResponseMap};

/// Body posted to the submission endpoint once the respondent finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub session_id: String,
    pub consent: bool,
    pub sections: BTreeMap<String, BTreeMap<String, Value>>,
    pub free_text: BTreeMap<String, String>,
    pub contact_info: Option<ContactInfo>,
    pub wants_contact: bool,
}

impl SubmissionPayload {
    /// Groups non-text answers by section and routes text answers into `free_text`.
    /// Sections with nothing but text answers (or nothing at all) are left out.
    pub fn build(catalog: &QuestionCatalog, responses: &ResponseMap, session_id: &str) -> Self {
        let mut sections = BTreeMap::new();
        let mut free_text = BTreeMap::new();

        for section in catalog.sections() {
            let mut answered = BTreeMap::new();
            for question in &section.questions {
                let Some(answer) = responses.get(question.id) else {
                    continue;
                };
                if answer.kind() != question.kind {
                    continue;
                }
                match question.kind {
                    QuestionKind::Text => {
                        if let Value::String(text) = answer.to_wire() {
                            free_text.insert(question.id.to_string(), text);
                        }
                    }
                    _ => {
                        answered.insert(question.id.to_string(), answer.to_wire());
                    }
                }
            }
            if !answered.is_empty() {
                sections.insert(section.id.to_string(), answered);
            }
        }

        let wants_contact = responses.wants_contact() == Some(true);
        let contact_info = if wants_contact {
            Some(responses.contact_info().cloned().unwrap_or_default())
        } else {
            None
        };

        Self {
            session_id: session_id.to_string(),
            consent: true,
            sections,
            free_text,
            contact_info,
            wants_contact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub response_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

impl Acknowledgement {
    pub const LOCAL_PREFIX: &'static str = "local-";

    /// Acknowledgement recorded when the submission endpoint could not be reached.
    pub fn local(now: DateTime<Utc>) -> Self {
        Self {
            response_id: format!("{}{}", Self::LOCAL_PREFIX, now.timestamp_millis()),
            timestamp: now,
            status: "received".to_string(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.response_id.starts_with(Self::LOCAL_PREFIX)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission transport failed: {0}")]
    Transport(String),
    #[error("submission rejected with status {status}")]
    Rejected { status: u16 },
    #[error("submission timed out after {0:?}")]
    Timeout(Duration),
    #[error("submission response could not be decoded: {0}")]
    Decode(String),
}

/// Outbound boundary for everything the respondent sends to the backend.
#[async_trait]
pub trait SubmissionAdapter: Send + Sync {
    async fn submit_questionnaire(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<Acknowledgement, SubmissionError>;

    async fn submit_contact(
        &self,
        payload: &ContactPayload,
    ) -> Result<ContactAcknowledgement, SubmissionError>;
}

/// Awaits an adapter call for at most `timeout`.
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, SubmissionError>
where
    F: std::future::Future<Output = Result<T, SubmissionError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(SubmissionError::Timeout(timeout)))
}

/// JSON-over-HTTP adapter for the reading-room backend.
#[derive(Debug, Clone)]
pub struct HttpSubmissionAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSubmissionAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, SubmissionError>
    where
        B: Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| SubmissionError::Decode(err.to_string()))
    }
}

fn map_transport_error(err: reqwest::Error) -> SubmissionError {
    if err.is_timeout() {
        SubmissionError::Transport(format!("request timed out: {err}"))
    } else {
        SubmissionError::Transport(err.to_string())
    }
}

#[async_trait]
impl SubmissionAdapter for HttpSubmissionAdapter {
    async fn submit_questionnaire(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<Acknowledgement, SubmissionError> {
        self.post_json("/api/questionnaire", payload).await
    }

    async fn submit_contact(
        &self,
        payload: &ContactPayload,
    ) -> Result<ContactAcknowledgement, SubmissionError> {
        self.post_json("/api/contact", payload).await
    }
}
