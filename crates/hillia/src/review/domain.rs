use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::questionnaire::domain::{ContactInfo, PreferredContact};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Unreviewed,
    Reviewed,
    Archived,
}

impl ResponseStatus {
    pub const ALL: [Self; 3] = [Self::Unreviewed, Self::Reviewed, Self::Archived];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unreviewed => "unreviewed",
            Self::Reviewed => "reviewed",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    Reviewed,
    Archived,
}

impl ContactStatus {
    pub const ALL: [Self; 3] = [Self::New, Self::Reviewed, Self::Archived];

    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Reviewed => "reviewed",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreLevel {
    Low,
    Medium,
    High,
}

/// Reviewer-only assessment. Never returned to respondents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalScore {
    #[serde(default)]
    pub community_fit: Option<ScoreLevel>,
    #[serde(default)]
    pub lifestyle_alignment: Option<ScoreLevel>,
    #[serde(default)]
    pub decision_maturity: Option<ScoreLevel>,
}

impl InternalScore {
    pub fn is_empty(&self) -> bool {
        self.community_fit.is_none()
            && self.lifestyle_alignment.is_none()
            && self.decision_maturity.is_none()
    }
}

/// Questionnaire body as posted by the site. Stored as received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireIntake {
    pub session_id: String,
    #[serde(default = "consent_default")]
    pub consent: bool,
    #[serde(default)]
    pub sections: BTreeMap<String, Value>,
    #[serde(default)]
    pub free_text: BTreeMap<String, String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub wants_contact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactIntake {
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
    #[serde(default = "consent_default")]
    pub consent: bool,
}

fn consent_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireRecord {
    pub response_id: String,
    pub timestamp: DateTime<Utc>,
    /// Truncated SHA-256 of the respondent's device session id.
    pub session_id: String,
    pub consent: bool,
    pub sections: BTreeMap<String, Value>,
    pub free_text: BTreeMap<String, String>,
    pub contact_info: Option<ContactInfo>,
    pub wants_contact: bool,
    pub internal_score: InternalScore,
    pub internal_notes: String,
    pub status: ResponseStatus,
    pub watched: bool,
}

impl QuestionnaireRecord {
    pub fn receipt(&self) -> QuestionnaireReceipt {
        QuestionnaireReceipt {
            response_id: self.response_id.clone(),
            timestamp: self.timestamp,
            status: "received",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub submission_id: String,
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub city: String,
    pub reason: String,
    pub preferred_contact: Option<PreferredContact>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub consent: bool,
    pub status: ContactStatus,
    pub internal_notes: String,
    pub watched: bool,
}

impl ContactRecord {
    pub fn receipt(&self) -> ContactReceipt {
        ContactReceipt {
            submission_id: self.submission_id.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub event_type: String,
    pub event_data: Value,
    pub consent: bool,
}

/// What a respondent gets back: no internal fields.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireReceipt {
    pub response_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactReceipt {
    pub submission_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter<S> {
    pub status: Option<S>,
    pub watched: Option<bool>,
    pub skip: usize,
    pub limit: usize,
}

impl<S> Default for ListFilter<S> {
    fn default() -> Self {
        Self {
            status: None,
            watched: None,
            skip: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl<S> ListFilter<S> {
    pub const DEFAULT_LIMIT: usize = 50;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionnaireUpdate {
    pub status: Option<ResponseStatus>,
    pub internal_notes: Option<String>,
    pub internal_score: Option<InternalScore>,
    pub watched: Option<bool>,
}

impl QuestionnaireUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.internal_notes.is_none()
            && self.internal_score.is_none()
            && self.watched.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub status: Option<ContactStatus>,
    pub internal_notes: Option<String>,
    pub watched: Option<bool>,
}

impl ContactUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.internal_notes.is_none() && self.watched.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Share {
    pub count: usize,
    pub percentage: f64,
}

impl Share {
    pub fn of(count: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (count as f64 * 1000.0 / total as f64).round() / 10.0
        };
        Self { count, percentage }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsentSplit {
    pub yes: Share,
    pub no: Share,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionnaireStats {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, Share>,
    pub contact_consent: ConsentSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactStats {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, Share>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewStats {
    pub questionnaire: QuestionnaireStats,
    pub contact: ContactStats,
}
