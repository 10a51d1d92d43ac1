use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::catalog::{Question, QuestionCatalog, QuestionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    Landing,
    Answering,
    ContactConsent,
    ContactDetails,
    Completed,
}

impl WizardPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Answering => "answering",
            Self::ContactConsent => "contact consent",
            Self::ContactDetails => "contact details",
            Self::Completed => "completed",
        }
    }

    pub const fn is_contact(self) -> bool {
        matches!(self, Self::ContactConsent | Self::ContactDetails)
    }
}

impl fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Position of the wizard. While in a contact phase the indices keep pointing at the
/// final question so Back lands there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCursor {
    pub section_index: usize,
    pub question_index: usize,
    pub phase: WizardPhase,
}

impl ProgressCursor {
    pub const fn landing() -> Self {
        Self {
            section_index: 0,
            question_index: 0,
            phase: WizardPhase::Landing,
        }
    }

    pub const fn answering(section_index: usize, question_index: usize) -> Self {
        Self {
            section_index,
            question_index,
            phase: WizardPhase::Answering,
        }
    }
}

impl Default for ProgressCursor {
    fn default() -> Self {
        Self::landing()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreferredContact {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "phone")]
    Phone,
    #[serde(rename = "whatsapp")]
    WhatsApp,
    #[serde(rename = "no_preference")]
    NoPreference,
}

impl PreferredContact {
    pub const fn ordered() -> [Self; 4] {
        [Self::Email, Self::Phone, Self::WhatsApp, Self::NoPreference]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::WhatsApp => "WhatsApp",
            Self::NoPreference => "No preference",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(&['-', '_'][..], " ");
        Self::ordered()
            .into_iter()
            .find(|candidate| candidate.label().to_ascii_lowercase() == normalized)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_contact: Option<PreferredContact>,
}

impl ContactInfo {
    /// True once any of preferred method, email or phone has been supplied.
    pub fn has_any(&self) -> bool {
        self.preferred_contact.is_some()
            || self.email.as_deref().is_some_and(|value| !value.trim().is_empty())
            || self.phone.as_deref().is_some_and(|value| !value.trim().is_empty())
    }
}

/// A recorded answer, tagged with the kind of question it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Single(String),
    Multiselect(Vec<String>),
    Matrix(BTreeMap<String, String>),
    Text(String),
}

impl Answer {
    pub const fn kind(&self) -> QuestionKind {
        match self {
            Self::Single(_) => QuestionKind::Single,
            Self::Multiselect(_) => QuestionKind::Multiselect,
            Self::Matrix(_) => QuestionKind::Matrix,
            Self::Text(_) => QuestionKind::Text,
        }
    }

    /// Bare JSON value as the submission API expects it.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Single(value) | Self::Text(value) => Value::String(value.clone()),
            Self::Multiselect(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
            Self::Matrix(cells) => Value::Object(
                cells
                    .iter()
                    .map(|(row, column)| (row.clone(), Value::String(column.clone())))
                    .collect(),
            ),
        }
    }

    /// Whether this answer fully answers `question`, ignoring the optional flag.
    pub fn answers(&self, question: &Question) -> bool {
        match self {
            Self::Single(value) | Self::Text(value) => !value.is_empty(),
            Self::Multiselect(values) => !values.is_empty(),
            Self::Matrix(cells) => question.rows.iter().all(|row| cells.contains_key(*row)),
        }
    }
}

/// Everything the respondent has entered so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMap {
    #[serde(default)]
    answers: BTreeMap<String, Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wants_contact: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contact_info: Option<ContactInfo>,
}

impl ResponseMap {
    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    pub fn insert(&mut self, question_id: impl Into<String>, answer: Answer) {
        self.answers.insert(question_id.into(), answer);
    }

    pub fn remove(&mut self, question_id: &str) -> Option<Answer> {
        self.answers.remove(question_id)
    }

    pub fn answers(&self) -> &BTreeMap<String, Answer> {
        &self.answers
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.wants_contact.is_none()
    }

    pub fn wants_contact(&self) -> Option<bool> {
        self.wants_contact
    }

    pub fn contact_info(&self) -> Option<&ContactInfo> {
        self.contact_info.as_ref()
    }

    /// Records the consent decision. Opting out discards any captured details.
    pub fn set_wants_contact(&mut self, wants_contact: bool) {
        self.wants_contact = Some(wants_contact);
        if wants_contact {
            self.contact_info.get_or_insert_with(ContactInfo::default);
        } else {
            self.contact_info = None;
        }
    }

    pub fn contact_info_mut(&mut self) -> Option<&mut ContactInfo> {
        if self.wants_contact == Some(true) {
            Some(self.contact_info.get_or_insert_with(ContactInfo::default))
        } else {
            None
        }
    }

    /// Whether `question` (inside `section_optional`) lets the respondent move on.
    pub fn permits_continue(&self, question: &Question, section_optional: bool) -> bool {
        question.optional || section_optional || self.is_answered(question)
    }

    pub fn is_answered(&self, question: &Question) -> bool {
        self.answers
            .get(question.id)
            .is_some_and(|answer| answer.kind() == question.kind && answer.answers(question))
    }

    /// Drops answers that no longer line up with the catalog: unknown question ids and
    /// answers whose kind disagrees with the declared question kind.
    /// Returns how many entries were discarded.
    pub fn reconcile(&mut self, catalog: &QuestionCatalog) -> usize {
        let before = self.answers.len();
        self.answers.retain(|question_id, answer| {
            match catalog.find_question(question_id) {
                Some((_, question)) if question.kind == answer.kind() => true,
                Some((_, question)) => {
                    tracing::warn!(
                        question_id = %question_id,
                        expected = %question.kind,
                        found = %answer.kind(),
                        "discarding persisted answer with mismatched kind"
                    );
                    false
                }
                None => {
                    tracing::debug!(question_id = %question_id, "discarding answer for retired question");
                    false
                }
            }
        });
        if self.wants_contact != Some(true) {
            self.contact_info = None;
        }
        before - self.answers.len()
    }
}
