//! The questionnaire state machine.
//!
//! A `Wizard` owns the cursor and the answers for one respondent on one device. Every
//! transition is a synchronous `&mut self` call that persists through the injected
//! [`ResponseStore`] before returning; only [`Wizard::submit`] awaits anything.
//!
//! ```text
//! landing -> answering(i, j) -> contact_consent -> contact_details -> completed
//!                 ^                    |                  |
//!                 +------ back --------+------------------+
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use super::analytics::{AnalyticsEvent, AnalyticsSink, EventType};
use super::catalog::{Question, QuestionCatalog, QuestionKind};
use super::domain::{
    Answer, ContactInfo, PreferredContact, ProgressCursor, ResponseMap, WizardPhase,
};
use super::progress::{self, Affordances, WizardView};
use super::store::{ResponseStore, SiteState};
use super::submission::{self, Acknowledgement, SubmissionAdapter, SubmissionPayload};
use crate::config::QuestionnaireConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardSettings {
    pub auto_advance_delay: Duration,
    pub submit_timeout: Duration,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self::from(&QuestionnaireConfig::default())
    }
}

impl From<&QuestionnaireConfig> for WizardSettings {
    fn from(config: &QuestionnaireConfig) -> Self {
        Self {
            auto_advance_delay: config.auto_advance_delay,
            submit_timeout: config.submit_timeout,
        }
    }
}

/// Collaborators injected into the wizard.
#[derive(Clone)]
pub struct WizardContext {
    pub store: ResponseStore,
    pub site: SiteState,
    pub adapter: Arc<dyn SubmissionAdapter>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved,
    /// The current question still needs an answer.
    Blocked,
    Unchanged,
}

impl Navigation {
    pub fn is_moved(self) -> bool {
        self == Self::Moved
    }
}

/// Returned by a single-select pick. The caller advances after `delay`, or at once.
#[must_use = "single-select answers advance through the returned token"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoAdvance {
    pub delay: Duration,
}

impl AutoAdvance {
    pub async fn elapsed(self) {
        tokio::time::sleep(self.delay).await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("the questionnaire has been submitted and can no longer change")]
    Frozen,
    #[error("no question is active while the wizard is in the {phase} phase")]
    NoActiveQuestion { phase: WizardPhase },
    #[error("question {question_id} expects a {expected} answer, not {attempted}")]
    KindMismatch {
        question_id: &'static str,
        expected: QuestionKind,
        attempted: QuestionKind,
    },
    #[error("contact preferences cannot be edited in the {phase} phase")]
    ContactStepInactive { phase: WizardPhase },
    #[error("contact details are only kept after opting in to contact")]
    ContactNotRequested,
    #[error("the questionnaire cannot be submitted from the {phase} phase")]
    NotSubmittable { phase: WizardPhase },
    #[error("start over is only available after submitting, not in the {phase} phase")]
    NotCompleted { phase: WizardPhase },
}

pub struct Wizard {
    catalog: Arc<QuestionCatalog>,
    context: WizardContext,
    settings: WizardSettings,
    responses: ResponseMap,
    cursor: ProgressCursor,
    acknowledgement: Option<Acknowledgement>,
}

impl Wizard {
    /// Rehydrates from the store. Missing or corrupt state starts at the landing screen;
    /// answers that no longer fit the catalog are dropped and a stale cursor is reset.
    pub fn resume(
        catalog: Arc<QuestionCatalog>,
        context: WizardContext,
        settings: WizardSettings,
    ) -> Self {
        let stored_responses = context.store.load();
        let stored_cursor = context.store.load_cursor();
        let had_state = stored_responses.is_some() || stored_cursor.is_some();

        let mut responses = stored_responses.unwrap_or_default();
        let discarded = responses.reconcile(&catalog);
        let cursor = stored_cursor.unwrap_or_default();
        let restored = restore_cursor(&catalog, &responses, cursor);

        let wizard = Self {
            catalog,
            context,
            settings,
            responses,
            cursor: restored,
            acknowledgement: None,
        };

        if discarded > 0 || restored != cursor {
            tracing::info!(
                discarded,
                phase = %restored.phase,
                "repaired persisted questionnaire state"
            );
            wizard.persist();
        } else if had_state {
            tracing::debug!(
                phase = %restored.phase,
                section = restored.section_index,
                question = restored.question_index,
                "resumed questionnaire"
            );
        }

        wizard
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> WizardSettings {
        self.settings
    }

    pub fn cursor(&self) -> ProgressCursor {
        self.cursor
    }

    pub fn phase(&self) -> WizardPhase {
        self.cursor.phase
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    /// Acknowledgement of the submission made by this wizard instance, if any.
    pub fn acknowledgement(&self) -> Option<&Acknowledgement> {
        self.acknowledgement.as_ref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.cursor.phase != WizardPhase::Answering {
            return None;
        }
        self.catalog
            .question(self.cursor.section_index, self.cursor.question_index)
    }

    pub fn begin(&mut self) -> Navigation {
        if self.cursor.phase != WizardPhase::Landing {
            return Navigation::Unchanged;
        }

        self.cursor = if self.catalog.is_empty() {
            ProgressCursor {
                phase: WizardPhase::ContactConsent,
                ..ProgressCursor::landing()
            }
        } else {
            ProgressCursor::answering(0, 0)
        };
        self.persist();
        self.track(EventType::QuestionnaireStarted, json!({}));
        tracing::debug!(phase = %self.cursor.phase, "questionnaire started");
        Navigation::Moved
    }

    pub fn select_single(&mut self, option: impl Into<String>) -> Result<AutoAdvance, WizardError> {
        let question_id = self.active_question(QuestionKind::Single)?.id;
        self.responses
            .insert(question_id, Answer::Single(option.into()));
        self.persist();
        Ok(AutoAdvance {
            delay: self.settings.auto_advance_delay,
        })
    }

    /// Adds or removes `option`. Returns whether the option is selected afterwards.
    /// Adding beyond the cap leaves the selection untouched.
    pub fn toggle_multiselect(&mut self, option: impl Into<String>) -> Result<bool, WizardError> {
        let question = self.active_question(QuestionKind::Multiselect)?;
        let (question_id, cap) = (question.id, question.selection_cap());
        let option = option.into();

        let mut selected = match self.responses.get(question_id) {
            Some(Answer::Multiselect(values)) => values.clone(),
            _ => Vec::new(),
        };

        let now_selected = if let Some(position) = selected.iter().position(|value| *value == option) {
            selected.remove(position);
            false
        } else if selected.len() < cap {
            selected.push(option);
            true
        } else {
            tracing::debug!(question_id, cap, "selection cap reached, ignoring option");
            return Ok(false);
        };

        if selected.is_empty() {
            self.responses.remove(question_id);
        } else {
            self.responses
                .insert(question_id, Answer::Multiselect(selected));
        }
        self.persist();
        Ok(now_selected)
    }

    pub fn set_matrix_cell(
        &mut self,
        row: impl Into<String>,
        column: impl Into<String>,
    ) -> Result<(), WizardError> {
        let question_id = self.active_question(QuestionKind::Matrix)?.id;
        let mut cells = match self.responses.get(question_id) {
            Some(Answer::Matrix(cells)) => cells.clone(),
            _ => Default::default(),
        };
        cells.insert(row.into(), column.into());
        self.responses.insert(question_id, Answer::Matrix(cells));
        self.persist();
        Ok(())
    }

    pub fn set_text(&mut self, value: impl Into<String>) -> Result<(), WizardError> {
        let question_id = self.active_question(QuestionKind::Text)?.id;
        self.responses.insert(question_id, Answer::Text(value.into()));
        self.persist();
        Ok(())
    }

    pub fn advance(&mut self) -> Navigation {
        if self.cursor.phase != WizardPhase::Answering {
            return Navigation::Unchanged;
        }
        if !self.can_continue() {
            return Navigation::Blocked;
        }

        let ProgressCursor {
            section_index,
            question_index,
            ..
        } = self.cursor;
        let section_len = self
            .catalog
            .section(section_index)
            .map_or(0, |section| section.questions.len());

        self.cursor = if question_index + 1 < section_len {
            ProgressCursor::answering(section_index, question_index + 1)
        } else if section_index + 1 < self.catalog.sections().len() {
            ProgressCursor::answering(section_index + 1, 0)
        } else {
            ProgressCursor {
                phase: WizardPhase::ContactConsent,
                ..self.cursor
            }
        };
        self.persist();
        Navigation::Moved
    }

    pub fn retreat(&mut self) -> Navigation {
        let target = match self.cursor.phase {
            WizardPhase::Landing | WizardPhase::Completed => None,
            WizardPhase::ContactConsent | WizardPhase::ContactDetails => self
                .catalog
                .last_position()
                .map(|(section, question)| ProgressCursor::answering(section, question)),
            WizardPhase::Answering => match (self.cursor.section_index, self.cursor.question_index) {
                (0, 0) => None,
                (section, 0) => self
                    .catalog
                    .section(section - 1)
                    .map(|previous| ProgressCursor::answering(section - 1, previous.questions.len() - 1)),
                (section, question) => Some(ProgressCursor::answering(section, question - 1)),
            },
        };

        match target {
            Some(cursor) => {
                self.cursor = cursor;
                self.persist();
                Navigation::Moved
            }
            None => Navigation::Unchanged,
        }
    }

    /// Records the contact decision. Opting in opens the details step, opting out
    /// discards any details and returns to the consent step.
    pub fn choose_contact(&mut self, wants_contact: bool) -> Result<Navigation, WizardError> {
        self.ensure_contact_step()?;

        self.responses.set_wants_contact(wants_contact);
        let phase = if wants_contact {
            WizardPhase::ContactDetails
        } else {
            WizardPhase::ContactConsent
        };
        let moved = phase != self.cursor.phase;
        self.cursor.phase = phase;
        self.persist();

        Ok(if moved {
            Navigation::Moved
        } else {
            Navigation::Unchanged
        })
    }

    pub fn set_preferred_contact(
        &mut self,
        preferred: Option<PreferredContact>,
    ) -> Result<(), WizardError> {
        self.edit_contact(|info| info.preferred_contact = preferred)
    }

    pub fn set_email(&mut self, email: impl Into<String>) -> Result<(), WizardError> {
        let email = blank_to_none(email.into());
        self.edit_contact(|info| info.email = email)
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) -> Result<(), WizardError> {
        let phone = blank_to_none(phone.into());
        self.edit_contact(|info| info.phone = phone)
    }

    pub fn can_go_back(&self) -> bool {
        match self.cursor.phase {
            WizardPhase::Landing | WizardPhase::Completed => false,
            WizardPhase::ContactConsent | WizardPhase::ContactDetails => !self.catalog.is_empty(),
            WizardPhase::Answering => self.cursor.section_index > 0 || self.cursor.question_index > 0,
        }
    }

    /// Whether the current question lets the respondent move forward.
    pub fn can_continue(&self) -> bool {
        if self.cursor.phase != WizardPhase::Answering {
            return false;
        }
        let Some(section) = self.catalog.section(self.cursor.section_index) else {
            return false;
        };
        section
            .questions
            .get(self.cursor.question_index)
            .is_some_and(|question| self.responses.permits_continue(question, section.optional))
    }

    /// Whether the submit control should be enabled. Advisory: [`Wizard::submit`] accepts
    /// a contact-details step with nothing filled in.
    pub fn can_submit(&self) -> bool {
        match self.cursor.phase {
            WizardPhase::ContactConsent => self.responses.wants_contact() == Some(false),
            WizardPhase::ContactDetails => self
                .responses
                .contact_info()
                .is_some_and(|info| info.has_any()),
            _ => false,
        }
    }

    /// Sends the answers and completes the questionnaire. An unreachable or failing
    /// backend yields a locally minted acknowledgement; the respondent always finishes.
    ///
    /// The phase becomes `Completed` only after the adapter answers or
    /// `WizardSettings::submit_timeout` elapses, so a stalled backend delays completion
    /// by at most that long.
    pub async fn submit(&mut self) -> Result<Acknowledgement, WizardError> {
        match self.cursor.phase {
            WizardPhase::Completed => return Err(WizardError::Frozen),
            WizardPhase::ContactDetails => {}
            WizardPhase::ContactConsent if self.responses.wants_contact() == Some(false) => {}
            phase => return Err(WizardError::NotSubmittable { phase }),
        }

        if self.cursor.phase == WizardPhase::ContactDetails && !self.can_submit() {
            tracing::debug!("submitting without contact details");
        }

        let session_id = self.context.site.session_id();
        let payload = SubmissionPayload::build(&self.catalog, &self.responses, &session_id);
        let timeout = self.settings.submit_timeout;

        let outcome =
            submission::bounded(timeout, self.context.adapter.submit_questionnaire(&payload)).await;
        let acknowledgement = match outcome {
            Ok(acknowledgement) => {
                tracing::info!(
                    response_id = %acknowledgement.response_id,
                    "questionnaire submitted"
                );
                acknowledgement
            }
            Err(err) => {
                tracing::warn!(error = %err, "questionnaire submission failed, completing locally");
                Acknowledgement::local(Utc::now())
            }
        };

        self.cursor.phase = WizardPhase::Completed;
        if let Err(err) = self.context.store.save_cursor(&self.cursor) {
            tracing::warn!(error = %err, "completed cursor could not be saved");
        }
        if let Err(err) = self.context.store.discard_responses() {
            tracing::warn!(error = %err, "submitted answers could not be cleared");
        }

        self.track(
            EventType::QuestionnaireCompleted,
            json!({
                "wants_contact": payload.wants_contact,
                "local": acknowledgement.is_local(),
            }),
        );
        self.acknowledgement = Some(acknowledgement.clone());
        Ok(acknowledgement)
    }

    pub fn start_over(&mut self) -> Result<(), WizardError> {
        if self.cursor.phase != WizardPhase::Completed {
            return Err(WizardError::NotCompleted {
                phase: self.cursor.phase,
            });
        }

        self.responses = ResponseMap::default();
        self.cursor = ProgressCursor::landing();
        self.acknowledgement = None;
        if let Err(err) = self.context.store.clear() {
            tracing::warn!(error = %err, "questionnaire state could not be cleared");
        }
        Ok(())
    }

    /// Reports that the respondent walked away mid-questionnaire. State is untouched.
    pub fn record_dropoff(&self) {
        if matches!(
            self.cursor.phase,
            WizardPhase::Landing | WizardPhase::Completed
        ) {
            return;
        }
        self.track(
            EventType::QuestionnaireDropoff,
            json!({
                "phase": self.cursor.phase,
                "section_index": self.cursor.section_index,
                "question_index": self.cursor.question_index,
                "percent": self.progress_percent(),
            }),
        );
    }

    pub fn progress_percent(&self) -> u8 {
        progress::progress_percent(&self.catalog, &self.cursor)
    }

    pub fn completion_message(&self) -> &'static str {
        if self.responses.wants_contact() == Some(true) {
            self.catalog.completion.message
        } else {
            self.catalog.completion.anonymous_message
        }
    }

    pub fn view(&self) -> WizardView {
        progress::build_view(
            &self.catalog,
            &self.responses,
            &self.cursor,
            Affordances {
                can_go_back: self.can_go_back(),
                can_continue: self.can_continue(),
                can_submit: self.can_submit(),
            },
        )
    }

    fn active_question(&self, attempted: QuestionKind) -> Result<&Question, WizardError> {
        match self.cursor.phase {
            WizardPhase::Completed => return Err(WizardError::Frozen),
            WizardPhase::Answering => {}
            phase => return Err(WizardError::NoActiveQuestion { phase }),
        }

        let question = self
            .catalog
            .question(self.cursor.section_index, self.cursor.question_index)
            .ok_or(WizardError::NoActiveQuestion {
                phase: self.cursor.phase,
            })?;

        if question.kind != attempted {
            return Err(WizardError::KindMismatch {
                question_id: question.id,
                expected: question.kind,
                attempted,
            });
        }
        Ok(question)
    }

    fn ensure_contact_step(&self) -> Result<(), WizardError> {
        match self.cursor.phase {
            WizardPhase::Completed => Err(WizardError::Frozen),
            phase if phase.is_contact() => Ok(()),
            phase => Err(WizardError::ContactStepInactive { phase }),
        }
    }

    fn edit_contact(
        &mut self,
        edit: impl FnOnce(&mut ContactInfo),
    ) -> Result<(), WizardError> {
        match self.cursor.phase {
            WizardPhase::Completed => return Err(WizardError::Frozen),
            WizardPhase::ContactDetails => {}
            phase => return Err(WizardError::ContactStepInactive { phase }),
        }

        let info = self
            .responses
            .contact_info_mut()
            .ok_or(WizardError::ContactNotRequested)?;
        edit(info);
        self.persist();
        Ok(())
    }

    fn persist(&self) {
        if let Err(err) = self.context.store.persist(&self.responses, &self.cursor) {
            tracing::warn!(error = %err, "questionnaire state could not be saved");
        }
    }

    fn track(&self, event_type: EventType, data: serde_json::Value) {
        let session_id = self.context.site.session_id();
        self.context
            .analytics
            .track(AnalyticsEvent::new(event_type, session_id).with_data(data));
    }
}

fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Brings a persisted cursor back inside the catalog.
fn restore_cursor(
    catalog: &QuestionCatalog,
    responses: &ResponseMap,
    cursor: ProgressCursor,
) -> ProgressCursor {
    match cursor.phase {
        WizardPhase::Landing => ProgressCursor::landing(),
        WizardPhase::Answering => {
            if catalog.contains_position(cursor.section_index, cursor.question_index) {
                cursor
            } else {
                tracing::warn!(
                    section = cursor.section_index,
                    question = cursor.question_index,
                    "persisted cursor is outside the catalog, restarting"
                );
                ProgressCursor::landing()
            }
        }
        WizardPhase::ContactConsent | WizardPhase::ContactDetails => {
            let (section_index, question_index) = catalog.last_position().unwrap_or((0, 0));
            let phase = if cursor.phase == WizardPhase::ContactDetails
                && responses.wants_contact() == Some(true)
            {
                WizardPhase::ContactDetails
            } else {
                WizardPhase::ContactConsent
            };
            ProgressCursor {
                section_index,
                question_index,
                phase,
            }
        }
        WizardPhase::Completed => ProgressCursor {
            phase: WizardPhase::Completed,
            ..cursor
        },
    }
}
