use serde::Serialize;

use super::catalog::{Question, QuestionCatalog};
use super::domain::{Answer, ProgressCursor, ResponseMap, WizardPhase};

/// Zero-based step the cursor sits on. The contact step follows the last question.
pub fn completed_steps(catalog: &QuestionCatalog, cursor: &ProgressCursor) -> usize {
    match cursor.phase {
        WizardPhase::Landing => 0,
        WizardPhase::Answering => catalog.flat_index(cursor.section_index, cursor.question_index),
        WizardPhase::ContactConsent | WizardPhase::ContactDetails => catalog.total_questions(),
        WizardPhase::Completed => total_steps(catalog),
    }
}

/// Every question plus the contact step.
pub fn total_steps(catalog: &QuestionCatalog) -> usize {
    catalog.total_questions() + 1
}

/// Whole-number progress. Only a completed questionnaire reports 100.
pub fn progress_percent(catalog: &QuestionCatalog, cursor: &ProgressCursor) -> u8 {
    if cursor.phase == WizardPhase::Completed {
        return 100;
    }

    let ratio = completed_steps(catalog, cursor) as f64 / total_steps(catalog) as f64;
    let percent = (ratio * 100.0).floor() as u8;
    percent.min(99)
}

/// Snapshot of everything a front end needs to render the current step.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub phase: WizardPhase,
    pub percent: u8,
    pub step: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionHeading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
    pub can_go_back: bool,
    pub can_continue: bool,
    pub can_submit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionHeading {
    pub id: &'static str,
    pub label: &'static str,
    pub title: &'static str,
    pub question_number: usize,
    pub question_count: usize,
}

pub(crate) struct Affordances {
    pub can_go_back: bool,
    pub can_continue: bool,
    pub can_submit: bool,
}

pub(crate) fn build_view(
    catalog: &QuestionCatalog,
    responses: &ResponseMap,
    cursor: &ProgressCursor,
    affordances: Affordances,
) -> WizardView {
    let answering = cursor.phase == WizardPhase::Answering;
    let section = catalog
        .section(cursor.section_index)
        .filter(|_| answering)
        .map(|section| SectionHeading {
            id: section.id,
            label: section.label,
            title: section.title,
            question_number: cursor.question_index + 1,
            question_count: section.questions.len(),
        });
    let question = catalog
        .question(cursor.section_index, cursor.question_index)
        .filter(|_| answering)
        .cloned();
    let answer = question
        .as_ref()
        .and_then(|question| responses.get(question.id))
        .cloned();

    WizardView {
        phase: cursor.phase,
        percent: progress_percent(catalog, cursor),
        step: completed_steps(catalog, cursor),
        total_steps: total_steps(catalog),
        section,
        question,
        answer,
        can_go_back: affordances.can_go_back,
        can_continue: affordances.can_continue,
        can_submit: affordances.can_submit,
    }
}
