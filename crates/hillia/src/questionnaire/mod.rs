//! Community-fit questionnaire: catalog, resumable wizard, local persistence and the
//! outbound submission and analytics adapters.

pub mod analytics;
pub mod catalog;
pub mod contact;
pub mod domain;
pub mod progress;
pub mod store;
pub mod submission;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use analytics::{AnalyticsEvent, AnalyticsSink, EventType, HttpAnalytics, NoopAnalytics};
pub use catalog::{CompletionCopy, ContactStep, Question, QuestionCatalog, QuestionKind, Section};
pub use contact::{
    ContactAcknowledgement, ContactDesk, ContactError, ContactForm, ContactPayload,
    StoredContactSubmission,
};
pub use domain::{
    Answer, ContactInfo, PreferredContact, ProgressCursor, ResponseMap, WizardPhase,
};
pub use progress::{progress_percent, SectionHeading, WizardView};
pub use store::{FileStorage, MemoryStorage, ResponseStore, SiteState, StateStorage, StorageError};
pub use submission::{
    Acknowledgement, HttpSubmissionAdapter, SubmissionAdapter, SubmissionError, SubmissionPayload,
};
pub use wizard::{AutoAdvance, Navigation, Wizard, WizardContext, WizardError, WizardSettings};
