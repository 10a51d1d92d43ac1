//! Reading room: stores what the questionnaire site posts and lets an admin review it.

pub mod auth;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use auth::{AdminGate, AuthError};
pub use domain::{
    AnalyticsRecord, ContactIntake, ContactRecord, ContactStatus, ContactUpdate, InternalScore,
    ListFilter, QuestionnaireIntake, QuestionnaireRecord, QuestionnaireUpdate, ResponseStatus,
    ReviewStats, ScoreLevel,
};
pub use repository::{RepositoryError, ReviewRepository};
pub use router::review_router;
pub use service::{hash_session, EventOutcome, ReviewError, ReviewService};
