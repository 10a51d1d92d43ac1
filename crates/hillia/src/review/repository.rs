use super::domain::{AnalyticsRecord, ContactRecord, QuestionnaireRecord};

/// Storage for everything the reading room receives. Listing returns records in
/// insertion order; filtering and paging happen in the service.
pub trait ReviewRepository: Send + Sync {
    fn insert_questionnaire(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError>;
    fn questionnaires(&self) -> Result<Vec<QuestionnaireRecord>, RepositoryError>;
    fn questionnaire(&self, response_id: &str)
        -> Result<Option<QuestionnaireRecord>, RepositoryError>;
    fn update_questionnaire(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError>;
    fn delete_questionnaire(&self, response_id: &str) -> Result<(), RepositoryError>;

    fn insert_contact(&self, record: ContactRecord) -> Result<(), RepositoryError>;
    fn contacts(&self) -> Result<Vec<ContactRecord>, RepositoryError>;
    fn contact(&self, submission_id: &str) -> Result<Option<ContactRecord>, RepositoryError>;
    fn update_contact(&self, record: ContactRecord) -> Result<(), RepositoryError>;
    fn delete_contact(&self, submission_id: &str) -> Result<(), RepositoryError>;

    fn insert_event(&self, record: AnalyticsRecord) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
