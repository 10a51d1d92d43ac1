pub mod config;
pub mod error;
pub mod questionnaire;
pub mod review;
pub mod telemetry;
