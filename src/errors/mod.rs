pub mod config_error;
pub mod submission_error;

pub use config_error::ConfigError;
pub use submission_error::SubmissionError;
