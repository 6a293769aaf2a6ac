// qc-domain library entry point
pub mod catalog;
pub mod error;
pub mod parameter;
pub mod record;
pub mod standard;
pub mod submission;
pub use catalog::StandardsCatalog;
pub use error::DomainError;
pub use parameter::{Parameter, Verdict};
pub use record::{AdminEdit, BatchData, BatchRecord, NewBatchRecord, OverallStatus, RecordEdit, SelfReport, SolidsReading,
                 solids_mean};
pub use standard::{AppearanceStandard, BatchUnit, ParameterApplicability, PhStandard, Product, ProductFamily, ProductStandard};
pub use submission::SubmissionInput;
