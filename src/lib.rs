//! qcflow
//!
//! Capa de aplicación del motor de conformidad de lotes:
//! - `config`: variables de entorno (.env), catálogo y alcance del tablero.
//! - `errors`: errores de configuración y de captura.
//! - `submission`: servicio de captura, edición, borrado y reportes sobre un
//!   `RecordStore`.
//!
//! Puede usarse desde `main.rs`, desde `qc-cli` o por otros clientes.

pub mod config;
pub mod errors;
pub mod submission;

pub use config::AppConfig;
pub use errors::{ConfigError, SubmissionError};
pub use submission::{Actor, Evaluation, SubmissionOutcome, SubmissionService};
