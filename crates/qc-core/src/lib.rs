//! qc-core: motor de evaluación de conformidad.
//!
//! - `classifier`: veredicto por parámetro (sólidos con banda de tolerancia,
//!   pH y apariencia binarios).
//! - `aggregate`: estatus global del registro a partir de sus veredictos.
//! - `lot`: composición, parseo y asignación de identificadores de lote.
//! - `store`: contrato del almacén de registros y backend en memoria.
//! - `reporting`: KPIs, Pareto y cartas de control sobre registros históricos.
//!
//! Clasificación y agregación son funciones puras; el único recurso
//! compartido es la secuencia de lote, que vive detrás de `RecordStore`.
pub mod aggregate;
pub mod classifier;
pub mod constants;
pub mod errors;
pub mod lot;
pub mod reporting;
pub mod store;

pub use aggregate::{aggregate, aggregate_scoped, Aggregation, StatusScope};
pub use classifier::{classify_appearance, classify_ph, classify_solids, Classifier, ParameterInput, PhInput,
                     SolidsInput, SolidsLimits};
pub use errors::LotAssignmentError;
pub use lot::{assign_lot_id, preview_lot_id, LotAssigner, LotId, LotKey};
pub use reporting::{build_report, DashboardReport, ReportOptions};
pub use store::{InMemoryRecordStore, RecordFilter, RecordStore, StoreError};
