//! Contrato del almacén de registros de lote.
//!
//! El motor sólo conoce este trait; la implementación durable (Postgres) vive
//! en `qc-persistence` y la implementación en memoria en `memory`.
//!
//! Contrato de secuencia:
//! - `count_lots` cuenta registros con lote presente, no vacío y distinto de
//!   `EMPTY_LOT_MARKER` para la clave (sucursal, producto, fecha). Es una
//!   lectura: dos llamadas concurrentes pueden ver el mismo conteo.
//! - `reserve_sequence` reserva atómicamente el siguiente consecutivo para la
//!   clave. Nunca devuelve el mismo valor dos veces para una misma clave.
//! - `insert` rechaza un identificador de lote ya existente con
//!   `StoreError::DuplicateLot`.
pub mod memory;

use chrono::NaiveDate;
use qc_domain::{BatchRecord, NewBatchRecord, OverallStatus, RecordEdit};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::EMPTY_LOT_MARKER;
use crate::lot::LotKey;

pub use memory::InMemoryRecordStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("registro no encontrado: {0}")]
    NotFound(Uuid),
    #[error("identificador de lote duplicado: {0}")]
    DuplicateLot(String),
    #[error("almacén no disponible: {0}")]
    Unavailable(String),
    #[error("error de almacén: {0}")]
    Backend(String),
}

impl StoreError {
    /// El usuario puede reintentar la misma operación.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::DuplicateLot(_))
    }
}

/// `true` si el lote cuenta para la secuencia de su clave.
pub fn lot_counts(lot_id: Option<&str>) -> bool {
    matches!(lot_id.map(str::trim), Some(l) if !l.is_empty() && l != EMPTY_LOT_MARKER)
}

/// Filtros de consulta. Los campos `None` no restringen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub branch: Option<String>,
    pub product_code: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<OverallStatus>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn product(mut self, code: impl Into<String>) -> Self {
        self.product_code = Some(code.into());
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn status(mut self, status: OverallStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, record: &BatchRecord) -> bool {
        let d = &record.data;
        self.branch.as_ref().map_or(true, |b| &d.branch == b)
        && self.product_code.as_ref().map_or(true, |p| &d.product_code == p)
        && self.date_from.map_or(true, |from| d.manufacture_date >= from)
        && self.date_to.map_or(true, |to| d.manufacture_date <= to)
        && self.status.map_or(true, |s| record.status == s)
    }
}

/// Almacén durable y consultable de registros de lote.
///
/// Las implementaciones deben ser seguras para uso concurrente: capturas y
/// reportes pueden correr al mismo tiempo.
pub trait RecordStore: Send + Sync {
    fn count_lots(&self, key: &LotKey) -> Result<u64, StoreError>;
    fn reserve_sequence(&self, key: &LotKey) -> Result<u32, StoreError>;
    fn insert(&self, record: NewBatchRecord) -> Result<Uuid, StoreError>;
    fn get(&self, id: Uuid) -> Result<Option<BatchRecord>, StoreError>;
    /// Registros que cumplen el filtro en orden de creación.
    fn query(&self, filter: &RecordFilter) -> Result<Vec<BatchRecord>, StoreError>;
    fn update(&self, id: Uuid, edit: &RecordEdit) -> Result<BatchRecord, StoreError>;
    /// Lectura, cálculo del cambio y escritura como una sola operación
    /// atómica por registro. Ediciones concurrentes del mismo `id` se
    /// serializan: cada una parte del resultado de la anterior.
    fn update_with(&self, id: Uuid, edit: &dyn Fn(&BatchRecord) -> RecordEdit) -> Result<BatchRecord, StoreError>;
    fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}
