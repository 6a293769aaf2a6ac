//! Errores del motor.

use thiserror::Error;

use crate::store::StoreError;

/// Falla al asignar un identificador de lote. Siempre es fatal para la
/// captura: un registro no se persiste sin lote.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LotAssignmentError {
    #[error("precondición de lote incumplida en `{field}`: {reason}")]
    Precondition { field: String, reason: String },
    #[error("no se pudo obtener la secuencia de lote: {0}")]
    Store(#[from] StoreError),
}

impl LotAssignmentError {
    pub(crate) fn precondition(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LotAssignmentError::Precondition { field: field.into(),
                                           reason: reason.into() }
    }
}
