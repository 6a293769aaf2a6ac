use qc_core::{LotAssignmentError, StoreError};
use qc_domain::DomainError;
use thiserror::Error;
use uuid::Uuid;

/// Errores del servicio de captura.
///
/// Separa lo que el operador debe corregir (`Validation`, precondiciones de
/// lote, `NotFound`) de lo que puede reintentar tal cual (fallas de almacén).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("{0}")]
    Validation(#[from] DomainError),
    #[error("{0}")]
    LotAssignment(#[from] LotAssignmentError),
    /// Falla al persistir después de asignar el lote.
    #[error("no se pudo guardar el registro (lote {}): {source}", .lot_id.as_deref().unwrap_or("-"))]
    Store { lot_id: Option<String>, source: StoreError },
    #[error("registro no encontrado: {0}")]
    NotFound(Uuid),
}

impl SubmissionError {
    pub(crate) fn store(source: StoreError) -> Self {
        match source {
            StoreError::NotFound(id) => SubmissionError::NotFound(id),
            source => SubmissionError::Store { lot_id: None,
                                               source },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            SubmissionError::Store { .. } | SubmissionError::LotAssignment(LotAssignmentError::Store(_)) => true,
            SubmissionError::Validation(_)
            | SubmissionError::LotAssignment(LotAssignmentError::Precondition { .. })
            | SubmissionError::NotFound(_) => false,
        }
    }

    /// Mensaje para el operador.
    pub fn user_message(&self) -> String {
        if self.is_retryable() {
            format!("No se pudo completar la operación, intente de nuevo. ({self})")
        } else {
            format!("Revise los datos capturados: {self}")
        }
    }
}
