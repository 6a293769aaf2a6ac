// error.rs
use thiserror::Error;

/// Error del dominio de registros de calidad.
///
/// `Validation` siempre nombra el campo afectado para que el operador sepa
/// qué corregir antes de reenviar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Campo inválido `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("Catálogo inválido: {0}")]
    Catalog(String),

    #[error("Error de serialización: {0}")]
    Serialization(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::Validation { field: field.into(),
                                  reason: reason.into() }
    }

    /// Campo asociado al error, si aplica.
    pub fn field(&self) -> Option<&str> {
        match self {
            DomainError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

// Conversión desde serde_json::Error a DomainError
impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}
