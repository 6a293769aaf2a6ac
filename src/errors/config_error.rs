use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Variable inválida {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
    #[error("No se pudo cargar el catálogo: {0}")]
    Catalog(#[from] qc_domain::DomainError),
}
