//! Parámetros medidos y veredictos de conformidad.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parámetro fisicoquímico evaluado en un lote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Solids,
    Ph,
    Appearance,
}

impl Parameter {
    /// Orden en el que se evalúa un registro (y en el que se listan fallas).
    pub const EVALUATION_ORDER: [Parameter; 3] = [Parameter::Solids, Parameter::Ph, Parameter::Appearance];

    /// Orden de catálogo para el diagrama de Pareto (desempates).
    pub const PARETO_ORDER: [Parameter; 3] = [Parameter::Ph, Parameter::Solids, Parameter::Appearance];

    /// Nombre estable usado en reportes y en la lista de parámetros fallidos.
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Solids => "solids",
            Parameter::Ph => "pH",
            Parameter::Appearance => "appearance",
        }
    }

    /// Etiqueta legible para tableros.
    pub fn label(&self) -> &'static str {
        match self {
            Parameter::Solids => "Sólidos",
            Parameter::Ph => "pH",
            Parameter::Appearance => "Apariencia",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Veredicto de un parámetro frente a su estándar.
///
/// pH y apariencia nunca producen `Warning`: sólo los sólidos tienen banda de
/// tolerancia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Success,
    Warning,
    Error,
    NotApplicable,
}

impl Verdict {
    /// `true` para `Warning` y `Error`.
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Warning | Verdict::Error)
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, Verdict::NotApplicable)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Success => "success",
            Verdict::Warning => "warning",
            Verdict::Error => "error",
            Verdict::NotApplicable => "not-applicable",
        };
        f.write_str(s)
    }
}
