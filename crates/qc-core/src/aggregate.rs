//! Agregación de veredictos a estatus global.
//!
//! Una sola función sirve a la captura (sólidos + pH + apariencia) y al
//! tablero (sólo sólidos); la diferencia se expresa con `StatusScope`.
use qc_domain::{OverallStatus, Parameter, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resultado de agregar los veredictos de un registro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub status: OverallStatus,
    /// Parámetros con `Warning` o `Error`, en el orden recibido.
    pub failed: Vec<Parameter>,
}

impl Aggregation {
    pub fn failed_names(&self) -> Vec<&'static str> {
        self.failed.iter().map(Parameter::as_str).collect()
    }
}

/// Qué parámetros deciden el estatus global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusScope {
    /// Aceptación del lote al capturar: sólidos, pH y apariencia.
    Submission,
    /// Tableros: sólo sólidos.
    #[default]
    Dashboard,
}

impl StatusScope {
    pub fn counts(&self, parameter: Parameter) -> bool {
        match self {
            StatusScope::Submission => true,
            StatusScope::Dashboard => parameter == Parameter::Solids,
        }
    }
}

impl fmt::Display for StatusScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusScope::Submission => f.write_str("all"),
            StatusScope::Dashboard => f.write_str("solids"),
        }
    }
}

impl FromStr for StatusScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "submission" => Ok(StatusScope::Submission),
            "solids" | "dashboard" => Ok(StatusScope::Dashboard),
            other => Err(format!("alcance de estatus desconocido '{other}' (use 'all' o 'solids')")),
        }
    }
}

/// Peor veredicto gana. `NotApplicable` se ignora; sin parámetros aplicables
/// el registro es `CONFORME`.
pub fn aggregate(verdicts: &[(Parameter, Verdict)]) -> Aggregation {
    let mut status = OverallStatus::Conforme;
    let mut failed = Vec::new();
    for (parameter, verdict) in verdicts {
        match verdict {
            Verdict::Error => {
                status = OverallStatus::NoConforme;
                failed.push(*parameter);
            }
            Verdict::Warning => {
                if status != OverallStatus::NoConforme {
                    status = OverallStatus::Retener;
                }
                failed.push(*parameter);
            }
            Verdict::Success | Verdict::NotApplicable => {}
        }
    }
    Aggregation { status, failed }
}

/// `aggregate` restringido a los parámetros que cuenta `scope`.
pub fn aggregate_scoped(verdicts: &[(Parameter, Verdict)], scope: StatusScope) -> Aggregation {
    let counted: Vec<(Parameter, Verdict)> = verdicts.iter().copied().filter(|(p, _)| scope.counts(*p)).collect();
    aggregate(&counted)
}
