//! Entrada de captura del operador y su validación contra el catálogo.
//!
//! La validación ocurre antes de cualquier clasificación: un error aquí se
//! reporta al operador con el campo exacto a corregir.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::{AdminEdit, BatchData, SelfReport, SolidsReading};
use crate::{DomainError, StandardsCatalog};

/// Forma de captura tal como llega del formulario (todo opcional para poder
/// nombrar el campo faltante).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionInput {
    pub branch: Option<String>,
    pub preparer: Option<String>,
    /// Fecha ISO `AAAA-MM-DD`.
    pub manufacture_date: Option<String>,
    pub product_code: Option<String>,
    pub batch_size: Option<f64>,
    pub ph: Option<f64>,
    pub solids_1: Option<f64>,
    pub solids_1_temperature: Option<f64>,
    pub solids_2: Option<f64>,
    pub solids_2_temperature: Option<f64>,
    pub appearance: Option<String>,
    pub color: Option<String>,
    pub aroma: Option<String>,
    pub notes: Option<String>,
}

impl SubmissionInput {
    /// Valida la captura y produce los datos tipados del lote.
    ///
    /// # Errores
    /// `DomainError::Validation` con el nombre del primer campo faltante o
    /// fuera de dominio.
    pub fn validate(&self, catalog: &StandardsCatalog) -> Result<BatchData, DomainError> {
        let branch = required_text("branch", &self.branch)?;
        if !catalog.is_known_branch(&branch) {
            return Err(DomainError::validation("branch", format!("sucursal desconocida '{branch}'")));
        }
        let preparer = required_text("preparer", &self.preparer)?;
        let raw_date = required_text("manufacture_date", &self.manufacture_date)?;
        let manufacture_date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
            .map_err(|_| DomainError::validation("manufacture_date", format!("fecha ISO inválida '{raw_date}'")))?;
        let product_code = required_text("product_code", &self.product_code)?;
        if catalog.product(&product_code).is_none() {
            return Err(DomainError::validation("product_code", format!("producto desconocido '{product_code}'")));
        }
        let batch_size = self.batch_size
                             .ok_or_else(|| DomainError::validation("batch_size", "requerido"))?;
        if !batch_size.is_finite() || batch_size <= 0.0 {
            return Err(DomainError::validation("batch_size", "debe ser un número positivo"));
        }

        let applicability = catalog.applicability(&product_code);
        let ph = match self.ph {
            Some(v) => Some(validate_ph(v)?),
            None if applicability.ph => return Err(DomainError::validation("ph", "requerido para este producto")),
            None => None,
        };

        let solids_1 = reading("solids_1", self.solids_1, self.solids_1_temperature)?;
        let solids_2 = reading("solids_2", self.solids_2, self.solids_2_temperature)?;
        if applicability.solids && solids_1.value.is_none() && solids_2.value.is_none() {
            return Err(DomainError::validation("solids_1", "se requiere al menos una lectura de sólidos"));
        }

        let appearance = match optional_text(&self.appearance) {
            Some(observed) => {
                let option = catalog.appearance_option(&observed).ok_or_else(|| {
                                                                     DomainError::validation("appearance",
                                                                                             format!("apariencia no enumerada '{observed}'"))
                                                                 })?;
                Some(option.to_string())
            }
            None => None,
        };

        let color = self_report("color", &self.color)?;
        let aroma = self_report("aroma", &self.aroma)?;

        Ok(BatchData { branch,
                       preparer,
                       manufacture_date,
                       product_code,
                       batch_size,
                       ph,
                       solids_1,
                       solids_2,
                       appearance,
                       color,
                       aroma,
                       notes: optional_text(&self.notes) })
    }
}

impl AdminEdit {
    /// Valida un parche administrativo con las mismas reglas de dominio que
    /// la captura y devuelve la apariencia canonizada.
    pub fn validate(&self, catalog: &StandardsCatalog) -> Result<AdminEdit, DomainError> {
        if self.is_empty() {
            return Err(DomainError::validation("edit", "no hay campos que editar"));
        }
        let mut out = self.clone();
        if let Some(ph) = self.ph {
            validate_ph(ph)?;
        }
        if let Some(s) = self.solids_1 {
            reading("solids_1", s.value, s.temperature)?;
        }
        if let Some(s) = self.solids_2 {
            reading("solids_2", s.value, s.temperature)?;
        }
        if let Some(observed) = optional_text(&self.appearance) {
            let option = catalog.appearance_option(&observed)
                                .ok_or_else(|| DomainError::validation("appearance", format!("apariencia no enumerada '{observed}'")))?;
            out.appearance = Some(option.to_string());
        } else if self.appearance.is_some() {
            return Err(DomainError::validation("appearance", "no puede quedar vacía"));
        }
        Ok(out)
    }
}

fn optional_text(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn required_text(field: &str, value: &Option<String>) -> Result<String, DomainError> {
    optional_text(value).ok_or_else(|| DomainError::validation(field, "requerido"))
}

/// pH de captura: entero en 0..=14.
fn validate_ph(value: f64) -> Result<f64, DomainError> {
    if !value.is_finite() || value.fract() != 0.0 || !(0.0..=14.0).contains(&value) {
        return Err(DomainError::validation("ph", "debe ser un entero entre 0 y 14"));
    }
    Ok(value)
}

fn reading(field: &str, value: Option<f64>, temperature: Option<f64>) -> Result<SolidsReading, DomainError> {
    if let Some(v) = value {
        if !v.is_finite() || !(0.0..=100.0).contains(&v) {
            return Err(DomainError::validation(field, "porcentaje de sólidos fuera de 0-100"));
        }
    }
    if let Some(t) = temperature {
        if !t.is_finite() {
            return Err(DomainError::validation(format!("{field}_temperature"), "temperatura inválida"));
        }
    }
    Ok(SolidsReading { value, temperature })
}

fn self_report(field: &str, value: &Option<String>) -> Result<SelfReport, DomainError> {
    let raw = required_text(field, value)?;
    raw.parse::<SelfReport>()
       .map_err(|_| DomainError::validation(field, format!("debe ser CONFORME o NO CONFORME, no '{raw}'")))
}
