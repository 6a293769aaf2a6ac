//! Registro de lote: datos capturados por el operador, registro nuevo (con
//! lote y estatus derivados) y registro persistido.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::DomainError;

/// Autoevaluación binaria de color / aroma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelfReport {
    #[serde(rename = "CONFORME")]
    Conforme,
    #[serde(rename = "NO CONFORME")]
    NoConforme,
}

impl SelfReport {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelfReport::Conforme => "CONFORME",
            SelfReport::NoConforme => "NO CONFORME",
        }
    }
}

impl fmt::Display for SelfReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelfReport {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CONFORME" => Ok(SelfReport::Conforme),
            "NO CONFORME" => Ok(SelfReport::NoConforme),
            other => Err(DomainError::validation("self_report", format!("valor no reconocido '{other}'"))),
        }
    }
}

/// Disposición global del lote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverallStatus {
    #[serde(rename = "CONFORME")]
    Conforme,
    /// Retener para revisión (sólo se violó la banda de tolerancia).
    #[serde(rename = "RETENER")]
    Retener,
    #[serde(rename = "NO CONFORME")]
    NoConforme,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Conforme => "CONFORME",
            OverallStatus::Retener => "RETENER",
            OverallStatus::NoConforme => "NO CONFORME",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverallStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CONFORME" => Ok(OverallStatus::Conforme),
            "RETENER" => Ok(OverallStatus::Retener),
            "NO CONFORME" => Ok(OverallStatus::NoConforme),
            other => Err(DomainError::validation("status", format!("estatus no reconocido '{other}'"))),
        }
    }
}

/// Lectura de sólidos con la temperatura a la que se midió.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolidsReading {
    pub value: Option<f64>,
    pub temperature: Option<f64>,
}

/// Mediciones y datos de captura de un lote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchData {
    pub branch: String,
    pub preparer: String,
    pub manufacture_date: NaiveDate,
    pub product_code: String,
    /// Litros o piezas según la familia del producto.
    pub batch_size: f64,
    pub ph: Option<f64>,
    pub solids_1: SolidsReading,
    pub solids_2: SolidsReading,
    pub appearance: Option<String>,
    pub color: SelfReport,
    pub aroma: SelfReport,
    pub notes: Option<String>,
}

/// Promedio de dos lecturas de sólidos; con una sola lectura se usa
/// directamente (señal degradada, pero se clasifica igual).
pub fn solids_mean(reading_1: Option<f64>, reading_2: Option<f64>) -> Option<f64> {
    match (reading_1, reading_2) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

impl BatchData {
    pub fn solids_average(&self) -> Option<f64> {
        solids_mean(self.solids_1.value, self.solids_2.value)
    }
}

/// Registro listo para insertar: lote y estatus ya derivados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBatchRecord {
    pub id: Uuid,
    pub lot_id: String,
    pub status: OverallStatus,
    pub product_family: String,
    pub created_at: DateTime<Utc>,
    pub data: BatchData,
}

/// Registro persistido.
///
/// `lot_id` es opcional porque registros históricos pueden carecer de lote (o
/// llevar el marcador vacío); esos no cuentan para la secuencia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub id: Uuid,
    pub lot_id: Option<String>,
    pub status: OverallStatus,
    pub product_family: String,
    pub created_at: DateTime<Utc>,
    pub data: BatchData,
}

impl From<NewBatchRecord> for BatchRecord {
    fn from(r: NewBatchRecord) -> Self {
        BatchRecord { id: r.id,
                      lot_id: Some(r.lot_id),
                      status: r.status,
                      product_family: r.product_family,
                      created_at: r.created_at,
                      data: r.data }
    }
}

/// Parche de edición administrativa. Sólo cubre los campos editables; los
/// `None` conservan el valor actual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminEdit {
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub solids_1: Option<SolidsReading>,
    #[serde(default)]
    pub solids_2: Option<SolidsReading>,
    #[serde(default)]
    pub appearance: Option<String>,
    #[serde(default)]
    pub color: Option<SelfReport>,
    #[serde(default)]
    pub aroma: Option<SelfReport>,
}

impl AdminEdit {
    pub fn is_empty(&self) -> bool {
        self == &AdminEdit::default()
    }

    /// Aplica el parche sobre los datos actuales. El identificador de lote no
    /// forma parte de `BatchData` y por lo tanto nunca se re-deriva.
    pub fn apply_to(&self, data: &BatchData) -> BatchData {
        let mut out = data.clone();
        if let Some(ph) = self.ph {
            out.ph = Some(ph);
        }
        if let Some(s) = self.solids_1 {
            out.solids_1 = s;
        }
        if let Some(s) = self.solids_2 {
            out.solids_2 = s;
        }
        if let Some(a) = &self.appearance {
            out.appearance = Some(a.clone());
        }
        if let Some(c) = self.color {
            out.color = c;
        }
        if let Some(a) = self.aroma {
            out.aroma = a;
        }
        out
    }
}

/// Valores completos que el almacén escribe al aplicar una edición.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEdit {
    pub ph: Option<f64>,
    pub solids_1: SolidsReading,
    pub solids_2: SolidsReading,
    pub appearance: Option<String>,
    pub color: SelfReport,
    pub aroma: SelfReport,
    pub status: OverallStatus,
}

impl RecordEdit {
    pub fn from_data(data: &BatchData, status: OverallStatus) -> Self {
        RecordEdit { ph: data.ph,
                     solids_1: data.solids_1,
                     solids_2: data.solids_2,
                     appearance: data.appearance.clone(),
                     color: data.color,
                     aroma: data.aroma,
                     status }
    }

    pub fn apply_to(&self, record: &mut BatchRecord) {
        record.data.ph = self.ph;
        record.data.solids_1 = self.solids_1;
        record.data.solids_2 = self.solids_2;
        record.data.appearance = self.appearance.clone();
        record.data.color = self.color;
        record.data.aroma = self.aroma;
        record.status = self.status;
    }
}
