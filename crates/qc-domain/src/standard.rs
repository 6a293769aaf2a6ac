//! Estándares por producto (límites de especificación) y tablas de
//! aplicabilidad.
use serde::{Deserialize, Serialize};

/// Límites de sólidos (% p/p) de un producto. Si falta cualquiera de los dos
/// límites, los sólidos no se pueden juzgar para ese producto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStandard {
    pub product_code: String,
    #[serde(default)]
    pub solids_min: Option<f64>,
    #[serde(default)]
    pub solids_max: Option<f64>,
}

impl ProductStandard {
    /// Límites de especificación `(min, max)` cuando ambos están definidos.
    pub fn solids_limits(&self) -> Option<(f64, f64)> {
        match (self.solids_min, self.solids_max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhStandard {
    pub product_code: String,
    pub ph_min: f64,
    pub ph_max: f64,
}

/// Descripción esperada de apariencia (texto libre único).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceStandard {
    pub product_code: String,
    pub expected_description: String,
}

/// Qué lecturas exige el formulario para un producto.
///
/// Es independiente de la existencia de un estándar: un parámetro puede ser
/// obligatorio y aun así no tener límites contra los cuales juzgarlo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterApplicability {
    pub solids: bool,
    pub ph: bool,
}

impl Default for ParameterApplicability {
    fn default() -> Self {
        Self { solids: true,
               ph: true }
    }
}

/// Unidad en la que se expresa el tamaño de lote de una familia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchUnit {
    /// Litros.
    Volume,
    /// Piezas.
    Pieces,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFamily {
    pub name: String,
    pub unit: BatchUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: String,
    pub name: String,
    /// Nombre de la familia (clave en el catálogo de familias).
    pub family: String,
}
