//! Clasificador de parámetros.
//!
//! Reglas:
//! - Sólidos: tres niveles. Dentro de especificación ⇒ `Success`; fuera de
//!   especificación pero dentro de la banda de tolerancia (±5 % relativo a cada
//!   límite) ⇒ `Warning`; fuera de la banda ⇒ `Error`. Ambos bordes son
//!   inclusivos.
//! - pH: binario e inclusivo. Valores fuera de 0..=14 o no numéricos ⇒
//!   `Error`.
//! - Apariencia: igualdad sin distinguir mayúsculas.
//!
//! En todos los casos la ausencia de estándar ⇒ `NotApplicable`. El
//! clasificador nunca falla por datos de negocio malformados.
use log::debug;
use qc_domain::{solids_mean, AppearanceStandard, BatchData, Parameter, PhStandard, ProductStandard, StandardsCatalog,
                Verdict};
use serde::{Deserialize, Serialize};

use crate::constants::{PH_DOMAIN_MAX, PH_DOMAIN_MIN, SOLIDS_TOLERANCE_RATIO};

/// Límites rojos (especificación) y amarillos (tolerancia) de sólidos.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolidsLimits {
    pub spec_min: f64,
    pub spec_max: f64,
    pub tol_min: f64,
    pub tol_max: f64,
}

impl SolidsLimits {
    pub fn new(spec_min: f64, spec_max: f64) -> Self {
        SolidsLimits { spec_min,
                       spec_max,
                       tol_min: spec_min * (1.0 - SOLIDS_TOLERANCE_RATIO),
                       tol_max: spec_max * (1.0 + SOLIDS_TOLERANCE_RATIO) }
    }

    pub fn from_standard(standard: &ProductStandard) -> Option<Self> {
        standard.solids_limits().map(|(min, max)| Self::new(min, max))
    }

    pub fn classify(&self, avg: f64) -> Verdict {
        if self.spec_min <= avg && avg <= self.spec_max {
            Verdict::Success
        } else if (self.tol_min <= avg && avg < self.spec_min) || (self.spec_max < avg && avg <= self.tol_max) {
            Verdict::Warning
        } else {
            // incluye NaN: ninguna comparación se cumple
            Verdict::Error
        }
    }
}

/// Clasifica el promedio de sólidos contra el estándar del producto.
pub fn classify_solids(avg: f64, standard: Option<&ProductStandard>) -> Verdict {
    match standard.and_then(SolidsLimits::from_standard) {
        Some(limits) => limits.classify(avg),
        None => Verdict::NotApplicable,
    }
}

/// Clasifica un pH. El estándar ausente tiene precedencia sobre cualquier
/// entrada inválida.
pub fn classify_ph(value: Option<&PhInput>, standard: Option<&PhStandard>) -> Verdict {
    let Some(standard) = standard else {
        return Verdict::NotApplicable;
    };
    let Some(input) = value else {
        return Verdict::NotApplicable;
    };
    match input.numeric() {
        Some(v) if (PH_DOMAIN_MIN..=PH_DOMAIN_MAX).contains(&v) => {
            if standard.ph_min <= v && v <= standard.ph_max {
                Verdict::Success
            } else {
                Verdict::Error
            }
        }
        _ => Verdict::Error,
    }
}

/// Compara la apariencia observada con la esperada sin distinguir mayúsculas.
pub fn classify_appearance(observed: Option<&str>, expected: Option<&AppearanceStandard>) -> Verdict {
    let observed = observed.map(str::trim).filter(|s| !s.is_empty());
    match (observed, expected) {
        (Some(o), Some(e)) => {
            if o.to_lowercase() == e.expected_description.trim().to_lowercase() {
                Verdict::Success
            } else {
                Verdict::Error
            }
        }
        _ => Verdict::NotApplicable,
    }
}

/// Lecturas independientes de sólidos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolidsInput {
    pub reading_1: Option<f64>,
    pub reading_2: Option<f64>,
}

impl SolidsInput {
    /// Misma regla que `BatchData::solids_average`.
    pub fn average(&self) -> Option<f64> {
        solids_mean(self.reading_1, self.reading_2)
    }
}

/// Entrada de pH: numérica o texto sin validar (p. ej. importado de una hoja
/// de cálculo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhInput {
    Numeric(f64),
    Text(String),
}

impl PhInput {
    /// Valor numérico finito, si lo hay.
    pub fn numeric(&self) -> Option<f64> {
        let v = match self {
            PhInput::Numeric(v) => *v,
            PhInput::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

/// Entrada etiquetada por parámetro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "parameter", content = "input", rename_all = "lowercase")]
pub enum ParameterInput {
    Solids(SolidsInput),
    Ph(Option<PhInput>),
    Appearance(Option<String>),
}

impl ParameterInput {
    pub fn parameter(&self) -> Parameter {
        match self {
            ParameterInput::Solids(_) => Parameter::Solids,
            ParameterInput::Ph(_) => Parameter::Ph,
            ParameterInput::Appearance(_) => Parameter::Appearance,
        }
    }

    /// Entradas de un registro en orden de evaluación.
    pub fn from_data(data: &BatchData) -> [ParameterInput; 3] {
        [ParameterInput::Solids(SolidsInput { reading_1: data.solids_1.value,
                                              reading_2: data.solids_2.value }),
         ParameterInput::Ph(data.ph.map(PhInput::Numeric)),
         ParameterInput::Appearance(data.appearance.clone())]
    }
}

/// Clasificador ligado a un catálogo explícito.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    catalog: &'a StandardsCatalog,
}

impl<'a> Classifier<'a> {
    pub fn new(catalog: &'a StandardsCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a StandardsCatalog {
        self.catalog
    }

    /// Clasifica una entrada para un producto, respetando la tabla de
    /// aplicabilidad.
    pub fn classify(&self, product_code: &str, input: &ParameterInput) -> Verdict {
        let applicability = self.catalog.applicability(product_code);
        match input {
            ParameterInput::Solids(s) => {
                if !applicability.solids {
                    return Verdict::NotApplicable;
                }
                let standard = self.catalog.solids_standard(product_code);
                if standard.and_then(|s| s.solids_limits()).is_none() {
                    debug!("classification gap: product={product_code} parameter=solids (sin estándar)");
                    return Verdict::NotApplicable;
                }
                match s.average() {
                    Some(avg) => classify_solids(avg, standard),
                    None => Verdict::NotApplicable,
                }
            }
            ParameterInput::Ph(value) => {
                if !applicability.ph {
                    return Verdict::NotApplicable;
                }
                let standard = self.catalog.ph_standard(product_code);
                if standard.is_none() {
                    debug!("classification gap: product={product_code} parameter=pH (sin estándar)");
                }
                classify_ph(value.as_ref(), standard)
            }
            ParameterInput::Appearance(observed) => {
                classify_appearance(observed.as_deref(), self.catalog.appearance_standard(product_code))
            }
        }
    }

    /// Evalúa los tres parámetros de un registro en orden (sólidos, pH,
    /// apariencia).
    pub fn evaluate(&self, data: &BatchData) -> Vec<(Parameter, Verdict)> {
        ParameterInput::from_data(data).iter()
                                       .map(|input| (input.parameter(), self.classify(&data.product_code, input)))
                                       .collect()
    }
}
