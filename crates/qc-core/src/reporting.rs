//! Agregador de reportes para tableros de calidad.
//!
//! Re-evalúa cada registro con el mismo clasificador y agregador de la
//! captura y deriva:
//! - KPIs (conteos y porcentajes por estatus, volumen y piezas totales).
//! - Tabla de Pareto de defectos por parámetro con porcentaje acumulado.
//! - Cartas de control de pH y sólidos promedio, con límites de referencia y
//!   ejes dinámicos cuando hay un único producto seleccionado.
//!
//! La re-evaluación es pura, así que se paraleliza por registro con `rayon`.
//! El reporte es de sólo lectura y tolera cualquier vista del almacén:
//! registros de productos ausentes del catálogo quedan como no aplicables.
use chrono::{DateTime, Utc};
use qc_domain::{BatchRecord, BatchUnit, OverallStatus, Parameter, StandardsCatalog, Verdict};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{aggregate_scoped, Aggregation, StatusScope};
use crate::classifier::{Classifier, SolidsLimits};
use crate::constants::{PH_AXIS_PADDING, SOLIDS_AXIS_FLAT_PADDING, SOLIDS_AXIS_PADDING_RATIO};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Producto seleccionado; restringe los registros y habilita límites de
    /// referencia y ejes dinámicos.
    pub product: Option<String>,
    /// Parámetros que deciden el estatus mostrado en los KPIs.
    pub scope: StatusScope,
}

/// Evaluación de un registro para reportes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEvaluation {
    pub record_id: Uuid,
    pub verdicts: Vec<(Parameter, Verdict)>,
    /// Estatus según el alcance del reporte.
    pub status: OverallStatus,
    /// Parámetros fallidos en la evaluación completa (alimenta el Pareto).
    pub failed: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total: usize,
    pub conforming: usize,
    pub held: usize,
    pub rejected: usize,
    pub conforming_pct: f64,
    pub held_pct: f64,
    pub rejected_pct: f64,
    /// Suma de tamaños de lote de familias por volumen.
    pub total_volume: f64,
    /// Suma de tamaños de lote de familias por pieza.
    pub total_pieces: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoRow {
    pub parameter: Parameter,
    pub label: String,
    pub count: usize,
    pub percentage: f64,
    pub cumulative_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Posición en orden de creación, desde 1.
    pub index: usize,
    pub lot_id: Option<String>,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

/// Líneas de referencia: rojas (especificación) y amarillas (tolerancia).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLimits {
    pub spec_min: f64,
    pub spec_max: f64,
    pub tol_min: Option<f64>,
    pub tol_max: Option<f64>,
}

impl ReferenceLimits {
    fn values(&self) -> Vec<f64> {
        let mut v = vec![self.spec_min, self.spec_max];
        v.extend(self.tol_min);
        v.extend(self.tol_max);
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

/// Relleno de ejes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisPadding {
    /// Fracción del rango; `flat` cuando el rango es cero.
    Ratio { ratio: f64, flat: f64 },
    Fixed(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlChart {
    pub parameter: Parameter,
    pub points: Vec<ChartPoint>,
    pub limits: Option<ReferenceLimits>,
    pub bounds: Option<AxisBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub options: ReportOptions,
    pub kpis: Kpis,
    pub pareto: Vec<ParetoRow>,
    pub ph_chart: ControlChart,
    pub solids_chart: ControlChart,
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Re-evalúa los registros en paralelo conservando el orden de entrada.
pub fn evaluate_records(records: &[BatchRecord], catalog: &StandardsCatalog, scope: StatusScope) -> Vec<RecordEvaluation> {
    let classifier = Classifier::new(catalog);
    records.par_iter()
           .map(|record| {
               let verdicts = classifier.evaluate(&record.data);
               let scoped = aggregate_scoped(&verdicts, scope);
               let full: Aggregation = aggregate_scoped(&verdicts, StatusScope::Submission);
               RecordEvaluation { record_id: record.id,
                                  verdicts,
                                  status: scoped.status,
                                  failed: full.failed }
           })
           .collect()
}

pub fn compute_kpis(records: &[BatchRecord], evaluations: &[RecordEvaluation], catalog: &StandardsCatalog) -> Kpis {
    let total = evaluations.len();
    let count = |s: OverallStatus| evaluations.iter().filter(|e| e.status == s).count();
    let (conforming, held, rejected) = (count(OverallStatus::Conforme), count(OverallStatus::Retener), count(OverallStatus::NoConforme));
    let mut total_volume = 0.0;
    let mut total_pieces = 0.0;
    for record in records {
        match catalog.family_of(&record.data.product_code).map(|f| f.unit) {
            Some(BatchUnit::Volume) => total_volume += record.data.batch_size,
            Some(BatchUnit::Pieces) => total_pieces += record.data.batch_size,
            None => {}
        }
    }
    Kpis { total,
           conforming,
           held,
           rejected,
           conforming_pct: pct(conforming, total),
           held_pct: pct(held, total),
           rejected_pct: pct(rejected, total),
           total_volume,
           total_pieces }
}

/// Tabla de Pareto sobre {pH, sólidos, apariencia}. Orden descendente por
/// conteo; los empates conservan el orden de catálogo.
pub fn pareto(evaluations: &[RecordEvaluation]) -> Vec<ParetoRow> {
    let mut rows: Vec<(Parameter, usize)> =
        Parameter::PARETO_ORDER.iter()
                               .map(|p| (*p, evaluations.iter().filter(|e| e.failed.contains(p)).count()))
                               .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    let total_defects: usize = rows.iter().map(|(_, c)| c).sum();
    let mut cumulative = 0usize;
    rows.into_iter()
        .map(|(parameter, count)| {
            cumulative += count;
            ParetoRow { parameter,
                        label: parameter.label().to_string(),
                        count,
                        percentage: pct(count, total_defects),
                        cumulative_percentage: pct(cumulative, total_defects) }
        })
        .collect()
}

/// `[min − pad, max + pad]` sobre la unión de datos y límites. `None` si la
/// unión está vacía.
pub fn axis_bounds(data: &[f64], limits: &[f64], padding: AxisPadding) -> Option<AxisBounds> {
    let mut values = data.iter().chain(limits.iter()).copied().filter(|v| v.is_finite());
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = match padding {
        AxisPadding::Fixed(p) => p,
        AxisPadding::Ratio { ratio, flat } => {
            let range = max - min;
            if range > 0.0 {
                range * ratio
            } else {
                flat
            }
        }
    };
    Some(AxisBounds { min: min - pad,
                      max: max + pad })
}

fn series<F>(records: &[BatchRecord], value: F) -> Vec<ChartPoint>
    where F: Fn(&BatchRecord) -> Option<f64>
{
    records.iter()
           .enumerate()
           .filter_map(|(i, r)| {
               value(r).filter(|v| v.is_finite()).map(|v| ChartPoint { index: i + 1,
                                                                       lot_id: r.lot_id.clone(),
                                                                       value: v,
                                                                       created_at: r.created_at })
           })
           .collect()
}

/// Cartas de control de pH y sólidos promedio. `records` debe venir en
/// orden de creación.
pub fn control_charts(records: &[BatchRecord],
                      catalog: &StandardsCatalog,
                      product: Option<&str>)
                      -> (ControlChart, ControlChart) {
    let ph_points = series(records, |r| r.data.ph);
    let solids_points = series(records, |r| r.data.solids_average());

    let (ph_limits, solids_limits) = match product {
        Some(code) => {
            let ph = catalog.ph_standard(code).map(|s| ReferenceLimits { spec_min: s.ph_min,
                                                                         spec_max: s.ph_max,
                                                                         tol_min: None,
                                                                         tol_max: None });
            let solids = catalog.solids_standard(code)
                                .and_then(SolidsLimits::from_standard)
                                .map(|l| ReferenceLimits { spec_min: l.spec_min,
                                                           spec_max: l.spec_max,
                                                           tol_min: Some(l.tol_min),
                                                           tol_max: Some(l.tol_max) });
            (ph, solids)
        }
        None => (None, None),
    };

    let bounds = |points: &[ChartPoint], limits: Option<ReferenceLimits>, padding: AxisPadding| {
        product?;
        let data: Vec<f64> = points.iter().map(|p| p.value).collect();
        let lines = limits.map(|l| l.values()).unwrap_or_default();
        axis_bounds(&data, &lines, padding)
    };

    let ph_bounds = bounds(ph_points.as_slice(), ph_limits, AxisPadding::Fixed(PH_AXIS_PADDING));
    let solids_bounds = bounds(solids_points.as_slice(),
                               solids_limits,
                               AxisPadding::Ratio { ratio: SOLIDS_AXIS_PADDING_RATIO,
                                                    flat: SOLIDS_AXIS_FLAT_PADDING });

    (ControlChart { parameter: Parameter::Ph,
                    points: ph_points,
                    limits: ph_limits,
                    bounds: ph_bounds },
     ControlChart { parameter: Parameter::Solids,
                    points: solids_points,
                    limits: solids_limits,
                    bounds: solids_bounds })
}

/// Construye el reporte completo del tablero.
pub fn build_report(records: &[BatchRecord], catalog: &StandardsCatalog, options: &ReportOptions) -> DashboardReport {
    let mut selected: Vec<BatchRecord> = records.iter()
                                                .filter(|r| {
                                                    options.product.as_deref().map_or(true, |p| r.data.product_code == p)
                                                })
                                                .cloned()
                                                .collect();
    selected.sort_by_key(|r| r.created_at);

    let evaluations = evaluate_records(&selected, catalog, options.scope);
    let kpis = compute_kpis(&selected, &evaluations, catalog);
    let pareto = pareto(&evaluations);
    let (ph_chart, solids_chart) = control_charts(&selected, catalog, options.product.as_deref());
    DashboardReport { options: options.clone(),
                      kpis,
                      pareto,
                      ph_chart,
                      solids_chart }
}
