//! Constantes del motor de conformidad.
//!
//! Cambiar cualquiera de estos valores altera la clasificación o el formato
//! de los identificadores de lote ya emitidos.

/// Ancho relativo de la banda de tolerancia de sólidos: `min × 0.95`,
/// `max × 1.05`.
pub const SOLIDS_TOLERANCE_RATIO: f64 = 0.05;

/// Dominio físico del pH.
pub const PH_DOMAIN_MIN: f64 = 0.0;
pub const PH_DOMAIN_MAX: f64 = 14.0;

/// Acrónimo usado cuando la sucursal no está en el directorio.
pub const UNKNOWN_BRANCH_ACRONYM: &str = "XXX";

/// Marcador de "sin lote" en registros históricos. No cuenta para la
/// secuencia.
pub const EMPTY_LOT_MARKER: &str = "N/A";

/// Años de fabricación representables en un lote. La fecha va como `AAMMDD`
/// y al leerla `69..=99` se interpreta como 19xx y `00..=68` como 20xx.
pub const LOT_YEAR_MIN: i32 = 1969;
pub const LOT_YEAR_MAX: i32 = 2068;

/// Ancho mínimo (no máximo) del consecutivo de lote.
pub const LOT_SEQUENCE_MIN_WIDTH: usize = 2;

/// Relleno de ejes en cartas de control.
pub const SOLIDS_AXIS_PADDING_RATIO: f64 = 0.05;
pub const SOLIDS_AXIS_FLAT_PADDING: f64 = 1.0;
pub const PH_AXIS_PADDING: f64 = 0.5;
