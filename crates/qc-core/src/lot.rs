//! Identificadores de lote.
//!
//! Formato: `{AAMMDD}-{ACRÓNIMO}-{PRODUCTO}{TAMAÑO}-{CONSECUTIVO}`, por
//! ejemplo `240305-PC-LAV1000-01`.
//!
//! - La fecha es la de fabricación.
//! - El acrónimo sale del directorio de sucursales (`XXX` si la sucursal no
//!   está registrada).
//! - El tamaño es el tamaño de lote redondeado al entero más cercano.
//! - El consecutivo cuenta lotes de la misma (sucursal, producto, fecha),
//!   empieza en 1 y se rellena a un ancho mínimo de 2 sin truncar.
//!
//! Hay dos formas de obtener el consecutivo:
//! - `preview_lot_id`: cuenta los registros existentes y suma uno. Es
//!   determinista pero no es atómico; dos capturas simultáneas de la misma
//!   clave obtienen el mismo candidato. Sólo sirve para mostrar el lote
//!   probable antes de guardar.
//! - `assign_lot_id`: reserva el consecutivo con `RecordStore::reserve_sequence`,
//!   que es atómico. Es la que usa la captura.
use chrono::{Datelike, NaiveDate};
use log::debug;
use qc_domain::{BatchData, DomainError, StandardsCatalog};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{LOT_SEQUENCE_MIN_WIDTH, LOT_YEAR_MAX, LOT_YEAR_MIN, UNKNOWN_BRANCH_ACRONYM};
use crate::errors::LotAssignmentError;
use crate::store::RecordStore;

const DATE_FORMAT: &str = "%y%m%d";

/// Clave de la secuencia de lote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LotKey {
    pub branch: String,
    pub product_code: String,
    pub manufacture_date: NaiveDate,
}

impl LotKey {
    pub fn from_data(data: &BatchData) -> Self {
        LotKey { branch: data.branch.clone(),
                 product_code: data.product_code.clone(),
                 manufacture_date: data.manufacture_date }
    }

    pub fn matches(&self, data: &BatchData) -> bool {
        data.branch == self.branch && data.product_code == self.product_code && data.manufacture_date == self.manufacture_date
    }
}

impl fmt::Display for LotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.branch, self.product_code, self.manufacture_date)
    }
}

/// Identificador de lote compuesto.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LotId {
    manufacture_date: NaiveDate,
    branch_acronym: String,
    product_code: String,
    size: u64,
    sequence: u32,
}

impl LotId {
    /// # Errores
    /// `DomainError::Validation` si algún componente no puede reconstruirse
    /// desde el texto compuesto: acrónimo o código de producto con guiones,
    /// producto terminado en dígito, consecutivo 0 o año de fabricación fuera
    /// de `LOT_YEAR_MIN..=LOT_YEAR_MAX`.
    pub fn new(manufacture_date: NaiveDate,
               branch_acronym: impl Into<String>,
               product_code: impl Into<String>,
               size: u64,
               sequence: u32)
               -> Result<Self, DomainError> {
        let branch_acronym = branch_acronym.into();
        let product_code = product_code.into();
        if !(LOT_YEAR_MIN..=LOT_YEAR_MAX).contains(&manufacture_date.year()) {
            return Err(DomainError::validation("manufacture_date",
                                               format!("el año {} no cabe en AAMMDD ({LOT_YEAR_MIN}-{LOT_YEAR_MAX})",
                                                       manufacture_date.year())));
        }
        if branch_acronym.is_empty() || branch_acronym.contains('-') {
            return Err(DomainError::validation("branch_acronym", format!("acrónimo inválido '{branch_acronym}'")));
        }
        if product_code.is_empty()
           || product_code.contains('-')
           || product_code.ends_with(|c: char| c.is_ascii_digit())
        {
            return Err(DomainError::validation("product_code",
                                               format!("'{product_code}' no puede formar parte de un lote")));
        }
        if sequence == 0 {
            return Err(DomainError::validation("sequence", "el consecutivo empieza en 1"));
        }
        Ok(LotId { manufacture_date,
                   branch_acronym,
                   product_code,
                   size,
                   sequence })
    }

    pub fn manufacture_date(&self) -> NaiveDate {
        self.manufacture_date
    }

    pub fn branch_acronym(&self) -> &str {
        &self.branch_acronym
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
               "{}-{}-{}{}-{:0width$}",
               self.manufacture_date.format(DATE_FORMAT),
               self.branch_acronym,
               self.product_code,
               self.size,
               self.sequence,
               width = LOT_SEQUENCE_MIN_WIDTH)
    }
}

/// `AAMMDD` se lee con la ventana de `%y`: `69..=99` es 19xx, `00..=68` es
/// 20xx. `LotId::new` rechaza años fuera de esa ventana, así que todo lote
/// compuesto vuelve a leerse igual.
impl FromStr for LotId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| DomainError::validation("lot_id", format!("'{s}': {reason}"));
        let parts: Vec<&str> = s.trim().split('-').collect();
        let [date, acronym, product_size, sequence] = parts.as_slice() else {
            return Err(invalid("se esperaban 4 segmentos"));
        };
        if date.len() != 6 {
            return Err(invalid("fecha AAMMDD inválida"));
        }
        let manufacture_date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| invalid("fecha AAMMDD inválida"))?;
        let split = product_size.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (product_code, size) = product_size.split_at(split);
        if size.is_empty() {
            return Err(invalid("falta el tamaño de lote"));
        }
        let size: u64 = size.parse().map_err(|_| invalid("tamaño de lote inválido"))?;
        if sequence.len() < LOT_SEQUENCE_MIN_WIDTH || !sequence.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("consecutivo inválido"));
        }
        let sequence: u32 = sequence.parse().map_err(|_| invalid("consecutivo inválido"))?;
        LotId::new(manufacture_date, *acronym, product_code, size, sequence)
    }
}

/// Asignador de lotes ligado a un catálogo explícito.
#[derive(Debug, Clone, Copy)]
pub struct LotAssigner<'a> {
    catalog: &'a StandardsCatalog,
}

impl<'a> LotAssigner<'a> {
    pub fn new(catalog: &'a StandardsCatalog) -> Self {
        Self { catalog }
    }

    /// Acrónimo de la sucursal o el marcador de sucursal desconocida.
    pub fn branch_acronym(&self, branch: &str) -> &'a str {
        self.catalog.branch_acronym(branch).unwrap_or(UNKNOWN_BRANCH_ACRONYM)
    }

    fn check_preconditions(&self, data: &BatchData) -> Result<(LotKey, u64), LotAssignmentError> {
        if data.branch.trim().is_empty() {
            return Err(LotAssignmentError::precondition("branch", "requerido"));
        }
        if data.product_code.trim().is_empty() {
            return Err(LotAssignmentError::precondition("product_code", "requerido"));
        }
        let year = data.manufacture_date.year();
        if !(LOT_YEAR_MIN..=LOT_YEAR_MAX).contains(&year) {
            return Err(LotAssignmentError::precondition("manufacture_date",
                                                        format!("el año {year} no cabe en AAMMDD \
                                                                 ({LOT_YEAR_MIN}-{LOT_YEAR_MAX})")));
        }
        if !data.batch_size.is_finite() || data.batch_size <= 0.0 {
            return Err(LotAssignmentError::precondition("batch_size",
                                                        format!("debe ser positivo, no {}", data.batch_size)));
        }
        // redondeo al entero más cercano, medios se alejan de cero
        let size = data.batch_size.round() as u64;
        Ok((LotKey::from_data(data), size))
    }

    fn compose(&self, data: &BatchData, size: u64, sequence: u32) -> Result<LotId, LotAssignmentError> {
        LotId::new(data.manufacture_date,
                   self.branch_acronym(&data.branch),
                   data.product_code.clone(),
                   size,
                   sequence).map_err(|e| {
                                LotAssignmentError::precondition(e.field().unwrap_or("lot_id"), e.to_string())
                            })
    }

    /// Candidato por conteo (`count + 1`). No reserva nada: sin inserciones
    /// intermedias, dos llamadas devuelven el mismo candidato.
    pub fn preview<S: RecordStore + ?Sized>(&self, data: &BatchData, store: &S) -> Result<LotId, LotAssignmentError> {
        let (key, size) = self.check_preconditions(data)?;
        let count = store.count_lots(&key)?;
        let sequence = u32::try_from(count).unwrap_or(u32::MAX).saturating_add(1);
        self.compose(data, size, sequence)
    }

    /// Reserva atómicamente el siguiente consecutivo y compone el lote.
    pub fn reserve<S: RecordStore + ?Sized>(&self, data: &BatchData, store: &S) -> Result<LotId, LotAssignmentError> {
        let (key, size) = self.check_preconditions(data)?;
        let sequence = store.reserve_sequence(&key)?;
        let lot = self.compose(data, size, sequence)?;
        debug!("assign_lot_id key={key} lot={lot}");
        Ok(lot)
    }
}

/// Asigna el lote de una captura reservando el consecutivo en el almacén.
pub fn assign_lot_id<S: RecordStore + ?Sized>(data: &BatchData,
                                              catalog: &StandardsCatalog,
                                              store: &S)
                                              -> Result<LotId, LotAssignmentError> {
    LotAssigner::new(catalog).reserve(data, store)
}

/// Lote probable por conteo, sin reservar.
pub fn preview_lot_id<S: RecordStore + ?Sized>(data: &BatchData,
                                               catalog: &StandardsCatalog,
                                               store: &S)
                                               -> Result<LotId, LotAssignmentError> {
    LotAssigner::new(catalog).preview(data, store)
}
