//! Implementación Postgres (Diesel) de `RecordStore`.
//!
//! - Paridad 1:1 con `InMemoryRecordStore`: mismo orden de consulta (creación,
//!   desempate por `row_seq`), mismas reglas de conteo de lotes.
//! - `reserve_sequence` es un único `INSERT .. ON CONFLICT DO UPDATE` sobre
//!   `lot_sequences`; el bloqueo de fila de Postgres serializa reservas de la
//!   misma clave.
//! - El índice único parcial sobre `lot_id` rechaza duplicados aunque algún
//!   escritor ignore la secuencia.
//! - Sólo las lecturas se reintentan ante errores transitorios. Las escrituras
//!   devuelven el error y el llamador decide.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sql_types::{Date, Integer, Text};
use log::{debug, error, warn};
use qc_core::constants::EMPTY_LOT_MARKER;
use qc_core::{LotKey, RecordFilter, RecordStore, StoreError};
use qc_domain::{BatchData, BatchRecord, NewBatchRecord, OverallStatus, RecordEdit, SelfReport, SolidsReading};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::batch_records;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o un proveedor de prueba sin acoplar el
/// store a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// `ConnectionProvider` respaldado por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila de lectura de `batch_records`.
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = batch_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BatchRow {
    pub id: Uuid,
    pub lot_id: Option<String>,
    pub status: String,
    pub product_family: String,
    pub created_at: DateTime<Utc>,
    pub branch: String,
    pub preparer: String,
    pub manufacture_date: NaiveDate,
    pub product_code: String,
    pub batch_size: f64,
    pub ph: Option<f64>,
    pub solids_1: Option<f64>,
    pub solids_1_temperature: Option<f64>,
    pub solids_2: Option<f64>,
    pub solids_2_temperature: Option<f64>,
    pub appearance: Option<String>,
    pub color: String,
    pub aroma: String,
    pub notes: Option<String>,
}

impl TryFrom<BatchRow> for BatchRecord {
    type Error = PersistenceError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        let invalid = |e: qc_domain::DomainError| PersistenceError::InvalidRow(format!("{}: {e}", row.id));
        let status: OverallStatus = row.status.parse().map_err(invalid)?;
        let color: SelfReport = row.color.parse().map_err(invalid)?;
        let aroma: SelfReport = row.aroma.parse().map_err(invalid)?;
        Ok(BatchRecord { id: row.id,
                         lot_id: row.lot_id,
                         status,
                         product_family: row.product_family,
                         created_at: row.created_at,
                         data: BatchData { branch: row.branch,
                                           preparer: row.preparer,
                                           manufacture_date: row.manufacture_date,
                                           product_code: row.product_code,
                                           batch_size: row.batch_size,
                                           ph: row.ph,
                                           solids_1: SolidsReading { value: row.solids_1,
                                                                     temperature: row.solids_1_temperature },
                                           solids_2: SolidsReading { value: row.solids_2,
                                                                     temperature: row.solids_2_temperature },
                                           appearance: row.appearance,
                                           color,
                                           aroma,
                                           notes: row.notes } })
    }
}

/// Fila para insertar en `batch_records`. `row_seq` lo asigna la base.
#[derive(Insertable, Debug)]
#[diesel(table_name = batch_records)]
pub struct NewBatchRow<'a> {
    pub id: Uuid,
    pub lot_id: Option<&'a str>,
    pub status: &'a str,
    pub product_family: &'a str,
    pub created_at: DateTime<Utc>,
    pub branch: &'a str,
    pub preparer: &'a str,
    pub manufacture_date: NaiveDate,
    pub product_code: &'a str,
    pub batch_size: f64,
    pub ph: Option<f64>,
    pub solids_1: Option<f64>,
    pub solids_1_temperature: Option<f64>,
    pub solids_2: Option<f64>,
    pub solids_2_temperature: Option<f64>,
    pub appearance: Option<&'a str>,
    pub color: &'a str,
    pub aroma: &'a str,
    pub notes: Option<&'a str>,
}

impl<'a> NewBatchRow<'a> {
    fn new(id: Uuid,
           lot_id: Option<&'a str>,
           status: OverallStatus,
           product_family: &'a str,
           created_at: DateTime<Utc>,
           d: &'a BatchData)
           -> Self {
        NewBatchRow { id,
                      lot_id,
                      status: status.as_str(),
                      product_family,
                      created_at,
                      branch: &d.branch,
                      preparer: &d.preparer,
                      manufacture_date: d.manufacture_date,
                      product_code: &d.product_code,
                      batch_size: d.batch_size,
                      ph: d.ph,
                      solids_1: d.solids_1.value,
                      solids_1_temperature: d.solids_1.temperature,
                      solids_2: d.solids_2.value,
                      solids_2_temperature: d.solids_2.temperature,
                      appearance: d.appearance.as_deref(),
                      color: d.color.as_str(),
                      aroma: d.aroma.as_str(),
                      notes: d.notes.as_deref() }
    }
}

/// Cambios de una edición administrativa. `None` escribe NULL.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = batch_records)]
#[diesel(treat_none_as_null = true)]
pub struct EditRow<'a> {
    pub ph: Option<f64>,
    pub solids_1: Option<f64>,
    pub solids_1_temperature: Option<f64>,
    pub solids_2: Option<f64>,
    pub solids_2_temperature: Option<f64>,
    pub appearance: Option<&'a str>,
    pub color: &'a str,
    pub aroma: &'a str,
    pub status: &'a str,
}

impl<'a> From<&'a RecordEdit> for EditRow<'a> {
    fn from(e: &'a RecordEdit) -> Self {
        EditRow { ph: e.ph,
                  solids_1: e.solids_1.value,
                  solids_1_temperature: e.solids_1.temperature,
                  solids_2: e.solids_2.value,
                  solids_2_temperature: e.solids_2.temperature,
                  appearance: e.appearance.as_deref(),
                  color: e.color.as_str(),
                  aroma: e.aroma.as_str(),
                  status: e.status.as_str() }
    }
}

#[derive(QueryableByName, Debug)]
struct ReservedSeq {
    #[diesel(sql_type = Integer)]
    last_seq: i32,
}

// `$4` es el marcador de lote vacío. La fila nueva arranca en conteo + 1; una
// fila existente avanza desde max(último, conteo) para absorber registros
// importados después de crear la secuencia.
const RESERVE_SEQUENCE_SQL: &str = "INSERT INTO lot_sequences (branch, product_code, manufacture_date, last_seq) \
     VALUES ($1, $2, $3, (SELECT COUNT(*)::int FROM batch_records \
                          WHERE branch = $1 AND product_code = $2 AND manufacture_date = $3 \
                            AND lot_id IS NOT NULL AND lot_id <> '' AND lot_id <> $4) + 1) \
     ON CONFLICT (branch, product_code, manufacture_date) \
     DO UPDATE SET last_seq = GREATEST(lot_sequences.last_seq, EXCLUDED.last_seq - 1) + 1 \
     RETURNING last_seq";

/// Retry simple con backoff lineal (hasta 3 reintentos: 15ms, 30ms, 45ms).
/// Emite `warn!` por intento.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_transient() && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Implementación Postgres de `RecordStore`.
pub struct PgRecordStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgRecordStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Inserta un registro histórico tal cual (lote opcional, sin reservar
    /// secuencia). El índice único sigue aplicando a lotes no vacíos.
    pub fn import_legacy(&self, record: &BatchRecord) -> Result<(), StoreError> {
        let row = NewBatchRow::new(record.id,
                                   record.lot_id.as_deref(),
                                   record.status,
                                   &record.product_family,
                                   record.created_at,
                                   &record.data);
        let mut conn = self.provider.connection()?;
        diesel::insert_into(batch_records::table).values(&row)
                                                 .execute(&mut conn)
                                                 .map_err(PersistenceError::from)?;
        Ok(())
    }
}

impl<P: ConnectionProvider> RecordStore for PgRecordStore<P> {
    fn count_lots(&self, key: &LotKey) -> Result<u64, StoreError> {
        let n: i64 = with_retry(|| {
                         let mut conn = self.provider.connection()?;
                         batch_records::table.filter(batch_records::branch.eq(&key.branch))
                                             .filter(batch_records::product_code.eq(&key.product_code))
                                             .filter(batch_records::manufacture_date.eq(key.manufacture_date))
                                             .filter(batch_records::lot_id.is_not_null())
                                             .filter(batch_records::lot_id.ne(""))
                                             .filter(batch_records::lot_id.ne(EMPTY_LOT_MARKER))
                                             .count()
                                             .get_result(&mut conn)
                                             .map_err(PersistenceError::from)
                     })?;
        debug!("count_lots key={key} count={n}");
        Ok(n.max(0) as u64)
    }

    fn reserve_sequence(&self, key: &LotKey) -> Result<u32, StoreError> {
        let mut conn = self.provider.connection()?;
        let reserved: ReservedSeq = diesel::sql_query(RESERVE_SEQUENCE_SQL).bind::<Text, _>(&key.branch)
                                                                          .bind::<Text, _>(&key.product_code)
                                                                          .bind::<Date, _>(key.manufacture_date)
                                                                          .bind::<Text, _>(EMPTY_LOT_MARKER)
                                                                          .get_result(&mut conn)
                                                                          .map_err(|e| {
                                                                              error!("reserve_sequence key={key} err={e:?}");
                                                                              PersistenceError::from(e)
                                                                          })?;
        debug!("reserve_sequence key={key} seq={}", reserved.last_seq);
        u32::try_from(reserved.last_seq).map_err(|_| StoreError::Backend(format!("secuencia inválida {}", reserved.last_seq)))
    }

    fn insert(&self, record: NewBatchRecord) -> Result<Uuid, StoreError> {
        let row = NewBatchRow::new(record.id,
                                   Some(&record.lot_id),
                                   record.status,
                                   &record.product_family,
                                   record.created_at,
                                   &record.data);
        let mut conn = self.provider.connection()?;
        match diesel::insert_into(batch_records::table).values(&row).execute(&mut conn) {
            Ok(_) => {
                debug!("insert id={} lot={}", record.id, record.lot_id);
                Ok(record.id)
            }
            Err(e) => match PersistenceError::from(e) {
                PersistenceError::UniqueViolation(_) => Err(StoreError::DuplicateLot(record.lot_id.clone())),
                other => {
                    error!("insert id={} err={other:?}", record.id);
                    Err(other.into())
                }
            },
        }
    }

    fn get(&self, id: Uuid) -> Result<Option<BatchRecord>, StoreError> {
        let row: Option<BatchRow> = with_retry(|| {
                                        let mut conn = self.provider.connection()?;
                                        batch_records::table.find(id)
                                                            .select(BatchRow::as_select())
                                                            .first(&mut conn)
                                                            .optional()
                                                            .map_err(PersistenceError::from)
                                    })?;
        Ok(row.map(BatchRecord::try_from).transpose()?)
    }

    fn query(&self, filter: &RecordFilter) -> Result<Vec<BatchRecord>, StoreError> {
        let rows: Vec<BatchRow> = with_retry(|| {
                                      let mut conn = self.provider.connection()?;
                                      let mut q = batch_records::table.select(BatchRow::as_select()).into_boxed();
                                      if let Some(b) = &filter.branch {
                                          q = q.filter(batch_records::branch.eq(b));
                                      }
                                      if let Some(p) = &filter.product_code {
                                          q = q.filter(batch_records::product_code.eq(p));
                                      }
                                      if let Some(from) = filter.date_from {
                                          q = q.filter(batch_records::manufacture_date.ge(from));
                                      }
                                      if let Some(to) = filter.date_to {
                                          q = q.filter(batch_records::manufacture_date.le(to));
                                      }
                                      if let Some(s) = filter.status {
                                          q = q.filter(batch_records::status.eq(s.as_str()));
                                      }
                                      q.order((batch_records::created_at.asc(), batch_records::row_seq.asc()))
                                       .load(&mut conn)
                                       .map_err(PersistenceError::from)
                                  })?;
        debug!("query filter={filter:?} count={}", rows.len());
        rows.into_iter()
            .map(|r| BatchRecord::try_from(r).map_err(StoreError::from))
            .collect()
    }

    fn update(&self, id: Uuid, edit: &RecordEdit) -> Result<BatchRecord, StoreError> {
        let mut conn = self.provider.connection()?;
        let row: Option<BatchRow> = diesel::update(batch_records::table.find(id)).set(EditRow::from(edit))
                                                                                 .returning(BatchRow::as_returning())
                                                                                 .get_result(&mut conn)
                                                                                 .optional()
                                                                                 .map_err(PersistenceError::from)?;
        let row = row.ok_or(StoreError::NotFound(id))?;
        debug!("update id={id} status={}", edit.status);
        Ok(BatchRecord::try_from(row)?)
    }

    fn update_with(&self, id: Uuid, edit: &dyn Fn(&BatchRecord) -> RecordEdit) -> Result<BatchRecord, StoreError> {
        let mut conn = self.provider.connection()?;
        // `FOR UPDATE` bloquea la fila hasta el commit: otra edición del mismo
        // registro espera y luego lee el valor ya escrito.
        let row: Option<BatchRow> =
            conn.build_transaction()
                .read_write()
                .run::<_, PersistenceError, _>(|tx_conn| {
                    let current: Option<BatchRow> = batch_records::table.find(id)
                                                                        .select(BatchRow::as_select())
                                                                        .for_update()
                                                                        .first(tx_conn)
                                                                        .optional()?;
                    let Some(current) = current else {
                        return Ok(None);
                    };
                    let change = edit(&BatchRecord::try_from(current)?);
                    let row = diesel::update(batch_records::table.find(id)).set(EditRow::from(&change))
                                                                           .returning(BatchRow::as_returning())
                                                                           .get_result(tx_conn)?;
                    Ok(Some(row))
                })?;
        let row = row.ok_or(StoreError::NotFound(id))?;
        debug!("update_with id={id} status={}", row.status);
        Ok(BatchRecord::try_from(row)?)
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.provider.connection()?;
        let n = diesel::delete(batch_records::table.find(id)).execute(&mut conn)
                                                             .map_err(PersistenceError::from)?;
        if n == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!("delete id={id}");
        Ok(())
    }
}

/// Construye un pool Postgres r2d2 y corre las migraciones pendientes.
///
/// Si `min_size > max_size` usa `min_size = max_size`. Tamaños en cero se
/// elevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(validated_min.min(validated_max)))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
