//! Backend en memoria de `RecordStore`.
//!
//! Pensado para tests, el binario de demostración y como referencia de
//! paridad para el backend Postgres. Seguro para uso concurrente: los
//! registros viven detrás de un `RwLock` y los consecutivos de lote en un
//! `DashMap` cuyo bloqueo por entrada serializa las reservas de una misma
//! clave.
use dashmap::DashMap;
use log::debug;
use qc_domain::{BatchRecord, NewBatchRecord, RecordEdit};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{lot_counts, RecordFilter, RecordStore, StoreError};
use crate::lot::LotKey;

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<BatchRecord>>,
    sequences: DashMap<LotKey, u32>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga un registro histórico tal cual, sin validar unicidad del lote
    /// (los datos heredados pueden traer lotes vacíos o repetidos).
    pub fn import_legacy(&self, record: BatchRecord) -> Result<(), StoreError> {
        self.write()?.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<BatchRecord>>, StoreError> {
        self.records.read().map_err(|_| StoreError::Backend("lock de registros envenenado".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<BatchRecord>>, StoreError> {
        self.records.write().map_err(|_| StoreError::Backend("lock de registros envenenado".into()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn count_lots(&self, key: &LotKey) -> Result<u64, StoreError> {
        let records = self.read()?;
        let n = records.iter()
                       .filter(|r| key.matches(&r.data) && lot_counts(r.lot_id.as_deref()))
                       .count();
        Ok(n as u64)
    }

    fn reserve_sequence(&self, key: &LotKey) -> Result<u32, StoreError> {
        // La entrada queda bloqueada hasta soltar `slot`: dos reservas de la
        // misma clave no pueden intercalarse.
        let mut slot = self.sequences.entry(key.clone()).or_insert(0);
        let existing = u32::try_from(self.count_lots(key)?).unwrap_or(u32::MAX);
        let next = (*slot).max(existing).saturating_add(1);
        *slot = next;
        debug!("reserve_sequence key={key} seq={next}");
        Ok(next)
    }

    fn insert(&self, record: NewBatchRecord) -> Result<Uuid, StoreError> {
        let mut records = self.write()?;
        if records.iter().any(|r| r.lot_id.as_deref() == Some(record.lot_id.as_str())) {
            return Err(StoreError::DuplicateLot(record.lot_id));
        }
        let id = record.id;
        records.push(record.into());
        Ok(id)
    }

    fn get(&self, id: Uuid) -> Result<Option<BatchRecord>, StoreError> {
        Ok(self.read()?.iter().find(|r| r.id == id).cloned())
    }

    fn query(&self, filter: &RecordFilter) -> Result<Vec<BatchRecord>, StoreError> {
        let mut out: Vec<BatchRecord> = self.read()?.iter().filter(|r| filter.matches(r)).cloned().collect();
        // sort estable: empates de timestamp conservan el orden de inserción
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    fn update(&self, id: Uuid, edit: &RecordEdit) -> Result<BatchRecord, StoreError> {
        let mut records = self.write()?;
        let record = records.iter_mut().find(|r| r.id == id).ok_or(StoreError::NotFound(id))?;
        edit.apply_to(record);
        Ok(record.clone())
    }

    fn update_with(&self, id: Uuid, edit: &dyn Fn(&BatchRecord) -> RecordEdit) -> Result<BatchRecord, StoreError> {
        let mut records = self.write()?;
        let record = records.iter_mut().find(|r| r.id == id).ok_or(StoreError::NotFound(id))?;
        let change = edit(&*record);
        change.apply_to(record);
        Ok(record.clone())
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
