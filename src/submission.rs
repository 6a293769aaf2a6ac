//! Servicio de captura de registros de lote.
//!
//! Orquesta validación → clasificación → agregación → reserva de lote →
//! inserción sobre un `RecordStore`, más la edición administrativa acotada,
//! el borrado y la generación de reportes. El actor lo provee el llamador
//! (proveedor de identidad externo); aquí sólo se registra en los logs.
use chrono::Utc;
use log::{debug, error, info};
use qc_core::reporting::{build_report, DashboardReport, ReportOptions};
use qc_core::{aggregate, assign_lot_id, preview_lot_id, Classifier, LotId, RecordFilter, RecordStore, StatusScope};
use qc_domain::{AdminEdit, BatchData, BatchRecord, NewBatchRecord, OverallStatus, Parameter, RecordEdit,
                StandardsCatalog, SubmissionInput, Verdict};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::SubmissionError;

/// Usuario que actúa, tal como lo entrega el proveedor de identidad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub role: String,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self { name: name.into(),
               role: role.into() }
    }
}

/// Veredictos y estatus de una captura, sin persistir.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub data: BatchData,
    pub verdicts: Vec<(Parameter, Verdict)>,
    pub status: OverallStatus,
    pub failed: Vec<Parameter>,
}

/// Resultado de una captura persistida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub record_id: Uuid,
    pub lot_id: String,
    pub status: OverallStatus,
    pub verdicts: Vec<(Parameter, Verdict)>,
    pub failed: Vec<Parameter>,
}

pub struct SubmissionService<S: RecordStore> {
    store: S,
    catalog: StandardsCatalog,
    dashboard_scope: StatusScope,
}

impl<S: RecordStore> SubmissionService<S> {
    pub fn new(store: S, catalog: StandardsCatalog) -> Self {
        Self { store,
               catalog,
               dashboard_scope: StatusScope::Dashboard }
    }

    pub fn with_dashboard_scope(mut self, scope: StatusScope) -> Self {
        self.dashboard_scope = scope;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &StandardsCatalog {
        &self.catalog
    }

    fn evaluate_data(&self, data: BatchData) -> Evaluation {
        let verdicts = Classifier::new(&self.catalog).evaluate(&data);
        let agg = aggregate(&verdicts);
        Evaluation { data,
                     verdicts,
                     status: agg.status,
                     failed: agg.failed }
    }

    /// Valida y clasifica una captura sin tocar el almacén.
    pub fn evaluate(&self, input: &SubmissionInput) -> Result<Evaluation, SubmissionError> {
        let data = input.validate(&self.catalog)?;
        Ok(self.evaluate_data(data))
    }

    /// Lote probable de la captura (por conteo, sin reservar).
    pub fn preview_lot(&self, input: &SubmissionInput) -> Result<LotId, SubmissionError> {
        let data = input.validate(&self.catalog)?;
        Ok(preview_lot_id(&data, &self.catalog, &self.store)?)
    }

    /// Captura completa: el registro sólo se persiste con lote asignado.
    pub fn submit(&self, actor: &Actor, input: &SubmissionInput) -> Result<SubmissionOutcome, SubmissionError> {
        let evaluation = self.evaluate(input)?;
        let lot = assign_lot_id(&evaluation.data, &self.catalog, &self.store)?;
        let lot_id = lot.to_string();
        let product_family = self.catalog
                                 .family_of(&evaluation.data.product_code)
                                 .map(|f| f.name.clone())
                                 .unwrap_or_default();
        let record = NewBatchRecord { id: Uuid::new_v4(),
                                      lot_id: lot_id.clone(),
                                      status: evaluation.status,
                                      product_family,
                                      created_at: Utc::now(),
                                      data: evaluation.data };
        let record_id = self.store.insert(record).map_err(|source| {
                                                     error!("submit:insert lot={lot_id} err={source}");
                                                     SubmissionError::Store { lot_id: Some(lot_id.clone()),
                                                                              source }
                                                 })?;
        info!("submit actor={} role={} record={record_id} lot={lot_id} status={}",
              actor.name, actor.role, evaluation.status);
        Ok(SubmissionOutcome { record_id,
                               lot_id,
                               status: evaluation.status,
                               verdicts: evaluation.verdicts,
                               failed: evaluation.failed })
    }

    /// Edición administrativa: pH, sólidos, apariencia, color y aroma. El
    /// estatus se re-deriva con la regla de captura; el lote nunca cambia.
    /// El parche se aplica sobre el valor vigente dentro del almacén, así que
    /// dos ediciones concurrentes conservan ambos cambios.
    pub fn admin_edit(&self, actor: &Actor, id: Uuid, edit: &AdminEdit) -> Result<BatchRecord, SubmissionError> {
        let edit = edit.validate(&self.catalog)?;
        let updated = self.store
                          .update_with(id, &|current| {
                              let evaluation = self.evaluate_data(edit.apply_to(&current.data));
                              RecordEdit::from_data(&evaluation.data, evaluation.status)
                          })
                          .map_err(SubmissionError::store)?;
        info!("admin_edit actor={} role={} record={id} status={}",
              actor.name, actor.role, updated.status);
        Ok(updated)
    }

    pub fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), SubmissionError> {
        self.store.delete(id).map_err(SubmissionError::store)?;
        info!("delete actor={} role={} record={id}", actor.name, actor.role);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<BatchRecord, SubmissionError> {
        self.store
            .get(id)
            .map_err(SubmissionError::store)?
            .ok_or(SubmissionError::NotFound(id))
    }

    pub fn list(&self, filter: &RecordFilter) -> Result<Vec<BatchRecord>, SubmissionError> {
        self.store.query(filter).map_err(SubmissionError::store)
    }

    /// Reporte del tablero sobre los registros del filtro. Con producto
    /// seleccionado se restringen los registros y se habilitan límites y
    /// ejes dinámicos.
    pub fn report(&self, filter: &RecordFilter, product: Option<String>) -> Result<DashboardReport, SubmissionError> {
        let mut filter = filter.clone();
        if let Some(p) = &product {
            filter.product_code = Some(p.clone());
        }
        let records = self.list(&filter)?;
        debug!("report records={} product={product:?} scope={}", records.len(), self.dashboard_scope);
        Ok(build_report(&records,
                        &self.catalog,
                        &ReportOptions { product,
                                         scope: self.dashboard_scope }))
    }
}
