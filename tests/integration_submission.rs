use qc_core::{InMemoryRecordStore, RecordFilter, RecordStore, StatusScope};
use qc_domain::{AdminEdit, OverallStatus, Parameter, SolidsReading, StandardsCatalog, SubmissionInput};
use qcflow::{Actor, SubmissionError, SubmissionService};
use uuid::Uuid;

fn service() -> SubmissionService<InMemoryRecordStore> {
    SubmissionService::new(InMemoryRecordStore::new(), StandardsCatalog::builtin())
}

fn actor() -> Actor {
    Actor::new("ana", "operator")
}

fn lav(ph: f64, solids: f64, appearance: &str) -> SubmissionInput {
    SubmissionInput { branch: Some("Planta Central".into()),
                      preparer: Some("Ana".into()),
                      manufacture_date: Some("2024-03-05".into()),
                      product_code: Some("LAV".into()),
                      batch_size: Some(1000.0),
                      ph: Some(ph),
                      solids_1: Some(solids),
                      solids_1_temperature: Some(25.0),
                      solids_2: None,
                      solids_2_temperature: None,
                      appearance: Some(appearance.into()),
                      color: Some("CONFORME".into()),
                      aroma: Some("CONFORME".into()),
                      notes: None }
}

#[test]
fn submit_assigns_consecutive_lots_and_status() {
    let svc = service();
    let a = svc.submit(&actor(), &lav(7.0, 30.0, "LIQUIDO VISCOSO")).unwrap();
    assert_eq!(a.lot_id, "240305-PC-LAV1000-01");
    assert_eq!(a.status, OverallStatus::Conforme);

    let b = svc.submit(&actor(), &lav(7.0, 27.0, "liquido viscoso")).unwrap();
    assert_eq!(b.lot_id, "240305-PC-LAV1000-02");
    assert_eq!(b.status, OverallStatus::Retener);
    assert_eq!(b.failed, vec![Parameter::Solids]);

    let c = svc.submit(&actor(), &lav(9.0, 30.0, "TURBIO")).unwrap();
    assert_eq!(c.status, OverallStatus::NoConforme);
    assert_eq!(c.failed, vec![Parameter::Ph, Parameter::Appearance]);

    let stored = svc.get(c.record_id).unwrap();
    assert_eq!(stored.lot_id.as_deref(), Some("240305-PC-LAV1000-03"));
    assert_eq!(stored.product_family, "DETERGENTES LIQUIDOS");
}

#[test]
fn invalid_input_is_rejected_before_any_lot_is_used() {
    let svc = service();
    let mut bad = lav(7.0, 30.0, "LIQUIDO VISCOSO");
    bad.ph = None;
    let err = svc.submit(&actor(), &bad).unwrap_err();
    assert!(matches!(&err, SubmissionError::Validation(e) if e.field() == Some("ph")));
    assert!(!err.is_retryable());
    assert!(svc.store().is_empty());

    let ok = svc.submit(&actor(), &lav(7.0, 30.0, "LIQUIDO VISCOSO")).unwrap();
    assert!(ok.lot_id.ends_with("-01"));
}

#[test]
fn preview_does_not_consume_the_sequence() {
    let svc = service();
    let input = lav(7.0, 30.0, "LIQUIDO VISCOSO");
    assert_eq!(svc.preview_lot(&input).unwrap().to_string(), "240305-PC-LAV1000-01");
    assert_eq!(svc.preview_lot(&input).unwrap().to_string(), "240305-PC-LAV1000-01");
    assert_eq!(svc.submit(&actor(), &input).unwrap().lot_id, "240305-PC-LAV1000-01");
    assert_eq!(svc.preview_lot(&input).unwrap().to_string(), "240305-PC-LAV1000-02");
}

#[test]
fn admin_edit_rederives_status_but_keeps_lot() {
    let svc = service();
    let out = svc.submit(&actor(), &lav(9.0, 30.0, "TURBIO")).unwrap();
    let admin = Actor::new("sup", "admin");

    let fixed = svc.admin_edit(&admin,
                               out.record_id,
                               &AdminEdit { ph: Some(7.0),
                                            appearance: Some("liquido viscoso".into()),
                                            ..AdminEdit::default() })
                   .unwrap();
    assert_eq!(fixed.status, OverallStatus::Conforme);
    assert_eq!(fixed.lot_id.as_deref(), Some(out.lot_id.as_str()));
    assert_eq!(fixed.data.appearance.as_deref(), Some("LIQUIDO VISCOSO"));

    let worse = svc.admin_edit(&admin,
                               out.record_id,
                               &AdminEdit { solids_1: Some(SolidsReading { value: Some(40.0),
                                                                           temperature: None }),
                                            ..AdminEdit::default() })
                   .unwrap();
    assert_eq!(worse.status, OverallStatus::NoConforme);
    assert_eq!(worse.lot_id, fixed.lot_id);
}

#[test]
fn edit_and_delete_unknown_record_is_not_found() {
    let svc = service();
    let id = Uuid::new_v4();
    let edit = AdminEdit { ph: Some(7.0),
                           ..AdminEdit::default() };
    assert_eq!(svc.admin_edit(&actor(), id, &edit).unwrap_err(), SubmissionError::NotFound(id));
    assert_eq!(svc.delete(&actor(), id).unwrap_err(), SubmissionError::NotFound(id));
}

#[test]
fn deleting_frees_nothing_in_the_sequence() {
    let svc = service();
    let first = svc.submit(&actor(), &lav(7.0, 30.0, "LIQUIDO VISCOSO")).unwrap();
    svc.delete(&actor(), first.record_id).unwrap();
    let second = svc.submit(&actor(), &lav(7.0, 30.0, "LIQUIDO VISCOSO")).unwrap();
    assert_eq!(second.lot_id, "240305-PC-LAV1000-02");
    assert_eq!(svc.list(&RecordFilter::all()).unwrap().len(), 1);
}

#[test]
fn report_uses_configured_scope() {
    let dashboard = service();
    let full = service().with_dashboard_scope(StatusScope::Submission);
    for svc in [&dashboard, &full] {
        svc.submit(&actor(), &lav(9.0, 30.0, "LIQUIDO VISCOSO")).unwrap();
    }
    let d = dashboard.report(&RecordFilter::all(), None).unwrap();
    assert_eq!(d.kpis.conforming, 1);
    let f = full.report(&RecordFilter::all(), None).unwrap();
    assert_eq!(f.kpis.rejected, 1);
    // el Pareto siempre usa la evaluación completa
    assert_eq!(d.pareto[0].parameter, Parameter::Ph);
    assert_eq!(d.pareto[0].count, 1);
}

#[test]
fn store_failure_is_retryable_and_names_the_lot() {
    struct FailingInsert(InMemoryRecordStore);

    impl RecordStore for FailingInsert {
        fn count_lots(&self, key: &qc_core::LotKey) -> Result<u64, qc_core::StoreError> {
            self.0.count_lots(key)
        }
        fn reserve_sequence(&self, key: &qc_core::LotKey) -> Result<u32, qc_core::StoreError> {
            self.0.reserve_sequence(key)
        }
        fn insert(&self, _: qc_domain::NewBatchRecord) -> Result<Uuid, qc_core::StoreError> {
            Err(qc_core::StoreError::Unavailable("conexión cerrada".into()))
        }
        fn get(&self, id: Uuid) -> Result<Option<qc_domain::BatchRecord>, qc_core::StoreError> {
            self.0.get(id)
        }
        fn query(&self, filter: &RecordFilter) -> Result<Vec<qc_domain::BatchRecord>, qc_core::StoreError> {
            self.0.query(filter)
        }
        fn update(&self, id: Uuid, edit: &qc_domain::RecordEdit) -> Result<qc_domain::BatchRecord, qc_core::StoreError> {
            self.0.update(id, edit)
        }
        fn update_with(&self,
                       id: Uuid,
                       edit: &dyn Fn(&qc_domain::BatchRecord) -> qc_domain::RecordEdit)
                       -> Result<qc_domain::BatchRecord, qc_core::StoreError> {
            self.0.update_with(id, edit)
        }
        fn delete(&self, id: Uuid) -> Result<(), qc_core::StoreError> {
            self.0.delete(id)
        }
    }

    let svc = SubmissionService::new(FailingInsert(InMemoryRecordStore::new()), StandardsCatalog::builtin());
    let err = svc.submit(&actor(), &lav(7.0, 30.0, "LIQUIDO VISCOSO")).unwrap_err();
    assert!(err.is_retryable());
    match err {
        SubmissionError::Store { lot_id, .. } => assert_eq!(lot_id.as_deref(), Some("240305-PC-LAV1000-01")),
        other => panic!("esperaba falla de almacén, obtuve {other:?}"),
    }
}

#[test]
fn sequence_backend_failure_is_retryable_not_a_data_error() {
    struct BrokenSequence(InMemoryRecordStore);

    impl RecordStore for BrokenSequence {
        fn count_lots(&self, key: &qc_core::LotKey) -> Result<u64, qc_core::StoreError> {
            self.0.count_lots(key)
        }
        fn reserve_sequence(&self, _: &qc_core::LotKey) -> Result<u32, qc_core::StoreError> {
            Err(qc_core::StoreError::Backend("relation \"lot_sequences\" does not exist".into()))
        }
        fn insert(&self, record: qc_domain::NewBatchRecord) -> Result<Uuid, qc_core::StoreError> {
            self.0.insert(record)
        }
        fn get(&self, id: Uuid) -> Result<Option<qc_domain::BatchRecord>, qc_core::StoreError> {
            self.0.get(id)
        }
        fn query(&self, filter: &RecordFilter) -> Result<Vec<qc_domain::BatchRecord>, qc_core::StoreError> {
            self.0.query(filter)
        }
        fn update(&self, id: Uuid, edit: &qc_domain::RecordEdit) -> Result<qc_domain::BatchRecord, qc_core::StoreError> {
            self.0.update(id, edit)
        }
        fn update_with(&self,
                       id: Uuid,
                       edit: &dyn Fn(&qc_domain::BatchRecord) -> qc_domain::RecordEdit)
                       -> Result<qc_domain::BatchRecord, qc_core::StoreError> {
            self.0.update_with(id, edit)
        }
        fn delete(&self, id: Uuid) -> Result<(), qc_core::StoreError> {
            self.0.delete(id)
        }
    }

    let svc = SubmissionService::new(BrokenSequence(InMemoryRecordStore::new()), StandardsCatalog::builtin());
    let err = svc.submit(&actor(), &lav(7.0, 30.0, "LIQUIDO VISCOSO")).unwrap_err();
    assert!(matches!(err, SubmissionError::LotAssignment(qc_core::LotAssignmentError::Store(_))));
    assert!(err.is_retryable());
    assert!(!err.user_message().starts_with("Revise"));
    assert!(svc.store().0.is_empty());
}

#[test]
fn concurrent_admin_edits_keep_both_changes() {
    let svc = service();
    let out = svc.submit(&actor(), &lav(9.0, 30.0, "TURBIO")).unwrap();
    let admin = Actor::new("sup", "admin");
    let barrier = std::sync::Barrier::new(2);

    std::thread::scope(|scope| {
        scope.spawn(|| {
                 barrier.wait();
                 svc.admin_edit(&admin,
                                out.record_id,
                                &AdminEdit { ph: Some(7.0),
                                             ..AdminEdit::default() })
                    .unwrap();
             });
        scope.spawn(|| {
                 barrier.wait();
                 svc.admin_edit(&admin,
                                out.record_id,
                                &AdminEdit { appearance: Some("LIQUIDO VISCOSO".into()),
                                             ..AdminEdit::default() })
                    .unwrap();
             });
    });

    let stored = svc.get(out.record_id).unwrap();
    assert_eq!(stored.data.ph, Some(7.0));
    assert_eq!(stored.data.appearance.as_deref(), Some("LIQUIDO VISCOSO"));
    assert_eq!(stored.status, OverallStatus::Conforme);
}
