use chrono::{NaiveDate, Utc};
use qc_core::{assign_lot_id, preview_lot_id, InMemoryRecordStore, LotAssignmentError, RecordStore, StoreError};
use qc_domain::{BatchData, BatchRecord, NewBatchRecord, OverallStatus, SelfReport, SolidsReading, StandardsCatalog};
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

fn data(branch: &str, product: &str, size: f64) -> BatchData {
    BatchData { branch: branch.into(),
                preparer: "Luis".into(),
                manufacture_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                product_code: product.into(),
                batch_size: size,
                ph: Some(7.0),
                solids_1: SolidsReading { value: Some(30.0),
                                          temperature: None },
                solids_2: SolidsReading::default(),
                appearance: None,
                color: SelfReport::Conforme,
                aroma: SelfReport::Conforme,
                notes: None }
}

fn persist(store: &InMemoryRecordStore, data: BatchData, lot: String) {
    store.insert(NewBatchRecord { id: Uuid::new_v4(),
                                  lot_id: lot,
                                  status: OverallStatus::Conforme,
                                  product_family: "DETERGENTES LIQUIDOS".into(),
                                  created_at: Utc::now(),
                                  data })
         .unwrap();
}

fn legacy(store: &InMemoryRecordStore, data: BatchData, lot: Option<&str>) {
    store.import_legacy(BatchRecord { id: Uuid::new_v4(),
                                      lot_id: lot.map(str::to_string),
                                      status: OverallStatus::Conforme,
                                      product_family: "DETERGENTES LIQUIDOS".into(),
                                      created_at: Utc::now(),
                                      data })
         .unwrap();
}

#[test]
fn first_lot_of_the_day_is_01() {
    let catalog = StandardsCatalog::builtin();
    let store = InMemoryRecordStore::new();
    let lot = assign_lot_id(&data("Planta Central", "LAV", 1000.0), &catalog, &store).unwrap();
    assert_eq!(lot.to_string(), "240305-PC-LAV1000-01");
}

#[test]
fn sequence_follows_existing_lots_and_ignores_empty_markers() {
    let catalog = StandardsCatalog::builtin();
    let store = InMemoryRecordStore::new();
    let d = data("Planta Central", "LAV", 1000.0);
    legacy(&store, d.clone(), Some("240305-PC-LAV1000-01"));
    legacy(&store, d.clone(), Some("240305-PC-LAV1000-02"));
    legacy(&store, d.clone(), Some("N/A"));
    legacy(&store, d.clone(), Some(""));
    legacy(&store, d.clone(), None);
    // otra sucursal no comparte secuencia
    legacy(&store, data("Sucursal Norte", "LAV", 1000.0), Some("240305-SN-LAV1000-01"));

    let lot = assign_lot_id(&d, &catalog, &store).unwrap();
    assert_eq!(lot.sequence(), 3);
    assert_eq!(lot.to_string(), "240305-PC-LAV1000-03");
}

#[test]
fn unknown_branch_uses_placeholder_and_size_is_rounded() {
    let catalog = StandardsCatalog::builtin();
    let store = InMemoryRecordStore::new();
    let lot = assign_lot_id(&data("Bodega Temporal", "SUA", 999.5), &catalog, &store).unwrap();
    assert_eq!(lot.to_string(), "240305-XXX-SUA1000-01");
}

#[test]
fn preconditions_are_reported() {
    let catalog = StandardsCatalog::builtin();
    let store = InMemoryRecordStore::new();
    for (d, field) in [(data("", "LAV", 10.0), "branch"),
                       (data("Planta Central", " ", 10.0), "product_code"),
                       (data("Planta Central", "LAV", 0.0), "batch_size"),
                       (data("Planta Central", "LAV", f64::NAN), "batch_size")]
    {
        match assign_lot_id(&d, &catalog, &store) {
            Err(LotAssignmentError::Precondition { field: f, .. }) => assert_eq!(f, field),
            other => panic!("esperaba precondición en {field}, obtuve {other:?}"),
        }
    }
}

#[test]
fn composition_failures_name_the_offending_field() {
    let catalog = StandardsCatalog::builtin().with_branch("Sucursal Sur", "S-S");
    let store = InMemoryRecordStore::new();
    for (d, field) in [(data("Sucursal Sur", "LAV", 10.0), "branch_acronym"),
                       (data("Planta Central", "LAV2", 10.0), "product_code")]
    {
        match preview_lot_id(&d, &catalog, &store) {
            Err(LotAssignmentError::Precondition { field: f, .. }) => assert_eq!(f, field),
            other => panic!("esperaba precondición en {field}, obtuve {other:?}"),
        }
    }
}

#[test]
fn manufacture_year_outside_two_digit_window_is_rejected_before_reserving() {
    let catalog = StandardsCatalog::builtin();
    let store = InMemoryRecordStore::new();
    let mut late = data("Planta Central", "LAV", 10.0);
    late.manufacture_date = NaiveDate::from_ymd_opt(2070, 6, 1).unwrap();
    match assign_lot_id(&late, &catalog, &store) {
        Err(LotAssignmentError::Precondition { field, .. }) => assert_eq!(field, "manufacture_date"),
        other => panic!("esperaba precondición de fecha, obtuve {other:?}"),
    }
    let mut edge = late.clone();
    edge.manufacture_date = NaiveDate::from_ymd_opt(2068, 12, 31).unwrap();
    let lot = assign_lot_id(&edge, &catalog, &store).unwrap();
    assert_eq!(lot.to_string(), "681231-PC-LAV10-01");
    assert_eq!(lot.to_string().parse::<qc_core::LotId>().unwrap().manufacture_date(), edge.manufacture_date);
}

#[test]
fn sequence_beyond_99_is_not_truncated() {
    let catalog = StandardsCatalog::builtin();
    let store = InMemoryRecordStore::new();
    let d = data("Planta Central", "LAV", 50.0);
    for _ in 0..99 {
        let lot = assign_lot_id(&d, &catalog, &store).unwrap();
        persist(&store, d.clone(), lot.to_string());
    }
    let lot = assign_lot_id(&d, &catalog, &store).unwrap();
    assert_eq!(lot.to_string(), "240305-PC-LAV50-100");
}

// Regresión de la carrera de conteo: el candidato por conteo se repite entre
// capturas simultáneas, la reserva no.
#[test]
fn preview_repeats_candidate_but_reservation_does_not() {
    let catalog = StandardsCatalog::builtin();
    let store = InMemoryRecordStore::new();
    let d = data("Planta Central", "LAV", 1000.0);

    let a = preview_lot_id(&d, &catalog, &store).unwrap();
    let b = preview_lot_id(&d, &catalog, &store).unwrap();
    assert_eq!(a, b);

    let r1 = assign_lot_id(&d, &catalog, &store).unwrap();
    let r2 = assign_lot_id(&d, &catalog, &store).unwrap();
    assert_ne!(r1, r2);
    assert_eq!((r1.sequence(), r2.sequence()), (1, 2));
}

#[test]
fn concurrent_reservations_are_distinct() {
    let catalog = Arc::new(StandardsCatalog::builtin());
    let store = Arc::new(InMemoryRecordStore::new());
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers).map(|_| {
                                          let (catalog, store, barrier) =
                                              (Arc::clone(&catalog), Arc::clone(&store), Arc::clone(&barrier));
                                          thread::spawn(move || {
                                              let d = data("Planta Central", "LAV", 1000.0);
                                              barrier.wait();
                                              let lot = assign_lot_id(&d, &catalog, store.as_ref()).unwrap();
                                              persist(&store, d, lot.to_string());
                                              lot.sequence()
                                          })
                                      })
                                      .collect();
    let mut seqs: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    seqs.sort_unstable();
    assert_eq!(seqs, (1..=workers as u32).collect::<Vec<_>>());
    assert_eq!(store.len(), workers);
}

#[test]
fn duplicate_lot_insert_is_rejected() {
    let store = InMemoryRecordStore::new();
    let d = data("Planta Central", "LAV", 1000.0);
    persist(&store, d.clone(), "240305-PC-LAV1000-01".into());
    let err = store.insert(NewBatchRecord { id: Uuid::new_v4(),
                                            lot_id: "240305-PC-LAV1000-01".into(),
                                            status: OverallStatus::Conforme,
                                            product_family: "DETERGENTES LIQUIDOS".into(),
                                            created_at: Utc::now(),
                                            data: d })
                   .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateLot(_)));
    assert!(err.is_retryable());
}
