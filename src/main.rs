//! Demostración en memoria: captura tres lotes, edita uno y muestra el
//! reporte del tablero. `RUST_LOG=debug` muestra el ciclo de vida completo.
use qc_core::{InMemoryRecordStore, RecordFilter};
use qc_domain::{AdminEdit, SubmissionInput};
use qcflow::{Actor, AppConfig, SubmissionService};
use tracing_subscriber::EnvFilter;

fn input(product: &str, size: f64, ph: f64, solids: f64, appearance: &str) -> SubmissionInput {
    SubmissionInput { branch: Some("Planta Central".into()),
                      preparer: Some("Operador demo".into()),
                      manufacture_date: Some("2024-03-05".into()),
                      product_code: Some(product.into()),
                      batch_size: Some(size),
                      ph: Some(ph),
                      solids_1: Some(solids),
                      solids_1_temperature: Some(25.0),
                      solids_2: Some(solids),
                      solids_2_temperature: Some(25.0),
                      appearance: Some(appearance.into()),
                      color: Some("CONFORME".into()),
                      aroma: Some("CONFORME".into()),
                      notes: None }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config: {e}");
            std::process::exit(2);
        }
    };
    let catalog = match cfg.load_catalog() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("catálogo: {e}");
            std::process::exit(2);
        }
    };
    let service = SubmissionService::new(InMemoryRecordStore::new(), catalog).with_dashboard_scope(cfg.dashboard_scope);
    let operator = Actor::new("operador", "operator");
    let admin = Actor::new("supervisor", "admin");

    let mut last = None;
    for i in [input("LAV", 1000.0, 7.0, 30.0, "LIQUIDO VISCOSO"),
              input("LAV", 500.0, 7.0, 27.0, "LIQUIDO VISCOSO"),
              input("LAV", 500.0, 9.0, 30.0, "TURBIO")]
    {
        match service.submit(&operator, &i) {
            Ok(out) => {
                println!("{} {} fallas={:?}", out.lot_id, out.status, out.failed);
                last = Some(out.record_id);
            }
            Err(e) => eprintln!("{}", e.user_message()),
        }
    }

    if let Some(id) = last {
        let fix = AdminEdit { ph: Some(7.0),
                              appearance: Some("LIQUIDO VISCOSO".into()),
                              ..AdminEdit::default() };
        match service.admin_edit(&admin, id, &fix) {
            Ok(r) => println!("editado {} -> {}", r.lot_id.as_deref().unwrap_or("-"), r.status),
            Err(e) => eprintln!("{}", e.user_message()),
        }
    }

    match service.report(&RecordFilter::all(), Some("LAV".into())) {
        Ok(report) => match serde_json::to_string_pretty(&report.kpis) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("serialización: {e}"),
        },
        Err(e) => eprintln!("{}", e.user_message()),
    }
}
