//! `qc` — CLI del motor de conformidad de lotes.
//!
//! Con `DATABASE_URL` opera sobre Postgres; sin ella (o con `--memory`) usa
//! un almacén en memoria que sólo vive durante el comando.
//!
//! Códigos de salida: 0 ok, 2 uso, 4 captura rechazada / no encontrado,
//! 5 falla de almacén (reintentable).

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::warn;
use qc_core::{InMemoryRecordStore, LotAssignmentError, RecordFilter, RecordStore, StatusScope};
use qc_domain::{AdminEdit, OverallStatus, SubmissionInput};
use qc_persistence::{build_dev_pool_from_env, PgRecordStore, PoolProvider};
use qcflow::{Actor, AppConfig, SubmissionError, SubmissionService};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "qc", about = "Registro y evaluación de conformidad de lotes")]
struct Cli {
    /// Usa un almacén en memoria aunque exista DATABASE_URL.
    #[arg(long, global = true)]
    memory: bool,

    /// Nombre del usuario que actúa.
    #[arg(long, global = true, default_value = "cli")]
    actor: String,

    /// Rol del usuario que actúa.
    #[arg(long, global = true, default_value = "operator")]
    role: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Valida, clasifica, asigna lote y guarda una captura (JSON).
    Submit {
        /// Archivo JSON de captura; `-` lee de stdin.
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Valida y clasifica una captura sin guardarla.
    Classify {
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Lote probable de una captura (no reserva consecutivo).
    LotPreview {
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Edición administrativa de pH, sólidos, apariencia, color o aroma.
    Edit {
        id: Uuid,
        /// Parche JSON; `-` lee de stdin.
        #[arg(long, default_value = "-")]
        patch: String,
    },
    /// Elimina un registro.
    Delete { id: Uuid },
    /// Lista registros en orden de creación.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// KPIs, Pareto y cartas de control.
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        /// Parámetros que deciden el estatus del tablero: `solids` o `all`.
        #[arg(long)]
        scope: Option<StatusScope>,
    },
    /// Imprime el catálogo de estándares activo.
    Catalog,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    #[arg(long)]
    branch: Option<String>,
    /// Código de producto; en `report` habilita límites y ejes.
    #[arg(long)]
    product: Option<String>,
    /// Fecha de fabricación mínima (AAAA-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Fecha de fabricación máxima (AAAA-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    status: Option<OverallStatus>,
}

impl FilterArgs {
    fn to_filter(&self) -> RecordFilter {
        RecordFilter { branch: self.branch.clone(),
                       product_code: self.product.clone(),
                       date_from: self.from,
                       date_to: self.to,
                       status: self.status }
    }
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    Rejected(String),
    Store(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Rejected(_) => 4,
            CliError::Store(_) => 5,
        }
    }

    fn message(&self) -> &str {
        match self {
            CliError::Usage(m) | CliError::Rejected(m) | CliError::Store(m) => m,
        }
    }
}

impl From<SubmissionError> for CliError {
    fn from(e: SubmissionError) -> Self {
        match &e {
            SubmissionError::Validation(_)
            | SubmissionError::NotFound(_)
            | SubmissionError::LotAssignment(LotAssignmentError::Precondition { .. }) => {
                CliError::Rejected(e.user_message())
            }
            SubmissionError::LotAssignment(LotAssignmentError::Store(_)) | SubmissionError::Store { .. } => {
                CliError::Store(e.user_message())
            }
        }
    }
}

fn read_json<T: DeserializeOwned>(source: &str) -> Result<T, CliError> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)
                        .map_err(|e| CliError::Usage(format!("no se pudo leer stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(source).map_err(|e| CliError::Usage(format!("no se pudo leer {source}: {e}")))?
    };
    serde_json::from_str(&raw).map_err(|e| CliError::Rejected(format!("JSON inválido: {e}")))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::Usage(format!("serialización: {e}")))?;
    println!("{json}");
    Ok(())
}

fn run<S: RecordStore>(svc: &SubmissionService<S>, cli: &Cli) -> Result<(), CliError> {
    let actor = Actor::new(cli.actor.clone(), cli.role.clone());
    match &cli.command {
        Commands::Submit { input } => {
            let input: SubmissionInput = read_json(input)?;
            print_json(&svc.submit(&actor, &input)?)
        }
        Commands::Classify { input } => {
            let input: SubmissionInput = read_json(input)?;
            print_json(&svc.evaluate(&input)?)
        }
        Commands::LotPreview { input } => {
            let input: SubmissionInput = read_json(input)?;
            println!("{}", svc.preview_lot(&input)?);
            Ok(())
        }
        Commands::Edit { id, patch } => {
            let patch: AdminEdit = read_json(patch)?;
            print_json(&svc.admin_edit(&actor, *id, &patch)?)
        }
        Commands::Delete { id } => {
            svc.delete(&actor, *id)?;
            println!("eliminado {id}");
            Ok(())
        }
        Commands::List { filter } => print_json(&svc.list(&filter.to_filter())?),
        Commands::Report { filter, .. } => print_json(&svc.report(&filter.to_filter(), filter.product.clone())?),
        Commands::Catalog => {
            let json = svc.catalog()
                          .to_json_pretty()
                          .map_err(|e| CliError::Usage(format!("serialización: {e}")))?;
            println!("{json}");
            Ok(())
        }
    }
}

fn execute(cli: &Cli) -> Result<(), CliError> {
    qc_persistence::init_dotenv();
    let cfg = AppConfig::from_env().map_err(|e| CliError::Usage(e.to_string()))?;
    let catalog = cfg.load_catalog().map_err(|e| CliError::Usage(e.to_string()))?;
    let scope = match &cli.command {
        Commands::Report { scope: Some(s), .. } => *s,
        _ => cfg.dashboard_scope,
    };

    if cli.memory || std::env::var("DATABASE_URL").is_err() {
        if matches!(cli.command, Commands::Edit { .. } | Commands::Delete { .. } | Commands::List { .. }) {
            warn!("almacén en memoria: no hay registros previos");
        }
        let svc = SubmissionService::new(InMemoryRecordStore::new(), catalog).with_dashboard_scope(scope);
        return run(&svc, cli);
    }

    let pool = build_dev_pool_from_env().map_err(|e| CliError::Store(format!("pool: {e}")))?;
    let svc = SubmissionService::new(PgRecordStore::new(PoolProvider { pool }), catalog).with_dashboard_scope(scope);
    run(&svc, cli)
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env())
                             .with_writer(std::io::stderr)
                             .init();
    let cli = Cli::parse();
    if let Err(e) = execute(&cli) {
        eprintln!("[qc] {}", e.message());
        std::process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use qc_core::StoreError;
    use qc_domain::DomainError;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_report_with_filters() {
        let cli = Cli::try_parse_from(["qc", "report", "--product", "LAV", "--from", "2024-03-01", "--scope", "all"])
            .unwrap();
        match cli.command {
            Commands::Report { filter, scope } => {
                assert_eq!(filter.product.as_deref(), Some("LAV"));
                assert_eq!(filter.from, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert_eq!(scope, Some(StatusScope::Submission));
            }
            other => panic!("comando inesperado {other:?}"),
        }
    }

    #[test]
    fn bad_uuid_is_a_usage_error() {
        assert!(Cli::try_parse_from(["qc", "delete", "no-es-uuid"]).is_err());
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let rejected: CliError = SubmissionError::from(DomainError::validation("ph", "requerido")).into();
        assert_eq!(rejected.exit_code(), 4);
        let missing: CliError = SubmissionError::NotFound(Uuid::nil()).into();
        assert_eq!(missing.exit_code(), 4);
        let store: CliError = SubmissionError::Store { lot_id: None,
                                                       source: StoreError::Unavailable("x".into()) }.into();
        assert_eq!(store.exit_code(), 5);
        let lot: CliError = SubmissionError::from(LotAssignmentError::from(StoreError::Backend("x".into()))).into();
        assert_eq!(lot.exit_code(), 5);
    }
}
