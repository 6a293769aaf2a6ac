//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y expone `AppConfig`.
//! La configuración de base de datos vive en `qc_persistence::config`.
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use qc_core::StatusScope;
use qc_domain::StandardsCatalog;
use std::env;
use std::path::PathBuf;

use crate::errors::ConfigError;

pub const CATALOG_PATH_VAR: &str = "QC_CATALOG_PATH";
pub const DASHBOARD_SCOPE_VAR: &str = "QC_DASHBOARD_SCOPE";

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Configuración de la aplicación.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// Catálogo JSON; `None` usa el catálogo integrado.
    pub catalog_path: Option<PathBuf>,
    /// Alcance del estatus en tableros (por defecto sólo sólidos).
    pub dashboard_scope: StatusScope,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_vars(env::var(CATALOG_PATH_VAR).ok(), env::var(DASHBOARD_SCOPE_VAR).ok())
    }

    /// Construye la configuración a partir de valores crudos.
    pub fn from_vars(catalog_path: Option<String>, dashboard_scope: Option<String>) -> Result<Self, ConfigError> {
        let catalog_path = catalog_path.map(|p| p.trim().to_string())
                                       .filter(|p| !p.is_empty())
                                       .map(PathBuf::from);
        let dashboard_scope = match dashboard_scope.as_deref().map(str::trim) {
            None | Some("") => StatusScope::Dashboard,
            Some(raw) => raw.parse()
                            .map_err(|reason| ConfigError::InvalidVar { var: DASHBOARD_SCOPE_VAR,
                                                                        reason })?,
        };
        Ok(Self { catalog_path,
                  dashboard_scope })
    }

    /// Carga y valida el catálogo configurado.
    pub fn load_catalog(&self) -> Result<StandardsCatalog, ConfigError> {
        let catalog = match &self.catalog_path {
            Some(path) => {
                log::debug!("catálogo desde {}", path.display());
                StandardsCatalog::from_json_file(path)?
            }
            None => StandardsCatalog::builtin(),
        };
        catalog.validate()?;
        Ok(catalog)
    }
}

/// Forzar carga temprana de .env.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_builtin_catalog_and_solids_scope() {
        let cfg = AppConfig::from_vars(None, None).unwrap();
        assert_eq!(cfg.catalog_path, None);
        assert_eq!(cfg.dashboard_scope, StatusScope::Dashboard);
        assert!(cfg.load_catalog().unwrap().product("LAV").is_some());
        assert_eq!(AppConfig::default(), cfg);
    }

    #[test]
    fn scope_and_path_are_parsed() {
        let cfg = AppConfig::from_vars(Some(" /tmp/cat.json ".into()), Some("all".into())).unwrap();
        assert_eq!(cfg.catalog_path, Some(PathBuf::from("/tmp/cat.json")));
        assert_eq!(cfg.dashboard_scope, StatusScope::Submission);
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let err = AppConfig::from_vars(None, Some("ph".into())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { var: DASHBOARD_SCOPE_VAR, .. }));
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let cfg = AppConfig::from_vars(Some("/nonexistent/qc-catalog.json".into()), None).unwrap();
        assert!(matches!(cfg.load_catalog(), Err(ConfigError::Catalog(_))));
    }
}
