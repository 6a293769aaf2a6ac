//! Catálogo de estándares: límites por producto, directorio de sucursales,
//! familias de producto, aplicabilidad de parámetros y opciones de apariencia.
//!
//! El catálogo es un valor explícito: se construye (integrado, desde JSON o
//! con el builder) y se pasa por parámetro al clasificador, al asignador de
//! lotes y al agregador de reportes. No existe estado global mutable.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::standard::{AppearanceStandard, BatchUnit, ParameterApplicability, PhStandard, Product, ProductFamily,
                      ProductStandard};
use crate::DomainError;

/// Representación serializable (listas) del catálogo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub branches: Vec<BranchEntry>,
    #[serde(default)]
    pub families: Vec<ProductFamily>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub solids: Vec<ProductStandard>,
    #[serde(default)]
    pub ph: Vec<PhStandard>,
    #[serde(default)]
    pub appearance: Vec<AppearanceStandard>,
    #[serde(default)]
    pub applicability: IndexMap<String, ParameterApplicability>,
    #[serde(default)]
    pub appearance_options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchEntry {
    pub name: String,
    pub acronym: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CatalogFile", into = "CatalogFile")]
pub struct StandardsCatalog {
    branches: IndexMap<String, String>,
    families: IndexMap<String, ProductFamily>,
    products: IndexMap<String, Product>,
    solids: IndexMap<String, ProductStandard>,
    ph: IndexMap<String, PhStandard>,
    appearance: IndexMap<String, AppearanceStandard>,
    applicability: IndexMap<String, ParameterApplicability>,
    appearance_options: Vec<String>,
}

static BUILTIN: Lazy<StandardsCatalog> = Lazy::new(builtin_catalog);

impl StandardsCatalog {
    /// Catálogo vacío (útil para construir catálogos sintéticos en tests).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catálogo integrado de planta.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Carga y valida un catálogo JSON.
    pub fn from_json_str(json: &str) -> Result<Self, DomainError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::try_from(file)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Catalog(format!("no se pudo leer {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String, DomainError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // Builder
    pub fn with_branch(mut self, name: impl Into<String>, acronym: impl Into<String>) -> Self {
        self.branches.insert(name.into(), acronym.into());
        self
    }

    pub fn with_family(mut self, name: impl Into<String>, unit: BatchUnit) -> Self {
        let name = name.into();
        self.families.insert(name.clone(), ProductFamily { name, unit });
        self
    }

    pub fn with_product(mut self, code: impl Into<String>, name: impl Into<String>, family: impl Into<String>) -> Self {
        let code = code.into();
        self.products.insert(code.clone(),
                             Product { code,
                                       name: name.into(),
                                       family: family.into() });
        self
    }

    pub fn with_solids(mut self, code: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        let code = code.into();
        self.solids.insert(code.clone(),
                           ProductStandard { product_code: code,
                                             solids_min: min,
                                             solids_max: max });
        self
    }

    pub fn with_ph(mut self, code: impl Into<String>, min: f64, max: f64) -> Self {
        let code = code.into();
        self.ph.insert(code.clone(),
                       PhStandard { product_code: code,
                                    ph_min: min,
                                    ph_max: max });
        self
    }

    pub fn with_appearance(mut self, code: impl Into<String>, expected: impl Into<String>) -> Self {
        let code = code.into();
        self.appearance.insert(code.clone(),
                               AppearanceStandard { product_code: code,
                                                    expected_description: expected.into() });
        self
    }

    pub fn with_applicability(mut self, code: impl Into<String>, solids: bool, ph: bool) -> Self {
        self.applicability.insert(code.into(), ParameterApplicability { solids, ph });
        self
    }

    pub fn with_appearance_option(mut self, option: impl Into<String>) -> Self {
        self.appearance_options.push(option.into());
        self
    }

    // Consultas
    pub fn branches(&self) -> impl Iterator<Item = (&str, &str)> {
        self.branches.iter().map(|(n, a)| (n.as_str(), a.as_str()))
    }

    pub fn is_known_branch(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    pub fn branch_acronym(&self, name: &str) -> Option<&str> {
        self.branches.get(name).map(String::as_str)
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn product(&self, code: &str) -> Option<&Product> {
        self.products.get(code)
    }

    /// Familia del producto (define la unidad del tamaño de lote).
    pub fn family_of(&self, code: &str) -> Option<&ProductFamily> {
        self.products.get(code).and_then(|p| self.families.get(&p.family))
    }

    pub fn solids_standard(&self, code: &str) -> Option<&ProductStandard> {
        self.solids.get(code)
    }

    pub fn ph_standard(&self, code: &str) -> Option<&PhStandard> {
        self.ph.get(code)
    }

    pub fn appearance_standard(&self, code: &str) -> Option<&AppearanceStandard> {
        self.appearance.get(code)
    }

    /// Aplicabilidad del producto; sin entrada explícita ambos parámetros son
    /// obligatorios.
    pub fn applicability(&self, code: &str) -> ParameterApplicability {
        self.applicability.get(code).copied().unwrap_or_default()
    }

    pub fn appearance_options(&self) -> &[String] {
        &self.appearance_options
    }

    /// Busca la opción enumerada de apariencia sin distinguir mayúsculas.
    pub fn appearance_option(&self, observed: &str) -> Option<&str> {
        let needle = observed.trim().to_lowercase();
        self.appearance_options
            .iter()
            .find(|o| o.to_lowercase() == needle)
            .map(String::as_str)
    }

    /// Verifica la coherencia interna del catálogo.
    ///
    /// # Errores
    /// `DomainError::Catalog` si un producto apunta a una familia inexistente,
    /// un código de producto no puede formar parte de un identificador de lote
    /// o algún rango de límites está invertido.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, acronym) in &self.branches {
            if acronym.trim().is_empty() || acronym.contains('-') {
                return Err(DomainError::Catalog(format!("acrónimo inválido para sucursal {name}: '{acronym}'")));
            }
        }
        for product in self.products.values() {
            validate_product_code(&product.code)?;
            if !self.families.contains_key(&product.family) {
                return Err(DomainError::Catalog(format!("producto {} con familia desconocida {}",
                                                        product.code, product.family)));
            }
        }
        for std in self.solids.values() {
            if let Some((min, max)) = std.solids_limits() {
                if !(min.is_finite() && max.is_finite()) || min > max {
                    return Err(DomainError::Catalog(format!("límites de sólidos inválidos para {}",
                                                            std.product_code)));
                }
            }
        }
        for std in self.ph.values() {
            if !(0.0..=14.0).contains(&std.ph_min) || !(0.0..=14.0).contains(&std.ph_max) || std.ph_min > std.ph_max {
                return Err(DomainError::Catalog(format!("límites de pH inválidos para {}", std.product_code)));
            }
        }
        Ok(())
    }
}

/// Un código de producto se concatena con el tamaño de lote dentro del
/// identificador, por lo que no puede terminar en dígito ni contener '-'.
fn validate_product_code(code: &str) -> Result<(), DomainError> {
    let ok = !code.is_empty()
             && code.chars().all(|c| c.is_ascii_alphanumeric())
             && !code.ends_with(|c: char| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(DomainError::Catalog(format!("código de producto inválido: '{code}'")))
    }
}

impl TryFrom<CatalogFile> for StandardsCatalog {
    type Error = DomainError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        let catalog = StandardsCatalog { branches: file.branches.into_iter().map(|b| (b.name, b.acronym)).collect(),
                                         families: file.families.into_iter().map(|f| (f.name.clone(), f)).collect(),
                                         products: file.products.into_iter().map(|p| (p.code.clone(), p)).collect(),
                                         solids: file.solids
                                                     .into_iter()
                                                     .map(|s| (s.product_code.clone(), s))
                                                     .collect(),
                                         ph: file.ph.into_iter().map(|s| (s.product_code.clone(), s)).collect(),
                                         appearance: file.appearance
                                                         .into_iter()
                                                         .map(|s| (s.product_code.clone(), s))
                                                         .collect(),
                                         applicability: file.applicability,
                                         appearance_options: file.appearance_options };
        catalog.validate()?;
        Ok(catalog)
    }
}

impl From<StandardsCatalog> for CatalogFile {
    fn from(c: StandardsCatalog) -> Self {
        CatalogFile { branches: c.branches
                                 .into_iter()
                                 .map(|(name, acronym)| BranchEntry { name, acronym })
                                 .collect(),
                      families: c.families.into_values().collect(),
                      products: c.products.into_values().collect(),
                      solids: c.solids.into_values().collect(),
                      ph: c.ph.into_values().collect(),
                      appearance: c.appearance.into_values().collect(),
                      applicability: c.applicability,
                      appearance_options: c.appearance_options }
    }
}

fn builtin_catalog() -> StandardsCatalog {
    StandardsCatalog::empty().with_branch("Planta Central", "PC")
                             .with_branch("Sucursal Norte", "SN")
                             .with_branch("Sucursal Sur", "SS")
                             .with_branch("Planta Occidente", "PO")
                             .with_family("DETERGENTES LIQUIDOS", BatchUnit::Volume)
                             .with_family("CUIDADO DE ROPA", BatchUnit::Volume)
                             .with_family("DESINFECCION", BatchUnit::Volume)
                             .with_family("JABONES EN BARRA", BatchUnit::Pieces)
                             .with_product("LAV", "Lavatrastes líquido", "DETERGENTES LIQUIDOS")
                             .with_product("DESENG", "Desengrasante multiusos", "DETERGENTES LIQUIDOS")
                             .with_product("SUA", "Suavizante de telas", "CUIDADO DE ROPA")
                             .with_product("DETROP", "Detergente líquido para ropa", "CUIDADO DE ROPA")
                             .with_product("CLO", "Blanqueador clorado", "DESINFECCION")
                             .with_product("GEL", "Gel antibacterial", "DESINFECCION")
                             .with_product("JAB", "Jabón de tocador", "JABONES EN BARRA")
                             .with_solids("LAV", Some(28.0), Some(32.0))
                             .with_solids("DESENG", Some(10.0), Some(14.0))
                             .with_solids("SUA", Some(4.0), Some(6.0))
                             .with_solids("DETROP", Some(18.0), Some(22.0))
                             .with_solids("GEL", Some(0.5), None)
                             .with_ph("LAV", 7.0, 8.0)
                             .with_ph("DESENG", 11.0, 13.0)
                             .with_ph("SUA", 3.0, 4.0)
                             .with_ph("DETROP", 8.0, 10.0)
                             .with_ph("CLO", 12.0, 13.0)
                             .with_ph("JAB", 9.0, 10.0)
                             .with_appearance("LAV", "LIQUIDO VISCOSO")
                             .with_appearance("DESENG", "CRISTALINO")
                             .with_appearance("SUA", "PERLADO")
                             .with_appearance("DETROP", "LIQUIDO VISCOSO")
                             .with_appearance("CLO", "CRISTALINO")
                             .with_appearance("GEL", "CRISTALINO")
                             .with_appearance("JAB", "SOLIDO HOMOGENEO")
                             .with_applicability("CLO", false, true)
                             .with_applicability("JAB", false, true)
                             .with_appearance_option("CRISTALINO")
                             .with_appearance_option("TURBIO")
                             .with_appearance_option("PERLADO")
                             .with_appearance_option("LIQUIDO VISCOSO")
                             .with_appearance_option("OPACO")
                             .with_appearance_option("CON SEDIMENTO")
                             .with_appearance_option("SOLIDO HOMOGENEO")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_consistent() {
        let c = StandardsCatalog::builtin();
        assert!(c.validate().is_ok());
        assert_eq!(c.branch_acronym("Sucursal Norte"), Some("SN"));
        assert_eq!(c.family_of("JAB").map(|f| f.unit), Some(BatchUnit::Pieces));
        // GEL tiene sólo límite inferior: no juzgable
        assert_eq!(c.solids_standard("GEL").and_then(|s| s.solids_limits()), None);
    }

    #[test]
    fn missing_applicability_defaults_to_both() {
        let c = StandardsCatalog::empty();
        let a = c.applicability("ZZZ");
        assert!(a.solids && a.ph);
    }

    #[test]
    fn product_code_ending_in_digit_is_rejected() {
        let c = StandardsCatalog::empty().with_family("F", BatchUnit::Volume)
                                         .with_product("LAV2", "x", "F");
        assert!(matches!(c.validate(), Err(DomainError::Catalog(_))));
    }

    #[test]
    fn appearance_option_lookup_ignores_case() {
        let c = StandardsCatalog::builtin();
        assert_eq!(c.appearance_option(" cristalino "), Some("CRISTALINO"));
        assert_eq!(c.appearance_option("brillante"), None);
    }
}
