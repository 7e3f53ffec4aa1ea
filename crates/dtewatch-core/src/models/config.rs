//! Configuration structures for the intake pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DteError, Result};

/// Main configuration for the dtewatch pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Issuer identity used to fill the Emisor block.
    pub merchant: MerchantConfig,

    /// Watched and archive directories plus the polling interval.
    pub directories: DirectoryConfig,

    /// Invoicing API endpoint and credentials.
    pub api: ApiConfig,

    /// Local PDF download settings.
    pub download: DownloadConfig,
}

/// The issuer's fixed identity, loaded once per processing session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    /// Taxpayer id, may carry grouping dots ("76.543.210-K").
    pub rut_empresa: String,

    /// Legal name.
    pub razon_social: String,

    /// Business line description.
    pub giro: String,

    /// Economic activity code.
    pub act_economica: i64,

    /// Street address.
    pub direccion: String,

    /// Commune.
    pub comuna: String,

    /// City.
    pub ciudad: String,

    /// Region.
    pub region: String,

    /// Contact phone.
    pub telefono: String,

    /// SII branch code.
    pub codsuc_sii: i64,

    /// Contact email.
    pub email: String,

    /// Terminal (point of sale) identifier.
    pub tpv: String,
}

impl MerchantConfig {
    /// Taxpayer id with grouping dots stripped, as the API expects.
    pub fn rut_normalized(&self) -> String {
        self.rut_empresa.replace('.', "")
    }
}

/// Directories and polling interval for the intake loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Directory watched for incoming files.
    pub watch_dir: PathBuf,

    /// Root of the processed archive; errors go under `error/` inside it.
    pub processed_dir: PathBuf,

    /// Seconds between intake cycles.
    pub interval_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("procesar"),
            processed_dir: PathBuf::from("procesado"),
            interval_secs: 30,
        }
    }
}

/// Invoicing API endpoint and key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Document submission endpoint.
    pub endpoint: String,

    /// Key sent in the `apikey` request header.
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.qpos.io/cl/online/api/v1/edidte/Document".to_string(),
            api_key: String::new(),
        }
    }
}

/// Local download of generated PDFs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Whether to download the PDF referenced by an accepted response.
    pub enabled: bool,

    /// Destination directory for downloaded PDFs.
    pub download_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            download_dir: PathBuf::from("descargas"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| DteError::Config(format!("{}: {e}", path.display())))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| DteError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Source of the merchant configuration, loaded once at loop start.
///
/// This is the boundary to the persisted configuration store; the intake
/// loop never re-fetches per file.
pub trait ConfigSource: Send + Sync {
    /// Load the current merchant configuration.
    fn load(&self) -> Result<MerchantConfig>;
}

/// File-backed config source reading the `merchant` section of [`AppConfig`].
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<MerchantConfig> {
        Ok(AppConfig::from_file(&self.path)?.merchant)
    }
}

/// A fixed in-memory config, convenient for one-shot runs and tests.
impl ConfigSource for MerchantConfig {
    fn load(&self) -> Result<MerchantConfig> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rut_normalization_strips_dots() {
        let merchant = MerchantConfig {
            rut_empresa: "76.543.210-K".to_string(),
            ..Default::default()
        };
        assert_eq!(merchant.rut_normalized(), "76543210-K");
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.directories.interval_secs, 30);
        assert!(config.api.endpoint.ends_with("/edidte/Document"));
        assert!(!config.download.enabled);
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.merchant.razon_social = "Comercial Prueba SpA".to_string();
        config.directories.interval_secs = 10;
        config.save(&path).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.merchant.razon_social, "Comercial Prueba SpA");
        assert_eq!(loaded.directories.interval_secs, 10);
    }
}
