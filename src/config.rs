use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub kyc: KycConfig,
    #[serde(default)]
    pub webmap: WebmapConfig,
}

/// Know Your City settlement download settings.
#[derive(Debug, Deserialize, Clone)]
pub struct KycConfig {
    #[serde(default = "default_filter_endpoint")]
    pub filter_endpoint: String,
    /// Page URL template with `{form_id}` and `{ona_id}` placeholders.
    #[serde(default = "default_settlement_url")]
    pub settlement_url: String,
    #[serde(default = "default_country")]
    pub country: String,
    /// Output base path, without extension.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Pause after every fetched settlement page.
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for KycConfig {
    fn default() -> Self {
        Self {
            filter_endpoint: default_filter_endpoint(),
            settlement_url: default_settlement_url(),
            country: default_country(),
            output: default_output(),
            sleep_secs: default_sleep_secs(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_filter_endpoint() -> String {
    "https://sdinet.org/wp-content/themes/sdinet-2022/ajax/get-filter.php".to_string()
}
fn default_settlement_url() -> String {
    "https://sdinet.org/settlement/{form_id}/{ona_id}".to_string()
}
fn default_country() -> String {
    "Nigeria".to_string()
}
fn default_output() -> PathBuf {
    PathBuf::from("kyc_cln_data_Nigeria_latest")
}
fn default_sleep_secs() -> f64 {
    0.2
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    "kyc-downloader/0.1".to_string()
}

/// ArcGIS web-map export settings.
#[derive(Debug, Deserialize, Clone)]
pub struct WebmapConfig {
    #[serde(default = "default_webmap_input")]
    pub input: PathBuf,
    #[serde(default = "default_webmap_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_source_app_id")]
    pub source_app_id: String,
    /// Prepended to each layer slug to form the GeoJSON file name.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for WebmapConfig {
    fn default() -> Self {
        Self {
            input: default_webmap_input(),
            output_dir: default_webmap_output_dir(),
            source_app_id: default_source_app_id(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_webmap_input() -> PathBuf {
    PathBuf::from("data/atlas_of_informality_webmap.json")
}
fn default_webmap_output_dir() -> PathBuf {
    PathBuf::from("data/atlas_of_informality")
}
fn default_source_app_id() -> String {
    "110e3d637cce4fe7bc41c4e5cd3f9d21".to_string()
}
fn default_file_prefix() -> String {
    "atlas_of_informality_".to_string()
}

impl KycConfig {
    /// Page URL for one settlement entry.
    pub fn settlement_url_for(&self, form_id: &str, ona_id: &str) -> String {
        self.settlement_url
            .replace("{form_id}", form_id)
            .replace("{ona_id}", ona_id)
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.kyc.sleep_secs.is_finite() || self.kyc.sleep_secs < 0.0 {
            anyhow::bail!("kyc.sleep_secs must be a non-negative number");
        }
        if self.kyc.timeout_secs == 0 {
            anyhow::bail!("kyc.timeout_secs must be > 0");
        }
        for placeholder in ["{form_id}", "{ona_id}"] {
            if !self.kyc.settlement_url.contains(placeholder) {
                anyhow::bail!("kyc.settlement_url must contain {}", placeholder);
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}
