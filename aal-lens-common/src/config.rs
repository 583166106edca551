use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    "dark".into()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub classes: Option<usize>, // None picks 5 or 6 from the observation count
    #[serde(default = "default_palette")]
    pub palette: String,
    #[serde(default)]
    pub custom_palette: Option<Vec<String>>,
    #[serde(default = "default_no_data_color")]
    pub no_data_color: String,
    #[serde(default = "default_legend_style")]
    pub legend_style: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub currency_prefix: Option<String>,
}

fn default_method() -> String {
    "jenks".into()
}
fn default_palette() -> String {
    "aal".into()
}
fn default_no_data_color() -> String {
    "#cccccc".into()
}
fn default_legend_style() -> String {
    "open".into()
}
fn default_locale() -> String {
    "id".into()
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            classes: None,
            palette: default_palette(),
            custom_palette: None,
            no_data_color: default_no_data_color(),
            legend_style: default_legend_style(),
            locale: default_locale(),
            currency_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: Option<u64>, // None disables the response cache
}

fn default_base_url() -> String {
    "http://localhost:5000".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_cache_ttl() -> Option<u64> {
    Some(300)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_format() -> String {
    "json".into()
}
fn default_output_dir() -> String {
    ".".into()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aal-lens")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        let path = if let Ok(env_path) = std::env::var("AAL_LENS_CONFIG") {
            PathBuf::from(env_path) // $AAL_LENS_CONFIG overrides default config path
        } else {
            Self::config_path()
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::AalLensError::Other(e.to_string()))
    }

    pub fn save(&self) -> crate::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::AalLensError::Other(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests_config {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.classify.method, "jenks");
        assert_eq!(cfg.api.base_url, "http://localhost:5000");
        assert_eq!(cfg.api.cache_ttl_secs, Some(300));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[classify]\nclasses = 4\npalette = \"hazard\"\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.classify.classes, Some(4));
        assert_eq!(cfg.classify.palette, "hazard");
        assert_eq!(cfg.classify.no_data_color, "#cccccc");
        assert_eq!(cfg.display.theme, "dark");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[classify\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
