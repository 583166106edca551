use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Classifier settings remembered between `view` runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub input_path: String,
    pub method: String,
    #[serde(default)]
    pub classes: Option<usize>,
    pub palette: String,
    #[serde(default)]
    pub legend_style: Option<String>,
}

impl Session {
    pub fn cache_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aal-lens")
            .join("session.json")
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::cache_path();
        if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)?; }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
    pub fn load() -> Option<Self> {
        let path = Self::cache_path();
        serde_json::from_str(&std::fs::read_to_string(&path).ok()?).ok()
    }
}
