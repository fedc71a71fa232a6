use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::convert::{BONE_LENGTH_EPSILON, ConvertOptions, MIN_BONE_LENGTH};

/// Persisted conversion settings used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversionSettings {
    /// Content roots searched, in order, for asset record files.
    pub content_directories: Vec<PathBuf>,
    pub figure_url: String,
    pub geometry_url: String,
    pub uv_set_url: Option<String>,
    pub skin_binding_url: Option<String>,
    pub min_bone_length: f32,
    pub bone_length_epsilon: f32,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            content_directories: Vec::new(),
            figure_url: String::new(),
            geometry_url: String::new(),
            uv_set_url: None,
            skin_binding_url: None,
            min_bone_length: MIN_BONE_LENGTH,
            bone_length_epsilon: BONE_LENGTH_EPSILON,
        }
    }
}

impl ConversionSettings {
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            min_bone_length: self.min_bone_length,
            bone_length_epsilon: self.bone_length_epsilon,
        }
    }
}

/// Save conversion settings to a JSON file.
pub fn save_settings(path: &Path, settings: &ConversionSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)
        .context("failed to serialize conversion settings as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to save conversion settings: {}", path.display()))?;
    Ok(())
}

/// Load conversion settings from a JSON file.
pub fn load_settings(path: &Path) -> Result<ConversionSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to load conversion settings: {}", path.display()))?;
    let settings: ConversionSettings =
        serde_json::from_str(&content).context("failed to parse conversion settings JSON")?;
    settings
        .options()
        .validate()
        .with_context(|| format!("invalid bone limits in {}", path.display()))?;
    Ok(settings)
}
