//! Asset record supplier backed by pre-parsed record files.
//!
//! Record files are JSON documents holding the libraries of one asset file
//! (nodes, geometries, UV sets, skin bindings). They are located by resolving
//! an asset URL's file path against an explicit list of content directories.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use log::debug;
use serde::Deserialize;

use crate::asset_url::AssetUrl;
use crate::convert::{AssetNode, GeometryRecord, SkinBinding, UvSet};
use crate::error::{ConvertError, ConvertResult};

/// Lookup seam between the pipeline and whatever supplies asset records.
pub trait RecordSource {
    fn node(&self, url: &str) -> ConvertResult<&AssetNode>;
    /// Nodes declared alongside the figure, in library order. Callers reject
    /// anything that is not a bone.
    fn hierarchy(&self, figure_url: &str) -> ConvertResult<Vec<AssetNode>>;
    fn geometry(&self, url: &str) -> ConvertResult<&GeometryRecord>;
    fn uv_set(&self, url: &str) -> ConvertResult<&UvSet>;
    fn skin_binding(&self, url: &str) -> ConvertResult<&SkinBinding>;
}

/// The record libraries of a single asset file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetFile {
    #[serde(default)]
    pub node_library: Vec<AssetNode>,
    #[serde(default)]
    pub geometry_library: Vec<GeometryRecord>,
    #[serde(default)]
    pub uv_set_library: Vec<UvSet>,
    #[serde(default)]
    pub modifier_library: Vec<SkinBinding>,
}

#[derive(Debug, Default)]
pub struct AssetLibrary {
    content_directories: Vec<PathBuf>,
    files: HashMap<String, AssetFile>,
}

impl AssetLibrary {
    pub fn new(content_directories: Vec<PathBuf>) -> Self {
        Self {
            content_directories,
            files: HashMap::new(),
        }
    }

    /// Register an already-parsed asset file under its content-relative path.
    pub fn insert_file(&mut self, file_path: impl Into<String>, file: AssetFile) {
        self.files.insert(file_path.into(), file);
    }

    /// Load the record file referenced by `url` unless it is already present.
    pub fn load(&mut self, url: &str) -> Result<()> {
        let parsed = AssetUrl::parse(url)?;
        let Some(file_path) = parsed.file_path else {
            bail!("asset url has no file path: {url}");
        };
        if self.files.contains_key(&file_path) {
            return Ok(());
        }

        let resolved = self.resolve(&file_path)?;
        let content = fs::read_to_string(&resolved)
            .with_context(|| format!("failed to read asset records: {}", resolved.display()))?;
        let file: AssetFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse asset records: {}", resolved.display()))?;

        debug!(
            "loaded '{}' from {} ({} nodes)",
            file_path,
            resolved.display(),
            file.node_library.len()
        );
        self.files.insert(file_path, file);
        Ok(())
    }

    /// Find the first content directory holding `file_path`.
    pub fn resolve(&self, file_path: &str) -> Result<PathBuf> {
        let relative = Path::new(file_path.trim_start_matches('/'));
        self.content_directories
            .iter()
            .map(|directory| directory.join(relative))
            .find(|candidate| candidate.is_file())
            .with_context(|| {
                format!(
                    "'{}' not found in {} content directories",
                    file_path,
                    self.content_directories.len()
                )
            })
    }

    fn locate(&self, url: &str) -> ConvertResult<(&AssetFile, String)> {
        let parsed = AssetUrl::parse(url)?;
        let file = parsed
            .file_path
            .as_ref()
            .and_then(|path| self.files.get(path))
            .ok_or_else(|| ConvertError::MissingRecord(url.to_string()))?;
        let id = parsed
            .asset_id
            .ok_or_else(|| ConvertError::InvalidUrl(url.to_string()))?;
        Ok((file, id))
    }
}

impl RecordSource for AssetLibrary {
    fn node(&self, url: &str) -> ConvertResult<&AssetNode> {
        let (file, id) = self.locate(url)?;
        file.node_library
            .iter()
            .find(|node| node.id == id)
            .ok_or_else(|| ConvertError::MissingRecord(url.to_string()))
    }

    fn hierarchy(&self, figure_url: &str) -> ConvertResult<Vec<AssetNode>> {
        let (file, figure_id) = self.locate(figure_url)?;
        Ok(file
            .node_library
            .iter()
            .filter(|node| node.id != figure_id)
            .cloned()
            .collect())
    }

    fn geometry(&self, url: &str) -> ConvertResult<&GeometryRecord> {
        let (file, id) = self.locate(url)?;
        file.geometry_library
            .iter()
            .find(|geometry| geometry.id == id)
            .ok_or_else(|| ConvertError::MissingRecord(url.to_string()))
    }

    fn uv_set(&self, url: &str) -> ConvertResult<&UvSet> {
        let (file, id) = self.locate(url)?;
        file.uv_set_library
            .iter()
            .find(|uv_set| uv_set.id() == id)
            .ok_or_else(|| ConvertError::MissingRecord(url.to_string()))
    }

    fn skin_binding(&self, url: &str) -> ConvertResult<&SkinBinding> {
        let (file, id) = self.locate(url)?;
        file.modifier_library
            .iter()
            .find(|binding| binding.id == id)
            .ok_or_else(|| ConvertError::MissingRecord(url.to_string()))
    }
}
