//! Manifest parsing
//!
//! Parses the export manifest (TOML) listing the meshes of one scene, the
//! skeletons they may bind to, and the export options shared by every mesh.

use anyhow::{Context, Result};
use meshweld_geometry::{ExportConfig, MAX_BONE_INFLUENCERS, Precision, ShapeKeyOptions};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub skinning: SkinningConfig,
    #[serde(default)]
    pub shape_keys: ShapeKeyOptions,
    #[serde(default)]
    pub skeletons: Vec<SkeletonEntry>,
    #[serde(default)]
    pub meshes: Vec<MeshEntry>,

    /// Directory relative paths are resolved against; set by [`load_manifest`]
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_file")]
    pub file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
        }
    }
}

fn default_output_file() -> PathBuf {
    PathBuf::from("scene.json")
}

#[derive(Debug, Deserialize)]
pub struct SkinningConfig {
    /// Influencer cap per vertex; values outside 1-8 export with 8
    #[serde(default = "default_max_influencers")]
    pub max_influencers: i64,
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            max_influencers: default_max_influencers(),
        }
    }
}

fn default_max_influencers() -> i64 {
    i64::from(MAX_BONE_INFLUENCERS)
}

/// Skeleton a mesh can bind to by name
#[derive(Debug, Clone, Deserialize)]
pub struct SkeletonEntry {
    pub name: String,
    pub id: u32,
}

/// One mesh dump to export
#[derive(Debug, Clone, Deserialize)]
pub struct MeshEntry {
    pub id: String,
    pub path: PathBuf,
}

/// Skeleton name -> skeleton id
pub type SkeletonTable = HashMap<String, u32>;

impl Manifest {
    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse manifest")
    }

    /// Resolve a manifest-relative path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Output file, relative to the manifest directory
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output.file)
    }

    /// Options handed to the assembler for every mesh
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            precision: self.precision,
            max_influencers: self.skinning.max_influencers,
            shape_keys: self.shape_keys.clone(),
        }
    }

    pub fn skeleton_table(&self) -> SkeletonTable {
        self.skeletons
            .iter()
            .map(|s| (s.name.clone(), s.id))
            .collect()
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let mut manifest =
        Manifest::parse(&content).with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(manifest)
}

/// Reject epsilons the welder cannot compare against
///
/// Strict `< eps` comparisons never succeed for a non-positive or NaN epsilon.
pub fn validate_precision(precision: &Precision) -> Result<()> {
    let fields = [
        ("position", precision.position),
        ("normal", precision.normal),
        ("uv", precision.uv),
        ("color", precision.color),
        ("weight", precision.weight),
    ];
    for (name, value) in fields {
        if !(value.is_finite() && value > 0.0) {
            anyhow::bail!(
                "precision.{} must be a positive finite epsilon, got {}",
                name,
                value
            );
        }
    }
    Ok(())
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest) -> Result<()> {
    if manifest.meshes.is_empty() {
        anyhow::bail!("Manifest lists no meshes");
    }

    validate_precision(&manifest.precision)?;

    let mut ids = HashSet::new();
    for entry in &manifest.meshes {
        if !ids.insert(entry.id.as_str()) {
            anyhow::bail!("Duplicate mesh id '{}'", entry.id);
        }
        let path = manifest.resolve(&entry.path);
        if !path.exists() {
            anyhow::bail!("Mesh '{}' source not found: {:?}", entry.id, path);
        }
    }

    let mut names = HashSet::new();
    let mut skeleton_ids = HashSet::new();
    for skeleton in &manifest.skeletons {
        if !names.insert(skeleton.name.as_str()) {
            anyhow::bail!("Duplicate skeleton name '{}'", skeleton.name);
        }
        if !skeleton_ids.insert(skeleton.id) {
            anyhow::bail!(
                "Skeleton '{}' reuses skeleton id {}",
                skeleton.name,
                skeleton.id
            );
        }
    }

    // Out-of-range caps still export (clamped to 8), but are worth flagging early
    let max = manifest.skinning.max_influencers;
    if !(1..=i64::from(MAX_BONE_INFLUENCERS)).contains(&max) {
        tracing::warn!(
            "skinning.max_influencers = {} is outside 1-{}, meshes will use {}",
            max,
            MAX_BONE_INFLUENCERS,
            MAX_BONE_INFLUENCERS
        );
    }

    Ok(())
}
