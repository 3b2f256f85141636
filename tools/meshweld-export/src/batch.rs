//! Build orchestration
//!
//! Exports every mesh of a manifest in parallel and writes one scene file.
//! A mesh that fails is logged and left out; the build only fails when
//! nothing could be exported or the output cannot be written.

use anyhow::{Context, Result};
use meshweld_geometry::{Diagnostics, ExportConfig, assemble};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::manifest::{validate_precision, Manifest, SkeletonTable};
use crate::record::{MeshRecord, SceneRecord};
use crate::source::load_source;

/// Outcome of a manifest build
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Ids of exported meshes, in manifest order
    pub exported: Vec<String>,
    /// (mesh id, error) for every mesh left out
    pub failed: Vec<(String, String)>,
    /// Total warnings raised across exported meshes
    pub warnings: usize,
    pub output: PathBuf,
}

/// Export one mesh dump into a scene record
pub fn export_mesh(
    path: &Path,
    id: &str,
    config: &ExportConfig,
    skeletons: &SkeletonTable,
) -> Result<(MeshRecord, Diagnostics)> {
    let source = load_source(path)?;
    let prepared = source.prepare(skeletons)?;

    let config = match prepared.max_influencers {
        Some(max_influencers) => ExportConfig {
            max_influencers,
            ..config.clone()
        },
        None => config.clone(),
    };

    let geometry = assemble(&prepared.input, &config)?;
    tracing::info!(
        "Mesh '{}': {} vertices, {} triangles, {} submeshes",
        id,
        geometry.vertex_count(),
        geometry.triangle_count(),
        geometry.sub_meshes.len()
    );

    let record = MeshRecord::new(id, &geometry, prepared.material_id);
    let mut diagnostics = prepared.diagnostics;
    diagnostics.merge(geometry.diagnostics);
    Ok((record, diagnostics))
}

/// Serialize `value` as JSON, creating parent directories as needed
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
    }
    let json = serde_json::to_string(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write output: {:?}", path))?;
    Ok(())
}

/// Build all meshes from a manifest
pub fn build_all(manifest: &Manifest, output_override: Option<&Path>) -> Result<BatchReport> {
    let output = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest.output_path());
    validate_precision(&manifest.precision)?;
    let config = manifest.export_config();
    let skeletons = manifest.skeleton_table();

    // Indexed collect keeps manifest order
    let results: Vec<_> = manifest
        .meshes
        .par_iter()
        .map(|entry| {
            let path = manifest.resolve(&entry.path);
            tracing::info!("Converting mesh: {} <- {:?}", entry.id, path);
            let result = export_mesh(&path, &entry.id, &config, &skeletons)
                .with_context(|| format!("Failed to export mesh '{}'", entry.id));
            (entry.id.clone(), result)
        })
        .collect();

    let mut report = BatchReport {
        output,
        ..Default::default()
    };
    let mut scene = SceneRecord::default();

    for (id, result) in results {
        match result {
            Ok((record, diagnostics)) => {
                report.warnings += diagnostics.warnings.len();
                report.exported.push(id);
                scene.meshes.push(record);
            }
            Err(e) => {
                tracing::error!("{:#}", e);
                report.failed.push((id, format!("{:#}", e)));
            }
        }
    }

    if scene.meshes.is_empty() && !report.failed.is_empty() {
        anyhow::bail!("All {} meshes failed to export", report.failed.len());
    }

    write_json(&report.output, &scene)?;
    tracing::info!(
        "Wrote {} meshes to {:?} ({} failed, {} warnings)",
        report.exported.len(),
        report.output,
        report.failed.len(),
        report.warnings
    );

    Ok(report)
}
