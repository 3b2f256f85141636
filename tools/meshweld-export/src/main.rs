//! meshweld-export - mesh export tool
//!
//! Welds host mesh dumps (.json) into indexed, per-material geometry and
//! writes engine scene records.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use meshweld_export::{batch, manifest, record::MeshRecord, source, SkeletonTable};
use meshweld_geometry::{assemble, ExportConfig, ShapeKeyOptions, MAX_BONE_INFLUENCERS};

#[derive(Parser)]
#[command(name = "meshweld-export")]
#[command(about = "Mesh welding and export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every mesh of a manifest into one scene file
    Build {
        /// Path to the scene manifest
        #[arg(default_value = "meshweld.toml")]
        manifest: PathBuf,

        /// Output scene file (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to the scene manifest
        #[arg(default_value = "meshweld.toml")]
        manifest: PathBuf,
    },

    /// Export a single mesh dump
    Mesh {
        /// Input mesh dump (.json)
        input: PathBuf,

        /// Output mesh record (.mesh.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Influencer cap per vertex (1-8), overrides the dump's own cap
        #[arg(long, allow_negative_numbers = true)]
        max_influencers: Option<i64>,

        /// Skeleton id given to the mesh's armature
        #[arg(long, default_value_t = 0)]
        skeleton_id: u32,

        /// Split shape keys into GROUP-STATE groups
        #[arg(long)]
        shape_key_groups: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building scene from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            let report = batch::build_all(&config, output.as_deref())?;
            if report.failed.is_empty() {
                tracing::info!("Build complete!");
            } else {
                tracing::warn!(
                    "Build complete, {} of {} meshes skipped",
                    report.failed.len(),
                    report.failed.len() + report.exported.len()
                );
            }
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }

        Commands::Mesh {
            input,
            output,
            max_influencers,
            skeleton_id,
            shape_key_groups,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("mesh.json"));
            tracing::info!("Converting {:?} -> {:?}", input, output);

            let source = source::load_source(&input)?;
            let skeletons: SkeletonTable = source
                .skeleton
                .iter()
                .map(|name| (name.clone(), skeleton_id))
                .collect();
            let prepared = source.prepare(&skeletons)?;

            let config = ExportConfig {
                max_influencers: max_influencers
                    .or(prepared.max_influencers)
                    .unwrap_or(i64::from(MAX_BONE_INFLUENCERS)),
                shape_keys: ShapeKeyOptions {
                    groups: shape_key_groups,
                    default_group: None,
                },
                ..Default::default()
            };
            let geometry = assemble(&prepared.input, &config)?;
            let id = source.name.clone();
            batch::write_json(&output, &MeshRecord::new(&id, &geometry, prepared.material_id))?;
            tracing::info!("Done!");
        }
    }

    Ok(())
}
