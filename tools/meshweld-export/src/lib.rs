//! meshweld-export library
//!
//! Reads host mesh dumps, runs them through `meshweld-geometry` and writes
//! engine scene records. Used by the `meshweld-export` binary.

pub mod batch;
pub mod manifest;
pub mod record;
pub mod source;

pub use batch::{BatchReport, build_all, export_mesh};
pub use manifest::{Manifest, SkeletonTable, load_manifest, validate};
pub use record::{MeshRecord, SceneRecord};
pub use source::{SourceMesh, load_source};

// Re-export the geometry core for callers that only depend on the tool
pub use meshweld_geometry::{ExportConfig, Geometry, GeometryError, Precision, ShapeKeyOptions};
