//! Mesh geometry export core
//!
//! Turns per-corner host mesh data into deduplicated, indexed vertex buffers
//! split into per-material submeshes, with optional packed skinning data and
//! shape-key deltas. Used by `meshweld-export`, which owns all file I/O.
//!
//! # Modules
//!
//! - [`compare`] - Tolerance comparison of attribute values
//! - [`weld`] - Vertex welding and re-indexing
//! - [`influence`] - Bone influence truncation and index packing
//! - [`shape_key`] - Shape-key delta extraction and grouping
//! - [`assemble`] - Per-mesh pipeline producing [`Geometry`]

pub mod assemble;
pub mod compare;
pub mod config;
pub mod error;
pub mod influence;
pub mod shape_key;
pub mod types;
pub mod weld;

pub use assemble::{Geometry, assemble, count_zero_area_faces, validate};
pub use config::{ExportConfig, MAX_BONE_INFLUENCERS, Precision, ShapeKeyOptions};
pub use error::{Diagnostics, GeometryError, Warning};
pub use influence::{InfluenceStats, SkinBuffers, pack_bone_indices, unpack_bone_indices};
pub use shape_key::{GroupState, ShapeKey, ShapeKeyDelta, ShapeKeyGroup, ShapeKeys};
pub use types::{
    BASIS_KEY_NAME, Corner, Influence, Influences, MeshInput, ShapeKeyBlock, SkinInput, SubMesh,
    Triangle, VertexLayout,
};
pub use weld::{KeyOrderEntry, VertexIndexMap, WeldOutput, WeldedBuffers, weld};
