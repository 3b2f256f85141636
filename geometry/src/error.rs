//! Errors and diagnostics raised while assembling a mesh

/// Fatal problems with one mesh's input
///
/// Each variant names the mesh so a batch driver can report it and move on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Mesh '{mesh}': triangle {triangle} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    VertexOutOfRange {
        mesh: String,
        triangle: usize,
        vertex: u32,
        vertex_count: usize,
    },

    #[error("Mesh '{mesh}': {attribute} is present on {present} of {total} corners; it must be on all or none")]
    PartialAttribute {
        mesh: String,
        attribute: &'static str,
        present: usize,
        total: usize,
    },

    #[error("Mesh '{mesh}': {what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        mesh: String,
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Mesh '{mesh}': bone index {bone} at vertex {vertex} exceeds maximum {max} for u8 packing")]
    BoneIndexOutOfRange {
        mesh: String,
        vertex: usize,
        bone: u32,
        max: u32,
    },
}

/// Recoverable conditions; export continues with a fallback
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Warning {
    #[error("Maximum # of influencers {requested} invalid, set to 8")]
    InvalidMaxInfluencers { requested: i64 },

    #[error("Maximum # of influencers exceeded for {vertices} vertices, extras ignored")]
    InfluencersTruncated { vertices: usize },

    #[error("Basis key missing, shape-key processing NOT performed")]
    MissingBasis,

    #[error("{count} triangles use a material index outside 0..{material_count}, not exported")]
    TrianglesOutsideMaterials { count: usize, material_count: u32 },

    #[error("# of 0 area faces found: {count}")]
    ZeroAreaFaces { count: usize },

    #[error("No materials have been assigned")]
    NoMaterials,

    #[error("No skeleton with name '{name}' found, skeleton ignored")]
    SkeletonNotFound { name: String },
}

/// Everything worth reporting about one assembled mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub warnings: Vec<Warning>,
    pub zero_area_faces: usize,
    pub skipped_triangles: usize,
}

impl Diagnostics {
    /// Record and log a warning
    pub fn warn(&mut self, mesh: &str, warning: Warning) {
        tracing::warn!(mesh, "{}", warning);
        self.warnings.push(warning);
    }

    /// Append everything `other` recorded, keeping warning order
    pub fn merge(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
        self.zero_area_faces += other.zero_area_faces;
        self.skipped_triangles += other.skipped_triangles;
    }

    pub fn has_warning(&self, f: impl Fn(&Warning) -> bool) -> bool {
        self.warnings.iter().any(f)
    }
}
