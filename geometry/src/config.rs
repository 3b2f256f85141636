//! Export configuration: comparison precision, skinning limits, shape-key grouping

use serde::Deserialize;

/// Largest number of bone influencers a vertex can carry (4 base + 4 extra slots)
pub const MAX_BONE_INFLUENCERS: u8 = 8;

/// Per-attribute comparison epsilons
///
/// Defaults correspond to 4 decimal digits for positions, 3 for normals,
/// UVs and colors, and 2 for skin weights.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Precision {
    pub position: f32,
    pub normal: f32,
    pub uv: f32,
    pub color: f32,
    pub weight: f32,
}

impl Default for Precision {
    fn default() -> Self {
        Self::from_digits(4, 3, 3, 3, 2)
    }
}

impl Precision {
    /// Build epsilons from decimal digit counts (`3` → `0.001`)
    pub fn from_digits(position: u8, normal: u8, uv: u8, color: u8, weight: u8) -> Self {
        Self {
            position: digits_to_epsilon(position),
            normal: digits_to_epsilon(normal),
            uv: digits_to_epsilon(uv),
            color: digits_to_epsilon(color),
            weight: digits_to_epsilon(weight),
        }
    }
}

#[inline]
fn digits_to_epsilon(digits: u8) -> f32 {
    10f32.powi(-(digits as i32))
}

/// Shape-key naming options
///
/// With `groups` enabled, a key named `MOUTH-OPEN` belongs to group `MOUTH`
/// with state `OPEN`. Keys without a delimiter are moved into
/// `default_group` when one is set, and skipped otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShapeKeyOptions {
    pub groups: bool,
    pub default_group: Option<String>,
}

/// Configuration bundle handed to the assembler for one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub precision: Precision,
    /// Requested influencer cap; anything outside 1..=8 is clamped to 8 with a
    /// warning when the mesh is packed
    pub max_influencers: i64,
    pub shape_keys: ShapeKeyOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
            max_influencers: i64::from(MAX_BONE_INFLUENCERS),
            shape_keys: ShapeKeyOptions::default(),
        }
    }
}
