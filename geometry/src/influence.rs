//! Bone influence packing
//!
//! Converts variable-length (bone, weight) lists into the fixed-width layout
//! the engine expects:
//! - 4 weight/index slots per vertex, always
//! - 4 more "extra" slots per vertex when more than 4 influencers are exported
//! - bone indices packed as u8 × 4 into one u32 per slot group

use crate::compare::same_scalar;
use crate::config::MAX_BONE_INFLUENCERS;
use crate::error::{Diagnostics, Warning};
use crate::types::{Influence, Influences};

/// Slots in one packed group (base or extra)
pub const SLOTS_PER_GROUP: usize = 4;

/// Largest bone index that fits a packed u8 slot
pub const MAX_PACKED_BONE_INDEX: u32 = u8::MAX as u32;

/// Compare two influence lists: weights within `eps`, bone indices exactly
pub fn same_influences(a: &[Influence], b: &[Influence], eps: f32) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.bone == y.bone && same_scalar(x.weight, y.weight, eps))
}

/// Sort influences by descending weight, keeping tied entries in their original order
pub fn sort_by_descending_weight(influences: &mut [Influence]) {
    influences.sort_by(|a, b| b.weight.total_cmp(&a.weight));
}

/// Pack groups of 4 bone indices into u32 words, lowest slot in the lowest byte
///
/// A trailing partial group is zero-padded. Indices are assumed to be ≤ 255.
pub fn pack_bone_indices(indices: &[u32]) -> Vec<u32> {
    indices
        .chunks(SLOTS_PER_GROUP)
        .map(|group| {
            group.iter().enumerate().fold(0u32, |word, (slot, &index)| {
                debug_assert!(index <= MAX_PACKED_BONE_INDEX);
                word | (index << (8 * slot))
            })
        })
        .collect()
}

/// Recover the 4 bone indices stored in a packed word
#[inline]
pub fn unpack_bone_indices(word: u32) -> [u32; 4] {
    [
        word & 0xFF,
        (word >> 8) & 0xFF,
        (word >> 16) & 0xFF,
        (word >> 24) & 0xFF,
    ]
}

/// Clamp a configured influencer cap into 1..=8
///
/// Out-of-range values, including ones that do not fit a byte, fall back to
/// 8 and produce a warning.
pub fn clamp_max_influencers(requested: i64) -> (u8, Option<Warning>) {
    if (1..=i64::from(MAX_BONE_INFLUENCERS)).contains(&requested) {
        (requested as u8, None)
    } else {
        (
            MAX_BONE_INFLUENCERS,
            Some(Warning::InvalidMaxInfluencers { requested }),
        )
    }
}

/// Influence statistics gathered over the welded vertices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfluenceStats {
    /// Sum of influence counts over all vertices
    pub total: usize,
    /// Vertices per influence count; bucket 0 holds counts above 8
    pub counts: [usize; 9],
    pub highest_observed: usize,
    /// Vertices that lost influences to the cap
    pub truncated: usize,
}

impl InfluenceStats {
    pub fn gather(per_vertex: &[Influences]) -> Self {
        let mut stats = Self::default();
        for influences in per_vertex {
            let n = influences.len();
            stats.total += n;
            let bucket = if n <= MAX_BONE_INFLUENCERS as usize { n } else { 0 };
            stats.counts[bucket] += 1;
            stats.highest_observed = stats.highest_observed.max(n);
        }
        stats
    }

    /// Vertices carrying exactly the highest observed influence count
    pub fn vertices_at_highest(&self) -> usize {
        if self.highest_observed <= MAX_BONE_INFLUENCERS as usize {
            self.counts[self.highest_observed]
        } else {
            self.counts[0]
        }
    }
}

/// Fixed-width skin buffers for the welded vertex set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinBuffers {
    pub num_bone_influencers: u8,
    /// 4 weights per vertex
    pub weights: Vec<f32>,
    /// One packed word (4 bone indices) per vertex
    pub indices: Vec<u32>,
    /// Slots 4..8, present when `num_bone_influencers > 4`
    pub weights_extra: Option<Vec<f32>>,
    pub indices_extra: Option<Vec<u32>>,
    pub stats: InfluenceStats,
}

/// Unpacked slot streams, before index packing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedInfluences {
    pub num_bone_influencers: u8,
    pub weights: Vec<f32>,
    pub indices: Vec<u32>,
    pub weights_extra: Option<Vec<f32>>,
    pub indices_extra: Option<Vec<u32>>,
    pub truncated: usize,
}

/// Spread each vertex's influences over fixed 4 (or 8) slots
///
/// `max_influencers` must already be clamped. The exported count is the
/// smaller of the cap and the highest count seen on any vertex. Vertices over
/// the limit keep their heaviest influences.
pub fn to_fixed_influencers(
    per_vertex: &[Influences],
    max_influencers: u8,
    highest_observed: usize,
) -> FixedInfluences {
    let num = (max_influencers as usize).min(highest_observed);
    let need_extras = num > SLOTS_PER_GROUP;

    let mut fixed = FixedInfluences {
        num_bone_influencers: num as u8,
        weights: Vec::with_capacity(per_vertex.len() * SLOTS_PER_GROUP),
        indices: Vec::with_capacity(per_vertex.len() * SLOTS_PER_GROUP),
        weights_extra: need_extras.then(Vec::new),
        indices_extra: need_extras.then(Vec::new),
        truncated: 0,
    };

    for influences in per_vertex {
        let mut sorted: Influences;
        let kept: &[Influence] = if influences.len() > num {
            fixed.truncated += 1;
            sorted = influences.clone();
            sort_by_descending_weight(&mut sorted);
            &sorted[..num]
        } else {
            influences
        };

        let slot = |j: usize| kept.get(j).copied().unwrap_or(Influence::new(0, 0.0));

        for j in 0..SLOTS_PER_GROUP {
            let inf = slot(j);
            fixed.weights.push(inf.weight);
            fixed.indices.push(inf.bone);
        }

        if let (Some(weights), Some(indices)) = (&mut fixed.weights_extra, &mut fixed.indices_extra)
        {
            for j in SLOTS_PER_GROUP..2 * SLOTS_PER_GROUP {
                let inf = slot(j);
                weights.push(inf.weight);
                indices.push(inf.bone);
            }
        }
    }

    fixed
}

/// Build the packed skin buffers for a welded vertex set
///
/// Invalid caps and truncations are recorded in `diagnostics`.
pub fn pack_skin(
    mesh: &str,
    per_vertex: &[Influences],
    requested_max: i64,
    diagnostics: &mut Diagnostics,
) -> SkinBuffers {
    let (max_influencers, warning) = clamp_max_influencers(requested_max);
    if let Some(warning) = warning {
        diagnostics.warn(mesh, warning);
    }

    let mut stats = InfluenceStats::gather(per_vertex);
    let fixed = to_fixed_influencers(per_vertex, max_influencers, stats.highest_observed);
    stats.truncated = fixed.truncated;

    if fixed.truncated > 0 {
        diagnostics.warn(
            mesh,
            Warning::InfluencersTruncated {
                vertices: fixed.truncated,
            },
        );
    }

    let average = if per_vertex.is_empty() {
        0.0
    } else {
        stats.total as f32 / per_vertex.len() as f32
    };
    tracing::debug!(
        mesh,
        total = stats.total,
        average,
        highest = stats.highest_observed,
        at_highest = stats.vertices_at_highest(),
        "Skeleton stats"
    );
    tracing::info!(
        "Mesh '{}': exported as {} influencers",
        mesh,
        fixed.num_bone_influencers
    );

    SkinBuffers {
        num_bone_influencers: fixed.num_bone_influencers,
        weights: fixed.weights,
        indices: pack_bone_indices(&fixed.indices),
        weights_extra: fixed.weights_extra,
        indices_extra: fixed.indices_extra.as_deref().map(pack_bone_indices),
        stats,
    }
}
