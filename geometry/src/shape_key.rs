//! Shape-key delta extraction
//!
//! Deltas are computed against the `Basis` key for every welded vertex. A
//! source vertex that welded into several output vertices contributes the
//! same delta to each of them. Affected indices come out strictly ascending,
//! which morph target consumers rely on.

use glam::Vec3;
use hashbrown::HashMap;

use crate::compare::same_vector;
use crate::config::ShapeKeyOptions;
use crate::error::{Diagnostics, Warning};
use crate::types::{BASIS_KEY_NAME, ShapeKeyBlock};
use crate::weld::KeyOrderEntry;

/// Delimiter between group and state in a grouped key name
pub const GROUP_DELIMITER: char = '-';

/// Change applied to one welded vertex by a shape key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeKeyDelta {
    pub index: u32,
    pub position: [f32; 3],
    /// Present when both the basis and the target carry normals
    pub normal: Option<[f32; 3]>,
}

/// One exported shape key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeKey {
    /// Key name as given by the host
    pub name: String,
    pub group: Option<String>,
    pub state: String,
    /// Sorted by ascending `index`
    pub deltas: Vec<ShapeKeyDelta>,
}

impl ShapeKey {
    pub fn affected_indices(&self) -> Vec<u32> {
        self.deltas.iter().map(|d| d.index).collect()
    }
}

/// A state of a group, realigned onto the group's affected indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupState {
    pub name: String,
    /// One delta per group affected index; zero where the state leaves the vertex alone
    pub position_deltas: Vec<[f32; 3]>,
}

/// Keys sharing a group prefix, merged over the union of their affected vertices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeKeyGroup {
    pub name: String,
    pub affected_indices: Vec<u32>,
    /// Basis position of each affected vertex
    pub basis_positions: Vec<[f32; 3]>,
    pub states: Vec<GroupState>,
}

/// All shape-key output for one mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeKeys {
    pub keys: Vec<ShapeKey>,
    /// Only filled when grouping is enabled
    pub groups: Vec<ShapeKeyGroup>,
}

/// Order key-order entries by welded index
pub fn sort_key_order(order: &mut [KeyOrderEntry]) {
    order.sort_by_key(|e| e.welded);
}

/// Work out a key's (group, state) pair
///
/// Returns `None` when the key must be skipped: grouping is on, the name has
/// no group prefix, and no default group is configured.
pub fn split_key_name(name: &str, options: &ShapeKeyOptions) -> Option<(Option<String>, String)> {
    if !options.groups {
        return Some((None, name.to_string()));
    }

    let qualified = match name.find(GROUP_DELIMITER) {
        Some(pos) if pos > 0 => name.to_string(),
        _ => match &options.default_group {
            Some(group) => format!("{}{}{}", group, GROUP_DELIMITER, name),
            None => return None,
        },
    };

    let upper = qualified.to_uppercase();
    let (group, state) = upper.split_once(GROUP_DELIMITER).unwrap_or((upper.as_str(), ""));
    Some((Some(group.to_string()), state.to_string()))
}

/// Deltas of `target` against `basis` for every welded vertex in `order`
///
/// `order` must be sorted by welded index. Vertices whose position moves by
/// less than `position_eps` on every axis are left out.
pub fn extract_deltas(
    basis: &ShapeKeyBlock,
    target: &ShapeKeyBlock,
    order: &[KeyOrderEntry],
    position_eps: f32,
) -> Vec<ShapeKeyDelta> {
    let normals = basis.normals.as_deref().zip(target.normals.as_deref());

    order
        .iter()
        .filter_map(|entry| {
            let v = entry.vertex as usize;
            let delta =
                Vec3::from_array(target.positions[v]) - Vec3::from_array(basis.positions[v]);
            let delta = delta.to_array();

            if same_vector(&delta, &[0.0; 3], position_eps) {
                return None;
            }

            let normal = normals.map(|(basis_n, target_n)| {
                (Vec3::from_array(target_n[v]) - Vec3::from_array(basis_n[v])).to_array()
            });

            Some(ShapeKeyDelta {
                index: entry.welded,
                position: delta,
                normal,
            })
        })
        .collect()
}

/// Extract every shape key of a mesh
///
/// Returns `None` when the mesh has no keys, or has keys but no `Basis`
/// (a warning is recorded in that case). `order` is sorted in place.
pub fn extract_shape_keys(
    mesh: &str,
    blocks: &[ShapeKeyBlock],
    order: &mut [KeyOrderEntry],
    position_eps: f32,
    options: &ShapeKeyOptions,
    diagnostics: &mut Diagnostics,
) -> Option<ShapeKeys> {
    if blocks.is_empty() {
        return None;
    }

    let Some(basis) = blocks.iter().find(|b| b.name == BASIS_KEY_NAME) else {
        diagnostics.warn(mesh, Warning::MissingBasis);
        return None;
    };

    sort_key_order(order);

    let mut keys = Vec::new();
    for block in blocks.iter().filter(|b| b.name != BASIS_KEY_NAME) {
        let Some((group, state)) = split_key_name(&block.name, options) else {
            tracing::debug!(
                mesh,
                key = %block.name,
                "Shape key has no group and no default group, skipped"
            );
            continue;
        };

        let deltas = extract_deltas(basis, block, order, position_eps);
        tracing::debug!(mesh, key = %block.name, affected = deltas.len(), "Shape key");
        keys.push(ShapeKey {
            name: block.name.clone(),
            group,
            state,
            deltas,
        });
    }

    let groups = if options.groups {
        build_groups(&keys, basis, order)
    } else {
        Vec::new()
    };

    Some(ShapeKeys { keys, groups })
}

/// Merge grouped keys, in first-seen group order
fn build_groups(
    keys: &[ShapeKey],
    basis: &ShapeKeyBlock,
    order: &[KeyOrderEntry],
) -> Vec<ShapeKeyGroup> {
    let mut lookup: HashMap<&str, usize> = HashMap::new();
    let mut members: Vec<(&str, Vec<&ShapeKey>)> = Vec::new();

    for key in keys {
        let Some(group) = key.group.as_deref() else {
            continue;
        };
        let slot = *lookup.entry(group).or_insert_with(|| {
            members.push((group, Vec::new()));
            members.len() - 1
        });
        members[slot].1.push(key);
    }

    // Welded index -> source vertex
    let mut source_of: HashMap<u32, u32> = HashMap::with_capacity(order.len());
    for entry in order {
        source_of.insert(entry.welded, entry.vertex);
    }

    members
        .into_iter()
        .map(|(name, states)| {
            let mut affected: Vec<u32> = states
                .iter()
                .flat_map(|k| k.deltas.iter().map(|d| d.index))
                .collect();
            affected.sort_unstable();
            affected.dedup();

            let basis_positions = affected
                .iter()
                .map(|index| {
                    source_of
                        .get(index)
                        .map(|&v| basis.positions[v as usize])
                        .unwrap_or([0.0; 3])
                })
                .collect();

            let states = states
                .iter()
                .map(|key| GroupState {
                    name: key.state.clone(),
                    position_deltas: affected
                        .iter()
                        .map(|&index| {
                            key.deltas
                                .binary_search_by_key(&index, |d| d.index)
                                .map(|i| key.deltas[i].position)
                                .unwrap_or([0.0; 3])
                        })
                        .collect(),
                })
                .collect();

            ShapeKeyGroup {
                name: name.to_string(),
                affected_indices: affected,
                basis_positions,
                states,
            }
        })
        .collect()
}
