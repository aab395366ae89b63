//! Node lattice
//!
//! A cube of `grid_size`^3 anchor points centered on the origin. Generated
//! once at startup and never mutated; frequency, color and corner flag are
//! all pure functions of position and config.

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::{FieldConfig, FrequencyBand};
use crate::consts::NODE_INTENSITY;
use crate::{frequency_at, frequency_color};

/// Lattice coordinates of a node, in node steps from the center.
///
/// Derived ordering (x, then y, then z) matches generation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl NodeId {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A fixed lattice point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Vec3,
    pub frequency: f32,
    pub color: Vec3,
    /// At the lattice extremity on all three axes
    pub is_corner: bool,
    pub intensity: f32,
}

/// The generated lattice, in generation order (x outer, z inner)
#[derive(Debug, Clone)]
pub struct NodeGrid {
    /// Nodes span `-half..=half` on each axis
    half: i32,
    nodes: Arc<[Node]>,
    /// Indices of non-corner nodes, for random spawns
    interior: Vec<usize>,
}

impl NodeGrid {
    /// Build the lattice for a (validated) config
    pub fn from_config(config: &FieldConfig) -> Self {
        Self::generate(config.grid_size, config.spacing, config.band)
    }

    /// Generate a cube of side `grid_size` spaced `spacing` apart.
    ///
    /// The lattice is symmetric about the origin, so an even `grid_size`
    /// rounds up to the next odd side.
    pub fn generate(grid_size: u32, spacing: f32, band: FrequencyBand) -> Self {
        let half = (grid_size / 2) as i32;
        let side = (2 * half + 1) as usize;
        let mut nodes = Vec::with_capacity(side.pow(3));

        for x in -half..=half {
            for y in -half..=half {
                for z in -half..=half {
                    let position = Vec3::new(x as f32, y as f32, z as f32) * spacing;
                    let frequency = frequency_at(position, band);
                    nodes.push(Node {
                        id: NodeId::new(x, y, z),
                        position,
                        frequency,
                        color: frequency_color(frequency, band),
                        is_corner: x.abs() == half && y.abs() == half && z.abs() == half,
                        intensity: NODE_INTENSITY,
                    });
                }
            }
        }

        let interior = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.is_corner)
            .map(|(i, _)| i)
            .collect();

        log::info!(
            "Generated {} nodes ({}^3, spacing {})",
            nodes.len(),
            grid_size,
            spacing
        );

        Self {
            half,
            nodes: nodes.into(),
            interior,
        }
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Shared handle to the node list (cheap clone for snapshots)
    pub fn shared(&self) -> Arc<[Node]> {
        Arc::clone(&self.nodes)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of a node in generation order
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let half = self.half;
        let in_range = |c: i32| (-half..=half).contains(&c);
        if !(in_range(id.x) && in_range(id.y) && in_range(id.z)) {
            return None;
        }
        let n = (2 * half + 1) as usize;
        let (x, y, z) = (
            (id.x + half) as usize,
            (id.y + half) as usize,
            (id.z + half) as usize,
        );
        Some((x * n + y) * n + z)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// Index of the node closest in frequency; the first minimal node wins ties
    pub fn nearest_index(&self, frequency: f32) -> Option<usize> {
        if frequency.is_nan() {
            return None;
        }
        let mut best: Option<(usize, f32)> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            let distance = (node.frequency - frequency).abs();
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((i, distance)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn nearest(&self, frequency: f32) -> Option<&Node> {
        self.nearest_index(frequency).map(|i| &self.nodes[i])
    }

    /// Non-corner node indices in generation order
    pub fn interior_indices(&self) -> &[usize] {
        &self.interior
    }

    pub fn corner_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_corner)
    }
}
