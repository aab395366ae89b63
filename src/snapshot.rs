//! Read-only published view of the field
//!
//! Built whole after each tick and handed out behind an `Arc`; readers never
//! see a half-updated particle list.

use std::sync::Arc;

use serde::Serialize;

use crate::sim::{
    CollisionEvent, FieldState, Node, NodeGrid, Particle, RotationalState, SupernovaEvent,
};

#[derive(Debug, Clone, Serialize)]
pub struct FieldSnapshot {
    pub tick: u64,
    pub clock_ms: u64,
    /// Immutable lattice, shared with the simulation
    pub nodes: Arc<[Node]>,
    pub particles: Vec<Particle>,
    pub rotation: RotationalState,
    /// Live collision events (oldest first)
    pub collisions: Vec<CollisionEvent>,
    /// Live supernova events (oldest first)
    pub supernovae: Vec<SupernovaEvent>,
}

impl FieldSnapshot {
    pub fn capture(state: &FieldState, grid: &NodeGrid) -> Self {
        let now = state.clock_ms;
        Self {
            tick: state.tick_count,
            clock_ms: now,
            nodes: grid.shared(),
            particles: state.particles.clone(),
            rotation: state.rotation,
            collisions: state.collisions.live(now).cloned().collect(),
            supernovae: state.supernovae.live(now).cloned().collect(),
        }
    }

    pub fn population(&self) -> usize {
        self.particles.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
