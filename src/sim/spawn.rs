//! Spawn controller
//!
//! Admission is capped: at `max_particles` a spawn request is dropped
//! silently, as is a request at a non-finite position. A requested position seeds the particle at that point's
//! intrinsic frequency; otherwise a random interior node is picked and its
//! frequency jittered.

use glam::Vec3;
use rand::Rng;

use super::grid::NodeGrid;
use super::particle::{Particle, ParticleId};
use super::state::FieldState;
use crate::consts::SPAWN_JITTER;
use crate::frequency_at;

/// Create one particle; returns its id, or `None` if the field is full
pub fn spawn_particle(
    state: &mut FieldState,
    grid: &NodeGrid,
    position: Option<Vec3>,
) -> Option<ParticleId> {
    if state.at_capacity() {
        log::debug!(
            "Spawn rejected: population at cap ({})",
            state.config.max_particles
        );
        return None;
    }

    if position.is_some_and(|pos| !pos.is_finite()) {
        log::debug!("Spawn rejected: non-finite position {:?}", position);
        return None;
    }

    let band = state.config.band;
    let frequency = match position {
        Some(pos) => frequency_at(pos, band),
        None => random_frequency(state, grid),
    };

    let id = state.next_particle_id();
    let mut particle = Particle::new(id, frequency, &state.config);
    particle.target_node = grid.nearest(particle.locational_frequency).map(|n| n.id);

    log::debug!(
        "Spawned particle {} at {:.1} (target {:?})",
        id,
        particle.locational_frequency,
        particle.target_node
    );
    state.particles.push(particle);
    Some(id)
}

/// Jittered frequency of a random non-corner node, or anywhere in band when
/// the grid has no interior
fn random_frequency(state: &mut FieldState, grid: &NodeGrid) -> f32 {
    let band = state.config.band;
    let interior = grid.interior_indices();
    if interior.is_empty() {
        return state.rng.random_range(band.low..=band.high);
    }
    let pick = interior[state.rng.random_range(0..interior.len())];
    let jitter = state.rng.random_range(-SPAWN_JITTER..=SPAWN_JITTER);
    band.clamp(grid.nodes()[pick].frequency + jitter)
}
