//! The field as one owned unit
//!
//! `Simulation` pairs the immutable grid with the mutable state and is the
//! single mutation point: ticks and spawn requests both go through `&mut
//! self`, so they can never interleave.

use glam::Vec3;

use crate::config::FieldConfig;
use crate::error::ConfigError;
use crate::sim::{self, FieldState, NodeGrid, ParticleId, TickReport};
use crate::snapshot::FieldSnapshot;

#[derive(Debug, Clone)]
pub struct Simulation {
    grid: NodeGrid,
    state: FieldState,
}

impl Simulation {
    /// Validate the config and generate the lattice
    pub fn new(config: FieldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = NodeGrid::from_config(&config);
        log::info!(
            "Field ready: {} nodes, cap {} particles, tick {}ms, seed {}",
            grid.len(),
            config.max_particles,
            config.tick_interval_ms,
            config.seed
        );
        Ok(Self {
            grid,
            state: FieldState::new(config),
        })
    }

    pub fn config(&self) -> &FieldConfig {
        &self.state.config
    }

    pub fn grid(&self) -> &NodeGrid {
        &self.grid
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut FieldState {
        &mut self.state
    }

    /// Run exactly one tick
    pub fn step(&mut self) -> TickReport {
        sim::tick(&mut self.state, &self.grid)
    }

    /// External spawn request; `None` when the field is full
    pub fn spawn_particle(&mut self, position: Option<Vec3>) -> Option<ParticleId> {
        sim::spawn_particle(&mut self.state, &self.grid, position)
    }

    /// Random spawns up to `count` (the cap still applies); returns how many landed
    pub fn seed_particles(&mut self, count: usize) -> usize {
        (0..count)
            .filter_map(|_| self.spawn_particle(None))
            .count()
    }

    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::capture(&self.state, &self.grid)
    }
}
