//! Field state and core simulation types
//!
//! Everything the tick engine mutates lives here. The node grid is kept
//! outside: it is immutable and shared with readers.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::deferred::{DeferredQueue, DeferredTask};
use super::events::{CollisionEvent, EventChannel, EventId, SupernovaEvent};
use super::particle::{Particle, ParticleId};
use super::rotation::RotationalState;
use crate::config::FieldConfig;
use crate::consts::*;

/// Complete mutable field state (deterministic for a given seed)
#[derive(Debug, Clone)]
pub struct FieldState {
    pub config: FieldConfig,
    /// Completed ticks
    pub tick_count: u64,
    /// Logical clock, advanced by the tick interval each step
    pub clock_ms: u64,
    /// Live particles (sorted by id for determinism)
    pub particles: Vec<Particle>,
    pub rotation: RotationalState,
    pub collisions: EventChannel<CollisionEvent>,
    pub supernovae: EventChannel<SupernovaEvent>,
    pub deferred: DeferredQueue<DeferredTask>,
    pub(crate) rng: Pcg32,
    next_particle_id: ParticleId,
    next_event_id: EventId,
}

impl FieldState {
    pub fn new(config: FieldConfig) -> Self {
        let rng = Pcg32::seed_from_u64(config.seed);
        let capacity = config.max_particles;
        Self {
            config,
            tick_count: 0,
            clock_ms: 0,
            particles: Vec::with_capacity(capacity),
            rotation: RotationalState::default(),
            collisions: EventChannel::new(COLLISION_EVENT_LIFETIME_MS),
            supernovae: EventChannel::new(SUPERNOVA_EVENT_LIFETIME_MS),
            deferred: DeferredQueue::new(),
            rng,
            next_particle_id: 1,
            next_event_id: 1,
        }
    }

    /// Allocate a new particle ID
    pub fn next_particle_id(&mut self) -> ParticleId {
        let id = self.next_particle_id;
        self.next_particle_id += 1;
        id
    }

    /// Allocate a new event ID (shared by both channels)
    pub fn next_event_id(&mut self) -> EventId {
        let id = self.next_event_id;
        self.next_event_id += 1;
        id
    }

    pub fn population(&self) -> usize {
        self.particles.len()
    }

    pub fn at_capacity(&self) -> bool {
        self.particles.len() >= self.config.max_particles
    }

    /// Mean amplitude of live particles; `None` when the field is empty
    pub fn mean_amplitude(&self) -> Option<f32> {
        if self.particles.is_empty() {
            return None;
        }
        let total: f32 = self.particles.iter().map(|p| p.amplitude).sum();
        Some(total / self.particles.len() as f32)
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.iter().find(|p| p.id == id)
    }

    /// Ensure particles are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.particles.sort_by_key(|p| p.id);
    }
}
