//! Particle value type
//!
//! Attributes are bounded. Builders clamp on the way in, `decay` respects the
//! floors, and `clamp_to_bounds` pulls everything back into range after a
//! drift pass.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::grid::NodeId;
use crate::config::FieldConfig;
use crate::consts::*;
use crate::frequency_color;

pub type ParticleId = u64;

/// A mobile entity drifting through the spectrum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: ParticleId,
    /// Frequency at creation; the particle's identity for resonance
    pub base_frequency: f32,
    /// Current frequency, drifts every tick
    pub locational_frequency: f32,
    /// [1.0, 4.0]
    pub harmonic_factor: f32,
    /// [default_amplitude, 1.0]
    pub amplitude: f32,
    /// [0.1, 1.0]; reaching 1.0 triggers a supernova
    pub energy_level: f32,
    pub color: Vec3,
    /// Nearest node by frequency as of the last assignment pass
    pub target_node: Option<NodeId>,
}

impl Particle {
    /// A fresh particle at rest: minimum amplitude, energy and harmonic factor
    pub fn new(id: ParticleId, frequency: f32, config: &FieldConfig) -> Self {
        let frequency = config.band.clamp(frequency);
        Self {
            id,
            base_frequency: frequency,
            locational_frequency: frequency,
            harmonic_factor: HARMONIC_MIN,
            amplitude: config.default_amplitude,
            energy_level: ENERGY_MIN,
            color: frequency_color(frequency, config.band),
            target_node: None,
        }
    }

    pub fn with_energy(mut self, energy_level: f32) -> Self {
        self.energy_level = energy_level.clamp(ENERGY_MIN, ENERGY_MAX);
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32, config: &FieldConfig) -> Self {
        self.amplitude = amplitude.clamp(config.default_amplitude, AMPLITUDE_MAX);
        self
    }

    pub fn with_harmonic(mut self, harmonic_factor: f32) -> Self {
        self.harmonic_factor = harmonic_factor.clamp(HARMONIC_MIN, HARMONIC_MAX);
        self
    }

    /// One tick of relaxation toward the floors
    pub fn decay(&mut self, amplitude_floor: f32) {
        self.amplitude = (self.amplitude - AMPLITUDE_DECAY).max(amplitude_floor);
        self.harmonic_factor = (self.harmonic_factor - HARMONIC_DECAY).max(HARMONIC_MIN);
        self.energy_level = (self.energy_level - ENERGY_DECAY).max(ENERGY_MIN);
    }

    pub fn clamp_to_bounds(&mut self, config: &FieldConfig) {
        self.locational_frequency = config.band.clamp(self.locational_frequency);
        self.amplitude = self.amplitude.clamp(config.default_amplitude, AMPLITUDE_MAX);
        self.harmonic_factor = self.harmonic_factor.clamp(HARMONIC_MIN, HARMONIC_MAX);
        self.energy_level = self.energy_level.clamp(ENERGY_MIN, ENERGY_MAX);
    }

    /// Energy has saturated
    #[inline]
    pub fn is_critical(&self) -> bool {
        self.energy_level >= ENERGY_MAX
    }

    /// Whether every bounded attribute is inside its range
    pub fn within_bounds(&self, config: &FieldConfig) -> bool {
        config.band.contains(self.locational_frequency)
            && (config.default_amplitude..=AMPLITUDE_MAX).contains(&self.amplitude)
            && (HARMONIC_MIN..=HARMONIC_MAX).contains(&self.harmonic_factor)
            && (ENERGY_MIN..=ENERGY_MAX).contains(&self.energy_level)
    }
}
