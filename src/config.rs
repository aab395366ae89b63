//! Field configuration
//!
//! Fixed at startup; nothing here is mutable while the field is running.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Inclusive frequency range every particle and node lives in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low: f32,
    pub high: f32,
}

impl Default for FrequencyBand {
    fn default() -> Self {
        Self::new(BASE_FREQ_LOW, BASE_FREQ_HIGH)
    }
}

impl FrequencyBand {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.high - self.low
    }

    /// Clamp into the band; NaN lands on `low`
    #[inline]
    pub fn clamp(&self, frequency: f32) -> f32 {
        if frequency.is_nan() {
            return self.low;
        }
        frequency.clamp(self.low, self.high)
    }

    #[inline]
    pub fn contains(&self, frequency: f32) -> bool {
        frequency >= self.low && frequency <= self.high
    }

    /// Position of a frequency within the band, 0 at `low`, 1 at `high`
    pub fn normalized(&self, frequency: f32) -> f32 {
        ((frequency - self.low) / self.width()).clamp(0.0, 1.0)
    }
}

/// Everything the field needs to know at construction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    // === Lattice ===
    /// Nodes per axis (odd)
    pub grid_size: u32,
    /// Distance between neighbouring nodes
    pub spacing: f32,

    // === Spectrum ===
    pub band: FrequencyBand,

    // === Population ===
    pub max_particles: usize,
    /// Amplitude floor and starting amplitude of new particles
    pub default_amplitude: f32,

    // === Timing ===
    pub tick_interval_ms: u64,
    /// Logical delay between a supernova and its replacement spawn
    pub replacement_delay_ms: u64,

    // === Dynamics ===
    /// Multiplier on the per-tick random frequency jitter
    pub drift_magnitude: f32,
    /// RNG seed; identical config + commands reproduce a run exactly
    pub seed: u64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            spacing: GRID_SPACING,

            band: FrequencyBand::default(),

            max_particles: MAX_PARTICLES,
            default_amplitude: DEFAULT_AMPLITUDE,

            tick_interval_ms: TICK_INTERVAL_MS,
            replacement_delay_ms: REPLACEMENT_DELAY_MS,

            drift_magnitude: DEFAULT_DRIFT_MAGNITUDE,
            seed: DEFAULT_SEED,
        }
    }
}

impl FieldConfig {
    /// Reference configuration with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check startup preconditions
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 || self.grid_size.is_multiple_of(2) {
            return Err(ConfigError::GridSize(self.grid_size));
        }
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(ConfigError::Spacing(self.spacing));
        }
        let FrequencyBand { low, high } = self.band;
        if !low.is_finite() || !high.is_finite() || high <= low {
            return Err(ConfigError::Band { low, high });
        }
        if self.max_particles == 0 {
            return Err(ConfigError::MaxParticles);
        }
        if !(self.default_amplitude > 0.0 && self.default_amplitude <= AMPLITUDE_MAX) {
            return Err(ConfigError::Amplitude(self.default_amplitude));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::TickInterval);
        }
        if !self.drift_magnitude.is_finite() || self.drift_magnitude < 0.0 {
            return Err(ConfigError::Drift(self.drift_magnitude));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
