//! Resonance Field - a tick-driven frequency lattice simulation
//!
//! Particles live at positions in a frequency spectrum and drift toward the
//! nearest node of a fixed 3D lattice. Collisions on a node build resonance,
//! saturated particles go supernova, and collision energy on the lattice
//! corners spins a global rotation that feeds back into future drift.
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grid, particles, tick engine, events)
//! - `simulation`: Single mutation point wrapping grid + state
//! - `snapshot`: Read-only published view for renderers and charts
//! - `runner`: Fixed-cadence background ticking with atomic snapshot swap
//! - `config`: Startup configuration and validation

pub mod config;
pub mod error;
pub mod runner;
pub mod sim;
pub mod simulation;
pub mod snapshot;

pub use config::{FieldConfig, FrequencyBand};
pub use error::ConfigError;
pub use runner::{FieldHandle, FieldRunner};
pub use simulation::Simulation;
pub use snapshot::FieldSnapshot;

use glam::Vec3;

/// Simulation configuration constants
pub mod consts {
    /// Reference tick cadence (10 Hz)
    pub const TICK_INTERVAL_MS: u64 = 100;

    /// Lattice defaults (odd size so a center node exists)
    pub const GRID_SIZE: u32 = 7;
    pub const GRID_SPACING: f32 = 4.0;
    /// Cosmetic brightness carried by every node
    pub const NODE_INTENSITY: f32 = 0.6;

    /// Frequency band
    pub const BASE_FREQ_LOW: f32 = 100.0;
    pub const BASE_FREQ_HIGH: f32 = 999.0;

    /// Population cap
    pub const MAX_PARTICLES: usize = 8;

    /// Particle attribute bounds
    pub const DEFAULT_AMPLITUDE: f32 = 0.4;
    pub const AMPLITUDE_MAX: f32 = 1.0;
    pub const HARMONIC_MIN: f32 = 1.0;
    pub const HARMONIC_MAX: f32 = 4.0;
    pub const ENERGY_MIN: f32 = 0.1;
    pub const ENERGY_MAX: f32 = 1.0;

    /// Per-tick decay toward the floors
    pub const AMPLITUDE_DECAY: f32 = 0.005;
    pub const HARMONIC_DECAY: f32 = 0.02;
    pub const ENERGY_DECAY: f32 = 0.002;

    /// Drift: uniform jitter in [-DRIFT_JITTER, DRIFT_JITTER] times drift magnitude
    pub const DRIFT_JITTER: f32 = 2.0;
    pub const DEFAULT_DRIFT_MAGNITUDE: f32 = 1.0;
    /// Scale applied to the summed (omega x node position) drift term
    pub const CORIOLIS_SCALE: f32 = 20.0;

    /// Rotation
    pub const ANGULAR_DAMPING: f32 = 0.97;
    /// Squared angular speed below which the field is considered at rest
    pub const ROTATION_EPSILON: f32 = 1e-8;
    /// Corner occupants above this energy add torque
    pub const TORQUE_ENERGY_THRESHOLD: f32 = 0.2;
    pub const TORQUE_SCALE: f32 = 0.0005;

    /// Collision response
    pub const HARMONIC_BASE_GAIN: f32 = 0.6;
    pub const HARMONIC_GAIN_PER_OTHER: f32 = 0.2;
    pub const AMPLITUDE_GAIN: f32 = 0.15;
    pub const ENERGY_GAIN_PER_OTHER: f32 = 0.2;
    pub const COLOR_BLEND: f32 = 0.15;

    /// Event lifetimes (logical milliseconds)
    pub const COLLISION_EVENT_LIFETIME_MS: u64 = 1500;
    pub const SUPERNOVA_EVENT_LIFETIME_MS: u64 = 2000;

    /// Delay before a supernova's replacement particle appears
    pub const REPLACEMENT_DELAY_MS: u64 = 300;

    /// Random spawns jitter the chosen node frequency by up to this much
    pub const SPAWN_JITTER: f32 = 5.0;

    /// Population-pressure valve: spawn when this energetic and this sparse
    pub const STABILIZE_MEAN_AMPLITUDE: f32 = 0.7;
    pub const STABILIZE_POPULATION: usize = 3;

    pub const DEFAULT_SEED: u64 = 0x5EED;
}

/// Intrinsic frequency of a point in space.
///
/// A y-dominant hash of position folded into the band and rounded to a whole
/// frequency. Node frequencies and positional spawns both use this, so a
/// point and its frequency are interchangeable. Non-finite positions fold to
/// the bottom of the band.
pub fn frequency_at(position: Vec3, band: FrequencyBand) -> f32 {
    let raw =
        (position.x + 20.0) * 1.5 + (position.y + 20.0) * 10.0 + (position.z + 20.0) * 0.5;
    let offset = if raw.is_finite() {
        raw.rem_euclid(band.width())
    } else {
        0.0
    };
    band.clamp((band.low + offset).round())
}

/// Display color for a frequency: hue sweeps red -> violet across the band
pub fn frequency_color(frequency: f32, band: FrequencyBand) -> Vec3 {
    let t = band.normalized(frequency);
    hsl_to_rgb(t * 300.0, 0.8, 0.6)
}

/// Convert HSL (hue in degrees, saturation/lightness 0-1) to linear RGB 0-1
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Vec3 {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    Vec3::new(r + m, g + m, b + m)
}
