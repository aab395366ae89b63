//! Startup configuration errors
//!
//! The simulation itself is total; only configuration can be rejected, and
//! only once, when a `Simulation` is built.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid size must be a positive odd number, got {0}")]
    GridSize(u32),

    #[error("grid spacing must be positive and finite, got {0}")]
    Spacing(f32),

    #[error("frequency band [{low}, {high}] is empty or not finite")]
    Band { low: f32, high: f32 },

    #[error("max particles must be at least 1")]
    MaxParticles,

    #[error("default amplitude must lie in (0, 1], got {0}")]
    Amplitude(f32),

    #[error("tick interval must be at least 1ms")]
    TickInterval,

    #[error("drift magnitude must be non-negative and finite, got {0}")]
    Drift(f32),

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
