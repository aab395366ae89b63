//! Deterministic simulation module
//!
//! All field dynamics live here. This module must be pure and deterministic:
//! - Logical clock only (no wall time)
//! - Seeded RNG only
//! - Stable iteration order (particles by id, nodes by generation order)
//! - No threading or presentation dependencies

pub mod deferred;
pub mod events;
pub mod grid;
pub mod particle;
pub mod rotation;
pub mod spawn;
pub mod state;
pub mod tick;

pub use deferred::{DeferredQueue, DeferredTask};
pub use events::{CollisionEvent, EventChannel, EventId, SupernovaEvent, TimedEvent};
pub use grid::{Node, NodeGrid, NodeId};
pub use particle::{Particle, ParticleId};
pub use rotation::RotationalState;
pub use spawn::spawn_particle;
pub use state::FieldState;
pub use tick::{Occupancy, TickReport, tick};
