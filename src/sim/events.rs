//! Self-expiring event channels
//!
//! The tick engine publishes; observers poll the live set. An event is live
//! from its timestamp until `timestamp + lifetime` (exclusive) on the logical
//! clock. There is no acknowledgment: consumers remember which ids they have
//! already handled.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::grid::NodeId;
use super::particle::ParticleId;

pub type EventId = u64;

/// Events carry their own publish time
pub trait TimedEvent {
    fn id(&self) -> EventId;
    fn timestamp_ms(&self) -> u64;
}

/// Two or more particles landed on the same node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub id: EventId,
    pub node: NodeId,
    pub particles: Vec<ParticleId>,
    pub position: Vec3,
    pub timestamp_ms: u64,
}

/// A collision saturated someone's energy; all participants are consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupernovaEvent {
    pub id: EventId,
    pub node: NodeId,
    pub particles: Vec<ParticleId>,
    pub position: Vec3,
    pub timestamp_ms: u64,
}

impl TimedEvent for CollisionEvent {
    fn id(&self) -> EventId {
        self.id
    }

    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

impl TimedEvent for SupernovaEvent {
    fn id(&self) -> EventId {
        self.id
    }

    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

/// Published events with a fixed lifetime, oldest first
#[derive(Debug, Clone)]
pub struct EventChannel<E> {
    lifetime_ms: u64,
    events: Vec<E>,
}

impl<E: TimedEvent> EventChannel<E> {
    pub fn new(lifetime_ms: u64) -> Self {
        Self {
            lifetime_ms,
            events: Vec::new(),
        }
    }

    pub fn lifetime_ms(&self) -> u64 {
        self.lifetime_ms
    }

    pub fn publish(&mut self, event: E) {
        self.events.push(event);
    }

    /// Logical time at which an event drops out of the channel
    #[inline]
    pub fn expires_at(&self, event: &E) -> u64 {
        event.timestamp_ms().saturating_add(self.lifetime_ms)
    }

    /// Drop everything whose lifetime has elapsed at `now`
    pub fn prune(&mut self, now_ms: u64) {
        let lifetime = self.lifetime_ms;
        self.events
            .retain(|e| now_ms < e.timestamp_ms().saturating_add(lifetime));
    }

    /// Events still live at `now`, without mutating the channel
    pub fn live(&self, now_ms: u64) -> impl Iterator<Item = &E> {
        self.events
            .iter()
            .filter(move |e| now_ms < self.expires_at(e))
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.events.iter().any(|e| e.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
