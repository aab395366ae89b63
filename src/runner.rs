//! Fixed-cadence background runner
//!
//! Moves a `Simulation` onto its own thread and ticks it every
//! `tick_interval_ms`. Spawn requests arrive over a channel and are applied
//! between ticks only. After every tick or applied command a fresh
//! `FieldSnapshot` is swapped in whole, so readers always see a complete
//! tick. A slow tick pushes the next one back; there is no catch-up burst.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use glam::Vec3;
use parking_lot::RwLock;

use crate::simulation::Simulation;
use crate::snapshot::FieldSnapshot;

/// Requests the runner thread understands
#[derive(Debug, Clone, Copy)]
enum Command {
    Spawn(Option<Vec3>),
    Stop,
}

/// Latest published snapshot, replaced atomically
type SharedSnapshot = Arc<RwLock<Arc<FieldSnapshot>>>;

/// Cloneable access to a running field: read snapshots, request spawns
#[derive(Debug, Clone)]
pub struct FieldHandle {
    commands: Sender<Command>,
    snapshot: SharedSnapshot,
}

impl FieldHandle {
    /// Queue a spawn; it is applied before the next tick
    pub fn spawn_particle(&self, position: Option<Vec3>) {
        if self.commands.send(Command::Spawn(position)).is_err() {
            log::warn!("Spawn request dropped: field runner has stopped");
        }
    }

    /// Most recently published snapshot
    pub fn snapshot(&self) -> Arc<FieldSnapshot> {
        self.snapshot.read().clone()
    }
}

/// Owns the ticking thread
pub struct FieldRunner {
    handle: FieldHandle,
    thread: Option<JoinHandle<Simulation>>,
}

impl FieldRunner {
    /// Start ticking `simulation` at its configured cadence
    pub fn start(simulation: Simulation) -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let snapshot: SharedSnapshot = Arc::new(RwLock::new(Arc::new(simulation.snapshot())));
        let published = Arc::clone(&snapshot);

        let thread = thread::Builder::new()
            .name("field-tick".into())
            .spawn(move || run(simulation, rx, published))?;

        log::info!("Field runner started");
        Ok(Self {
            handle: FieldHandle {
                commands: tx,
                snapshot,
            },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> FieldHandle {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> Arc<FieldSnapshot> {
        self.handle.snapshot()
    }

    pub fn spawn_particle(&self, position: Option<Vec3>) {
        self.handle.spawn_particle(position);
    }

    /// Stop ticking and hand the simulation back
    pub fn stop(mut self) -> Option<Simulation> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<Simulation> {
        let thread = self.thread.take()?;
        let _ = self.handle.commands.send(Command::Stop);
        match thread.join() {
            Ok(simulation) => {
                log::info!(
                    "Field runner stopped after {} ticks",
                    simulation.state().tick_count
                );
                Some(simulation)
            }
            Err(_) => {
                log::error!("Field runner thread panicked");
                None
            }
        }
    }
}

impl Drop for FieldRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn publish(simulation: &Simulation, snapshot: &SharedSnapshot) {
    let next = Arc::new(simulation.snapshot());
    *snapshot.write() = next;
}

/// Tick loop: wait for the next deadline while serving commands
fn run(
    mut simulation: Simulation,
    commands: Receiver<Command>,
    snapshot: SharedSnapshot,
) -> Simulation {
    let interval = simulation.config().tick_interval();
    let mut next_tick = Instant::now() + interval;

    loop {
        let now = Instant::now();
        if now >= next_tick {
            simulation.step();
            publish(&simulation, &snapshot);

            next_tick += interval;
            let after = Instant::now();
            if next_tick <= after {
                log::debug!("Tick overran its interval; delaying the next one");
                next_tick = after + interval;
            }
            continue;
        }

        match commands.recv_timeout(next_tick - now) {
            Ok(Command::Spawn(position)) => {
                if simulation.spawn_particle(position).is_some() {
                    publish(&simulation, &snapshot);
                }
            }
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    simulation
}
