//! Fixed-cadence field tick
//!
//! One call advances the logical clock by one interval and runs the whole
//! pipeline in a fixed order: deferred work, rotation, drift, assignment,
//! corner torque, collisions, supernovae, stabilization. The order is part
//! of the dynamics (rotation read during drift was written by the previous
//! tick's torque) and must not be rearranged.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use rand::Rng;

use super::deferred::DeferredTask;
use super::events::{CollisionEvent, EventId, SupernovaEvent};
use super::grid::NodeGrid;
use super::particle::ParticleId;
use super::spawn::spawn_particle;
use super::state::FieldState;
use crate::consts::*;

/// Particle indices grouped by the grid index of their target node.
/// Keyed in generation order so every per-node pass is deterministic.
pub type Occupancy = BTreeMap<usize, Vec<usize>>;

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub clock_ms: u64,
    pub collisions: Vec<EventId>,
    pub supernovae: Vec<EventId>,
    /// Particles created this tick (replacements and stabilization)
    pub spawned: Vec<ParticleId>,
    pub population: usize,
    pub mean_amplitude: Option<f32>,
}

/// A node whose collision saturated at least one participant
#[derive(Debug, Clone)]
struct Critical {
    node_index: usize,
    occupants: Vec<usize>,
}

/// Advance the field by one tick
pub fn tick(state: &mut FieldState, grid: &NodeGrid) -> TickReport {
    state.tick_count += 1;
    state.clock_ms += state.config.tick_interval_ms;
    let now = state.clock_ms;

    let mut report = TickReport {
        tick: state.tick_count,
        clock_ms: now,
        ..Default::default()
    };

    state.collisions.prune(now);
    state.supernovae.prune(now);

    // Replacement spawns queued by earlier supernovae
    for task in state.deferred.drain_due(now) {
        match task {
            DeferredTask::ReplacementSpawn { supernova } => {
                if let Some(id) = spawn_particle(state, grid, None) {
                    log::debug!("Replacement particle {} for supernova {}", id, supernova);
                    report.spawned.push(id);
                }
            }
        }
    }

    state.rotation.damp_and_integrate();
    drift_particles(state, grid);

    let occupancy = assign_targets(state, grid);
    apply_corner_torque(state, grid, &occupancy);

    let critical = resolve_collisions(state, grid, &occupancy, &mut report);
    resolve_supernovae(state, grid, &critical, &mut report);

    if let Some(id) = stabilize_population(state, grid) {
        report.spawned.push(id);
    }

    state.normalize_order();

    report.population = state.population();
    report.mean_amplitude = state.mean_amplitude();
    log::trace!(
        "tick {} @{}ms: pop={} collisions={} supernovae={} |w|={:.5}",
        report.tick,
        now,
        report.population,
        report.collisions.len(),
        report.supernovae.len(),
        state.rotation.angular_speed()
    );
    report
}

/// Random jitter plus rotational bias on every frequency, then decay.
///
/// The Coriolis term reads the target assigned on the previous tick.
pub fn drift_particles(state: &mut FieldState, grid: &NodeGrid) {
    let drift_magnitude = state.config.drift_magnitude;
    let amplitude_floor = state.config.default_amplitude;
    let rotation = state.rotation;
    let spinning = rotation.is_spinning();

    let FieldState {
        config,
        particles,
        rng,
        ..
    } = state;
    for particle in particles.iter_mut() {
        let mut drift = rng.random_range(-DRIFT_JITTER..=DRIFT_JITTER) * drift_magnitude;

        if spinning {
            if let Some(node) = particle.target_node.and_then(|id| grid.node(id)) {
                drift += rotation.coriolis_drift(node.position);
            }
        }

        particle.locational_frequency += drift;
        particle.decay(amplitude_floor);
        particle.clamp_to_bounds(config);
    }
}

/// Point every particle at its nearest node and group them by node
pub fn assign_targets(state: &mut FieldState, grid: &NodeGrid) -> Occupancy {
    let mut occupancy = Occupancy::new();
    for (i, particle) in state.particles.iter_mut().enumerate() {
        match grid.nearest_index(particle.locational_frequency) {
            Some(node_index) => {
                particle.target_node = Some(grid.nodes()[node_index].id);
                occupancy.entry(node_index).or_default().push(i);
            }
            None => particle.target_node = None,
        }
    }
    occupancy
}

/// Energetic particles sitting on corner nodes push the global rotation
pub fn apply_corner_torque(state: &mut FieldState, grid: &NodeGrid, occupancy: &Occupancy) {
    for (&node_index, occupants) in occupancy {
        let node = &grid.nodes()[node_index];
        if !node.is_corner {
            continue;
        }
        let direction = node.position.normalize_or_zero();
        for &i in occupants {
            let energy = state.particles[i].energy_level;
            if energy > TORQUE_ENERGY_THRESHOLD {
                state
                    .rotation
                    .apply_torque(direction * energy * TORQUE_SCALE);
            }
        }
    }
}

/// Resonance exchange on every shared node.
///
/// Each participant is updated once from the *pre-collision* averages of the
/// others. Returns the nodes where someone's energy saturated.
fn resolve_collisions(
    state: &mut FieldState,
    grid: &NodeGrid,
    occupancy: &Occupancy,
    report: &mut TickReport,
) -> Vec<Critical> {
    let band_width = state.config.band.width();
    let mut critical = Vec::new();

    for (&node_index, occupants) in occupancy {
        if occupants.len() < 2 {
            continue;
        }
        let node = &grid.nodes()[node_index];

        let event = CollisionEvent {
            id: state.next_event_id(),
            node: node.id,
            particles: occupants.iter().map(|&i| state.particles[i].id).collect(),
            position: node.position,
            timestamp_ms: state.clock_ms,
        };
        log::debug!(
            "Collision {} on node {:?}: particles {:?}",
            event.id,
            event.node,
            event.particles
        );
        report.collisions.push(event.id);
        state.collisions.publish(event);

        let before: Vec<(f32, f32, Vec3)> = occupants
            .iter()
            .map(|&i| {
                let p = &state.particles[i];
                (p.base_frequency, p.amplitude, p.color)
            })
            .collect();
        let others = (occupants.len() - 1) as f32;

        let mut saturated = false;
        for (k, &i) in occupants.iter().enumerate() {
            let (mut base_sum, mut amplitude_sum, mut color_sum) = (0.0, 0.0, Vec3::ZERO);
            for (j, &(base, amplitude, color)) in before.iter().enumerate() {
                if j != k {
                    base_sum += base;
                    amplitude_sum += amplitude;
                    color_sum += color;
                }
            }
            let avg_base = base_sum / others;
            let avg_amplitude = amplitude_sum / others;
            let avg_color = color_sum / others;

            let p = &mut state.particles[i];
            let closeness = (1.0 - (p.base_frequency - avg_base).abs() / band_width).clamp(0.0, 1.0);
            let resonance = closeness * closeness;
            let harmonic_gain = resonance
                * avg_amplitude
                * (HARMONIC_BASE_GAIN + HARMONIC_GAIN_PER_OTHER * others);

            p.harmonic_factor = (p.harmonic_factor + harmonic_gain).min(HARMONIC_MAX);
            p.amplitude = (p.amplitude + avg_amplitude * AMPLITUDE_GAIN).min(AMPLITUDE_MAX);
            p.energy_level = (p.energy_level + ENERGY_GAIN_PER_OTHER * others).min(ENERGY_MAX);
            p.color = p.color.lerp(avg_color, COLOR_BLEND);

            saturated |= p.is_critical();
        }

        if saturated {
            critical.push(Critical {
                node_index,
                occupants: occupants.clone(),
            });
        }
    }

    critical
}

/// Consume every participant of a saturated collision and queue one
/// replacement per explosion.
///
/// Removal is mark-then-filter: nothing leaves the store until every node
/// has been handled.
fn resolve_supernovae(
    state: &mut FieldState,
    grid: &NodeGrid,
    critical: &[Critical],
    report: &mut TickReport,
) {
    if critical.is_empty() {
        return;
    }

    let mut doomed: BTreeSet<ParticleId> = BTreeSet::new();
    let due = state.clock_ms + state.config.replacement_delay_ms;

    for entry in critical {
        let node = &grid.nodes()[entry.node_index];
        let particles: Vec<ParticleId> = entry
            .occupants
            .iter()
            .map(|&i| state.particles[i].id)
            .collect();
        doomed.extend(particles.iter().copied());

        let event = SupernovaEvent {
            id: state.next_event_id(),
            node: node.id,
            particles,
            position: node.position,
            timestamp_ms: state.clock_ms,
        };
        log::info!(
            "Supernova {} at node {:?} consumed {:?}",
            event.id,
            event.node,
            event.particles
        );
        state
            .deferred
            .schedule(due, DeferredTask::ReplacementSpawn { supernova: event.id });
        report.supernovae.push(event.id);
        state.supernovae.publish(event);
    }

    state.particles.retain(|p| !doomed.contains(&p.id));
}

/// Keep an energetic but sparse field from idling: one spawn per tick
fn stabilize_population(state: &mut FieldState, grid: &NodeGrid) -> Option<ParticleId> {
    let mean = state.mean_amplitude()?;
    if mean >= STABILIZE_MEAN_AMPLITUDE && state.population() < STABILIZE_POPULATION {
        log::debug!("Stabilizing: mean amplitude {:.2} with {} particles", mean, state.population());
        return spawn_particle(state, grid, None);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::sim::particle::Particle;
    use proptest::prelude::*;

    /// Reference config without random drift, so scenarios hold still
    fn still_config() -> FieldConfig {
        FieldConfig {
            drift_magnitude: 0.0,
            ..FieldConfig::default()
        }
    }

    fn setup(config: FieldConfig) -> (FieldState, NodeGrid) {
        let grid = NodeGrid::from_config(&config);
        (FieldState::new(config), grid)
    }

    fn place(state: &mut FieldState, frequency: f32) -> ParticleId {
        let id = state.next_particle_id();
        let particle = Particle::new(id, frequency, &state.config);
        state.particles.push(particle);
        id
    }

    #[test]
    fn test_tick_advances_clock() {
        let (mut state, grid) = setup(FieldConfig::default());
        let report = tick(&mut state, &grid);
        assert_eq!(report.tick, 1);
        assert_eq!(report.clock_ms, 100);
        tick(&mut state, &grid);
        assert_eq!(state.clock_ms, 200);
        assert_eq!(state.tick_count, 2);
    }

    #[test]
    fn test_empty_field_is_a_no_op() {
        let (mut state, grid) = setup(FieldConfig::default());
        for _ in 0..20 {
            let report = tick(&mut state, &grid);
            assert!(report.collisions.is_empty());
            assert!(report.spawned.is_empty());
            assert_eq!(report.mean_amplitude, None);
        }
        assert_eq!(state.population(), 0);
    }

    #[test]
    fn test_lone_particle_decays_without_collision() {
        let (mut state, grid) = setup(still_config());
        let id = place(&mut state, 196.0);
        state.particles[0].energy_level = 0.15;

        let report = tick(&mut state, &grid);
        assert!(report.collisions.is_empty());
        let p = state.particle(id).unwrap();
        assert!((p.energy_level - 0.148).abs() < 1e-6);
        assert_eq!(p.target_node, grid.nearest(196.0).map(|n| n.id));
    }

    #[test]
    fn test_collision_event_and_monotonic_gains() {
        let (mut state, grid) = setup(still_config());
        let a = place(&mut state, 340.0);
        let b = place(&mut state, 340.0);
        let before = state.particles.clone();

        let report = tick(&mut state, &grid);

        assert_eq!(report.collisions.len(), 1);
        assert_eq!(state.collisions.len(), 1);
        let event = state.collisions.iter().next().unwrap();
        assert_eq!(event.particles, vec![a, b]);
        assert_eq!(event.node, grid.nearest(340.0).unwrap().id);
        assert_eq!(event.position, grid.nearest(340.0).unwrap().position);
        assert_eq!(event.timestamp_ms, 100);

        for prev in &before {
            let now = state.particle(prev.id).unwrap();
            assert!(now.harmonic_factor >= prev.harmonic_factor);
            assert!(now.amplitude >= prev.amplitude);
            assert!(now.energy_level >= prev.energy_level);
        }
    }

    #[test]
    fn test_collision_resonance_math() {
        let (mut state, grid) = setup(still_config());
        place(&mut state, 340.0);
        place(&mut state, 340.0);

        tick(&mut state, &grid);

        // Identical base frequencies resonate fully: 1.0 * 0.4 * 0.8
        let p = &state.particles[0];
        assert!((p.harmonic_factor - 1.32).abs() < 1e-5);
        assert!((p.amplitude - (0.4 + 0.4 * 0.15)).abs() < 1e-5);
        assert!((p.energy_level - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_resonance_weaker_for_distant_identities() {
        let (mut state, grid) = setup(still_config());
        // Same node today, different tuning at birth
        let near = place(&mut state, 340.0);
        let far = place(&mut state, 340.0);
        state.particles[1].base_frequency = 900.0;

        tick(&mut state, &grid);

        let near = state.particle(near).unwrap();
        let far = state.particle(far).unwrap();
        // Both see the same distance, so both gain less than full resonance
        assert!(near.harmonic_factor < 1.32);
        assert!((near.harmonic_factor - far.harmonic_factor).abs() < 1e-6);
    }

    #[test]
    fn test_collision_blends_color() {
        let (mut state, grid) = setup(still_config());
        place(&mut state, 340.0);
        place(&mut state, 340.0);
        state.particles[0].color = Vec3::ZERO;
        state.particles[1].color = Vec3::ONE;

        tick(&mut state, &grid);

        assert!((state.particles[0].color - Vec3::splat(0.15)).length() < 1e-5);
        assert!((state.particles[1].color - Vec3::splat(0.85)).length() < 1e-5);
    }

    #[test]
    fn test_three_way_collision_scales_with_others() {
        let (mut state, grid) = setup(still_config());
        for _ in 0..3 {
            place(&mut state, 340.0);
        }

        let report = tick(&mut state, &grid);

        assert_eq!(report.collisions.len(), 1);
        for p in &state.particles {
            // 0.1 floor + 0.2 * 2 others
            assert!((p.energy_level - 0.5).abs() < 1e-5);
            // 1.0 + 1.0 * 0.4 * (0.6 + 0.4)
            assert!((p.harmonic_factor - 1.4).abs() < 1e-5);
        }
    }

    #[test]
    fn test_supernova_consumes_and_replaces() {
        let (mut state, grid) = setup(still_config());
        let hot = place(&mut state, 340.0);
        let cold = place(&mut state, 340.0);
        state.particles[0].energy_level = 0.85;
        let node = grid.nearest(340.0).unwrap().clone();

        let report = tick(&mut state, &grid);

        assert_eq!(report.supernovae.len(), 1);
        assert!(state.particle(hot).is_none());
        assert!(state.particle(cold).is_none());
        assert_eq!(state.population(), 0);

        let nova = state.supernovae.iter().next().unwrap();
        assert_eq!(nova.position, node.position);
        assert_eq!(nova.node, node.id);
        assert_eq!(nova.particles, vec![hot, cold]);
        assert_eq!(state.deferred.len(), 1);

        // Replacement is decoupled from the tick that exploded
        let mut spawned = Vec::new();
        for _ in 0..10 {
            spawned.extend(tick(&mut state, &grid).spawned);
        }
        assert_eq!(spawned.len(), 1);
        assert_eq!(state.population(), 1);
        assert!(state.deferred.is_empty());
    }

    #[test]
    fn test_replacement_waits_for_delay() {
        let (mut state, grid) = setup(still_config());
        place(&mut state, 340.0);
        place(&mut state, 340.0);
        state.particles[0].energy_level = 0.9;

        tick(&mut state, &grid); // explodes at 100ms, replacement due at 400ms
        assert!(tick(&mut state, &grid).spawned.is_empty()); // 200
        assert!(tick(&mut state, &grid).spawned.is_empty()); // 300
        assert_eq!(tick(&mut state, &grid).spawned.len(), 1); // 400
    }

    #[test]
    fn test_supernova_on_one_node_leaves_others_intact() {
        let (mut state, grid) = setup(still_config());
        place(&mut state, 340.0);
        place(&mut state, 340.0);
        state.particles[0].energy_level = 0.95;
        let a = place(&mut state, 600.0);
        let b = place(&mut state, 600.0);

        let report = tick(&mut state, &grid);

        assert_eq!(report.collisions.len(), 2);
        assert_eq!(report.supernovae.len(), 1);
        assert_eq!(state.population(), 2);
        assert!(state.particle(a).is_some());
        assert!(state.particle(b).is_some());
    }

    #[test]
    fn test_corner_torque_spins_the_field() {
        let corner = {
            let grid = NodeGrid::from_config(&still_config());
            grid.corner_nodes().next().unwrap().clone()
        };

        let (mut on_corner, grid) = setup(still_config());
        place(&mut on_corner, corner.frequency);
        on_corner.particles[0].energy_level = 0.5;
        tick(&mut on_corner, &grid);
        assert_eq!(on_corner.particles[0].target_node, Some(corner.id));

        // Some interior frequencies are shadowed by an earlier corner
        let interior = grid
            .interior_indices()
            .iter()
            .map(|&i| &grid.nodes()[i])
            .find(|n| !grid.nearest(n.frequency).unwrap().is_corner)
            .unwrap();
        let (mut on_interior, _) = setup(still_config());
        place(&mut on_interior, interior.frequency);
        on_interior.particles[0].energy_level = 0.5;
        tick(&mut on_interior, &grid);
        let target = on_interior.particles[0].target_node.unwrap();
        assert!(!grid.node(target).unwrap().is_corner);

        let spun = on_corner.rotation.angular_speed();
        let still = on_interior.rotation.angular_speed();
        assert!(spun > still);
        // torque = |unit| * 0.498 * 0.0005
        assert!((spun - 0.498 * TORQUE_SCALE).abs() < 1e-7);
    }

    #[test]
    fn test_low_energy_corner_adds_no_torque() {
        let (mut state, grid) = setup(still_config());
        let corner = grid.corner_nodes().next().unwrap().frequency;
        place(&mut state, corner);
        tick(&mut state, &grid);
        assert_eq!(state.rotation.angular_speed(), 0.0);
    }

    #[test]
    fn test_rotation_biases_drift() {
        let (mut state, grid) = setup(still_config());
        // Off the lattice diagonal, where the summed cross product vanishes
        let id = place(&mut state, 300.0);
        tick(&mut state, &grid);
        let target = state.particle(id).unwrap().target_node.unwrap();
        let position = grid.node(target).unwrap().position;
        let start = state.particle(id).unwrap().locational_frequency;

        state.rotation.angular_velocity = Vec3::new(0.01, 0.0, 0.0);
        let expected = state.rotation.angular_velocity * ANGULAR_DAMPING;
        let bias = expected.cross(position).element_sum() * CORIOLIS_SCALE;
        tick(&mut state, &grid);

        let moved = state.particle(id).unwrap().locational_frequency - start;
        assert!(bias != 0.0);
        assert!((moved - bias).abs() < 1e-3);
    }

    #[test]
    fn test_stabilization_spawns_into_sparse_energetic_field() {
        let (mut state, grid) = setup(still_config());
        place(&mut state, 250.0);
        state.particles[0].amplitude = 1.0;

        let report = tick(&mut state, &grid);

        assert_eq!(report.spawned.len(), 1);
        assert_eq!(state.population(), 2);
    }

    #[test]
    fn test_no_stabilization_when_calm() {
        let (mut state, grid) = setup(still_config());
        place(&mut state, 250.0);
        let report = tick(&mut state, &grid);
        assert!(report.spawned.is_empty());
        assert_eq!(state.population(), 1);
    }

    #[test]
    fn test_tick_determinism() {
        let run = || {
            let (mut state, grid) = setup(FieldConfig::with_seed(99999));
            for _ in 0..6 {
                spawn_particle(&mut state, &grid, None);
            }
            for _ in 0..300 {
                tick(&mut state, &grid);
            }
            state
        };
        let a = run();
        let b = run();
        assert_eq!(a.particles, b.particles);
        assert_eq!(a.rotation, b.rotation);
        assert_eq!(a.collisions.len(), b.collisions.len());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_bounds_hold_over_many_ticks(
            seed in any::<u64>(),
            initial in 0usize..12,
            drift in 0.0f32..25.0,
            pokes in proptest::collection::vec(
                (any::<bool>(), -20.0f32..20.0, -20.0f32..20.0, -20.0f32..20.0),
                0..40,
            ),
            ticks in 20usize..150,
        ) {
            let config = FieldConfig {
                seed,
                drift_magnitude: drift,
                ..FieldConfig::default()
            };
            let (mut state, grid) = setup(config);
            for _ in 0..initial {
                spawn_particle(&mut state, &grid, None);
                prop_assert!(state.population() <= state.config.max_particles);
            }

            let mut pokes = pokes.into_iter();
            for _ in 0..ticks {
                if let Some((random, x, y, z)) = pokes.next() {
                    let position = (!random).then(|| Vec3::new(x, y, z));
                    spawn_particle(&mut state, &grid, position);
                    prop_assert!(state.population() <= state.config.max_particles);
                }

                tick(&mut state, &grid);

                prop_assert!(state.population() <= state.config.max_particles);
                for p in &state.particles {
                    prop_assert!(
                        p.within_bounds(&state.config),
                        "out of bounds after tick {}: {:?}", state.tick_count, p
                    );
                    let expected = grid.nearest(p.locational_frequency).map(|n| n.id);
                    prop_assert_eq!(p.target_node, expected);
                }
                prop_assert!(state.rotation.angular_velocity.is_finite());
            }
        }
    }
}
