//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the harness is meant to catch:
//!
//! - **Floating-point math**: the tick loop uses
//!   [`tribe_core::math::Fixed`]; floats only appear in terrain generation
//!   and cosmetic animation.
//! - **HashMap iteration order**: units and facilities are kept in
//!   `BTreeMap`s and processed in id order.
//! - **Thread scheduling**: parallel runs must all agree.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tribe_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for tick in 0..ticks {
            step(&mut state, tick);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a [`Simulation`] twice from the same setup and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim, _| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// Returns `None` if the runs agree throughout, `Some(tick)` for the first
/// tick whose hashes differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::debug!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation testing.
pub mod strategies {
    use proptest::prelude::*;
    use tribe_core::factions::FactionId;
    use tribe_core::grid::GridCoord;
    use tribe_core::math::{Fixed, Vec2Fixed};
    use tribe_core::production::FacilityKind;
    use tribe_core::simulation::Simulation;
    use tribe_core::units::UnitKind;

    /// Any anchor a unit can stand on in a default 200×160 grid.
    pub fn arb_anchor() -> impl Strategy<Value = GridCoord> {
        (0i32..199, 0i32..159).prop_map(|(x, y)| GridCoord::new(x, y))
    }

    /// Any integer coordinate, including far outside the grid.
    pub fn arb_any_coord() -> impl Strategy<Value = GridCoord> {
        (-400i32..400, -400i32..400).prop_map(|(x, y)| GridCoord::new(x, y))
    }

    /// A pixel position on the default 800×600 field.
    pub fn arb_pixel() -> impl Strategy<Value = Vec2Fixed> {
        (0i32..800, 0i32..600).prop_map(|(x, y)| Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)))
    }

    /// Any unit kind.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        prop::sample::select(UnitKind::ALL.to_vec())
    }

    /// Either faction.
    pub fn arb_faction() -> impl Strategy<Value = FactionId> {
        prop::sample::select(FactionId::ALL.to_vec())
    }

    /// One unit to place.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UnitPlan {
        /// Kind.
        pub kind: UnitKind,
        /// Side.
        pub faction: FactionId,
        /// Starting anchor.
        pub anchor: GridCoord,
    }

    /// Generate one unit.
    pub fn arb_unit_plan() -> impl Strategy<Value = UnitPlan> {
        (arb_unit_kind(), arb_faction(), arb_anchor())
            .prop_map(|(kind, faction, anchor)| UnitPlan { kind, faction, anchor })
    }

    /// Generate a unit layout.
    pub fn arb_unit_layout(max_units: usize) -> impl Strategy<Value = Vec<UnitPlan>> {
        proptest::collection::vec(arb_unit_plan(), 1..max_units)
    }

    /// Place a layout into a simulation.
    pub fn populate(sim: &mut Simulation, layout: &[UnitPlan]) {
        for plan in layout {
            sim.spawn_unit(plan.kind, plan.faction, plan.anchor);
        }
    }

    /// Player commands the harness can replay.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PlayerCommand {
        /// Box-select between two corners.
        SelectBox(Vec2Fixed, Vec2Fixed),
        /// Move the selection.
        Move(Vec2Fixed),
        /// Stop the selection.
        Stop,
        /// Enter placement and commit at an anchor.
        Place(GridCoord),
        /// Train on the first facility.
        Train(UnitKind),
    }

    /// Generate one command.
    pub fn arb_command() -> impl Strategy<Value = PlayerCommand> {
        prop_oneof![
            (arb_pixel(), arb_pixel()).prop_map(|(a, b)| PlayerCommand::SelectBox(a, b)),
            arb_pixel().prop_map(PlayerCommand::Move),
            Just(PlayerCommand::Stop),
            arb_anchor().prop_map(PlayerCommand::Place),
            arb_unit_kind().prop_map(PlayerCommand::Train),
        ]
    }

    /// Generate a timed command script: `(tick, command)` pairs.
    pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<(u64, PlayerCommand)>> {
        proptest::collection::vec((0u64..200, arb_command()), 0..max_len).prop_map(|mut script| {
            script.sort_by_key(|(tick, _)| *tick);
            script
        })
    }

    /// Apply a command to a simulation.
    pub fn apply(sim: &mut Simulation, command: PlayerCommand) {
        match command {
            PlayerCommand::SelectBox(a, b) => {
                sim.select_in_box(a, b, false);
            }
            PlayerCommand::Move(to) => {
                sim.move_selected(to);
            }
            PlayerCommand::Stop => sim.stop_selected(),
            PlayerCommand::Place(anchor) => {
                let faction = sim
                    .selection()
                    .first()
                    .and_then(|id| sim.unit(id))
                    .map_or(FactionId::Red, |unit| unit.faction);
                if sim.begin_placement(FacilityKind::TrainingFacility) {
                    sim.commit_placement(anchor, faction);
                }
                sim.cancel_placement();
            }
            PlayerCommand::Train(kind) => {
                let first = sim.facilities().next().map(|facility| facility.id);
                if let Some(id) = first {
                    sim.train_unit(id, kind);
                }
            }
        }
    }
}
