//! Facilities: construction and unit training.
//!
//! A [`Facility`] is placed in the constructing state and advances one
//! tick of construction for every simulation tick in which at least one of
//! its assigned builders stands within build range of its centre. Once
//! complete it trains queued units one at a time, charging the ledger when
//! each job starts, and asks the simulation to spawn the finished unit
//! just south of its footprint.
//!
//! Facility kinds share one type and differ only in their
//! [`FacilityProfile`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{FacilityProfile, Roster, UnitRoster};
use crate::economy::Ledger;
use crate::error::{GameError, Result};
use crate::factions::FactionId;
use crate::grid::{GridCoord, SpatialGrid};
use crate::math::Fixed;
use crate::units::{UnitId, UnitKind};

/// Search radius used when the spawn cell is blocked.
pub const SPAWN_SEARCH_RADIUS: i32 = 5;

/// Stable facility identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FacilityId(pub u32);

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of facility that can be placed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    /// Trains any unit kind.
    #[default]
    TrainingFacility,
    /// Trains hunters.
    HuntersLodge,
}

impl FacilityKind {
    /// Every kind.
    pub const ALL: [Self; 2] = [Self::TrainingFacility, Self::HuntersLodge];

    /// Snake-case name as used in scenarios and commands.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TrainingFacility => "training_facility",
            Self::HuntersLodge => "hunters_lodge",
        }
    }

    /// Parse a kind name, ignoring ASCII case.
    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| GameError::UnknownFacilityKind(name.to_string()))
    }
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityState {
    /// Laid out but never started. Neither builds nor trains until a
    /// builder is assigned.
    Idle,
    /// Waiting for builders.
    Constructing,
    /// Ready to train.
    Complete,
}

/// A unit being trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJob {
    /// Kind being trained.
    pub kind: UnitKind,
    /// Tick the job started on.
    pub started_tick: u64,
    /// Ticks elapsed since the job started.
    pub elapsed: u64,
}

/// A builder as seen by the facility phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderPresence {
    /// Cell derived from the builder's pixel position.
    pub cell: GridCoord,
    /// Build range in cells.
    pub range: i32,
    /// Whether the builder still has health.
    pub alive: bool,
}

/// Builder snapshot handed to [`Facility::update`].
#[derive(Debug, Clone, Copy)]
pub struct BuilderLookup<'a> {
    builders: &'a [(UnitId, BuilderPresence)],
}

impl<'a> BuilderLookup<'a> {
    /// Wrap a slice sorted by id.
    #[must_use]
    pub fn new(builders: &'a [(UnitId, BuilderPresence)]) -> Self {
        Self { builders }
    }

    /// Look up a builder by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<BuilderPresence> {
        self.builders
            .binary_search_by_key(&id, |(builder, _)| *builder)
            .ok()
            .map(|index| self.builders[index].1)
    }
}

/// Everything a facility reads or charges during its tick.
pub struct FacilityContext<'a> {
    /// Current simulation tick.
    pub tick: u64,
    /// Builder snapshot.
    pub builders: BuilderLookup<'a>,
    /// Occupancy, for choosing spawn cells.
    pub grid: &'a SpatialGrid,
    /// The session ledger.
    pub ledger: &'a mut Ledger,
    /// Unit stats, for training costs.
    pub roster: &'a UnitRoster,
}

/// Something that happened to a facility during its tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductionEvent {
    /// Construction finished; every listed builder was released.
    ConstructionComplete {
        /// The facility.
        facility: FacilityId,
        /// Builders whose assignment must be cleared.
        released: Vec<UnitId>,
    },
    /// A queued job started and its cost was withdrawn.
    TrainingStarted {
        /// The facility.
        facility: FacilityId,
        /// Kind being trained.
        kind: UnitKind,
        /// Gems withdrawn.
        cost: u32,
    },
    /// A finished unit should appear at `anchor`.
    UnitReady {
        /// The facility.
        facility: FacilityId,
        /// Kind to create.
        kind: UnitKind,
        /// Owning side.
        faction: FactionId,
        /// Free anchor to spawn at.
        anchor: GridCoord,
    },
    /// A finished unit had nowhere to stand and was discarded.
    SpawnBlocked {
        /// The facility.
        facility: FacilityId,
        /// Kind that was lost.
        kind: UnitKind,
    },
}

/// A placed facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    /// Identifier.
    pub id: FacilityId,
    /// Kind.
    pub kind: FacilityKind,
    /// Owning side.
    pub faction: FactionId,
    /// Top-left cell of the footprint.
    pub anchor: GridCoord,
    /// Footprint side length in cells.
    pub size: i32,
    /// Player selection flag.
    pub selected: bool,
    state: FacilityState,
    construction_elapsed: u64,
    construction_total: u64,
    training_total: u64,
    roster: Roster,
    queue: VecDeque<UnitKind>,
    job: Option<TrainingJob>,
    builders: Vec<UnitId>,
}

impl Facility {
    /// Create a facility awaiting construction.
    ///
    /// `construction_ticks` and `training_ticks` are clamped to at least one.
    #[must_use]
    pub fn new(
        id: FacilityId,
        kind: FacilityKind,
        faction: FactionId,
        anchor: GridCoord,
        profile: &FacilityProfile,
        construction_ticks: u64,
        training_ticks: u64,
    ) -> Self {
        Self {
            id,
            kind,
            faction,
            anchor,
            size: profile.size.max(1),
            selected: false,
            state: FacilityState::Constructing,
            construction_elapsed: 0,
            construction_total: construction_ticks.max(1),
            training_total: training_ticks.max(1),
            roster: profile.roster.clone(),
            queue: VecDeque::new(),
            job: None,
            builders: Vec::new(),
        }
    }

    /// Mark construction finished.
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.construction_elapsed = self.construction_total;
        self.state = FacilityState::Complete;
        self
    }

    /// Put the facility into `state`. `Complete` finishes construction.
    #[must_use]
    pub fn with_state(mut self, state: FacilityState) -> Self {
        match state {
            FacilityState::Complete => self.completed(),
            FacilityState::Idle | FacilityState::Constructing => {
                self.state = state;
                self
            }
        }
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> FacilityState {
        self.state
    }

    /// True once construction has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == FacilityState::Complete
    }

    /// Construction progress in `[0, 1]`.
    #[must_use]
    pub fn construction_progress(&self) -> Fixed {
        ratio(self.construction_elapsed, self.construction_total)
    }

    /// Ticks of construction still needed.
    #[must_use]
    pub const fn construction_remaining(&self) -> u64 {
        self.construction_total.saturating_sub(self.construction_elapsed)
    }

    /// Progress of the current job in `[0, 1]`, zero when idle.
    #[must_use]
    pub fn training_progress(&self) -> Fixed {
        self.job
            .map_or(Fixed::ZERO, |job| ratio(job.elapsed, self.training_total))
    }

    /// The job in progress.
    #[must_use]
    pub const fn current_job(&self) -> Option<&TrainingJob> {
        self.job.as_ref()
    }

    /// Waiting jobs, front first.
    #[must_use]
    pub fn queue(&self) -> &VecDeque<UnitKind> {
        &self.queue
    }

    /// Number of waiting jobs.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Trainable kinds.
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Assigned builders.
    #[must_use]
    pub fn builders(&self) -> &[UnitId] {
        &self.builders
    }

    /// Cell builders gather around: `anchor + size / 2` on both axes.
    #[must_use]
    pub const fn center(&self) -> GridCoord {
        self.anchor.offset(self.size / 2, self.size / 2)
    }

    /// Preferred spawn anchor, centred just below the footprint.
    #[must_use]
    pub const fn spawn_point(&self) -> GridCoord {
        self.anchor.offset(self.size / 2, self.size)
    }

    /// Cell a walking builder heads for.
    #[must_use]
    pub const fn approach_point(&self) -> GridCoord {
        self.spawn_point()
    }

    /// True when `cell` lies inside the footprint.
    #[must_use]
    pub const fn covers(&self, cell: GridCoord) -> bool {
        cell.x >= self.anchor.x
            && cell.y >= self.anchor.y
            && cell.x < self.anchor.x + self.size
            && cell.y < self.anchor.y + self.size
    }

    /// True when a square footprint at `anchor` with side `size` would
    /// share a cell with this one.
    #[must_use]
    pub const fn overlaps(&self, anchor: GridCoord, size: i32) -> bool {
        anchor.x < self.anchor.x + self.size
            && self.anchor.x < anchor.x + size
            && anchor.y < self.anchor.y + self.size
            && self.anchor.y < anchor.y + size
    }

    /// Assign a builder. Repeated assignment is ignored. An idle site
    /// starts constructing.
    pub fn assign_builder(&mut self, id: UnitId) {
        if self.state == FacilityState::Idle {
            self.state = FacilityState::Constructing;
        }
        if !self.builders.contains(&id) {
            self.builders.push(id);
        }
    }

    /// Drop a builder from the assignment list.
    pub fn release_builder(&mut self, id: UnitId) {
        self.builders.retain(|builder| *builder != id);
    }

    /// Is `kind` trainable here and affordable from `balance`?
    #[must_use]
    pub fn can_train(&self, kind: UnitKind, cost: u32, balance: u32) -> bool {
        self.roster.allows(kind) && balance >= cost
    }

    /// Queue a job if [`Facility::can_train`] allows it.
    ///
    /// Nothing is withdrawn here; the cost is charged when the job starts.
    pub fn queue_training(&mut self, kind: UnitKind, cost: u32, balance: u32) -> bool {
        if !self.can_train(kind, cost, balance) {
            return false;
        }
        self.queue.push_back(kind);
        true
    }

    /// Run one tick of construction or training.
    pub fn update(&mut self, ctx: &mut FacilityContext<'_>) -> Vec<ProductionEvent> {
        let mut events = Vec::new();

        match self.state {
            FacilityState::Idle => {}
            FacilityState::Constructing => self.advance_construction(ctx, &mut events),
            FacilityState::Complete => self.advance_training(ctx, &mut events),
        }

        events
    }

    fn advance_construction(&mut self, ctx: &FacilityContext<'_>, events: &mut Vec<ProductionEvent>) {
        let center = self.center();
        let working = self
            .builders
            .iter()
            .filter_map(|id| ctx.builders.get(*id))
            .filter(|builder| builder.alive && within(builder.cell, center, builder.range))
            .count();

        if working == 0 {
            return;
        }

        self.construction_elapsed = (self.construction_elapsed + 1).min(self.construction_total);
        if self.construction_elapsed < self.construction_total {
            return;
        }

        self.state = FacilityState::Complete;
        let released = std::mem::take(&mut self.builders);
        tracing::debug!(
            facility = %self.id,
            kind = %self.kind,
            tick = ctx.tick,
            "Construction complete"
        );
        events.push(ProductionEvent::ConstructionComplete {
            facility: self.id,
            released,
        });
    }

    fn advance_training(&mut self, ctx: &mut FacilityContext<'_>, events: &mut Vec<ProductionEvent>) {
        if self.job.is_none() {
            if let Some(&kind) = self.queue.front() {
                let cost = ctx.roster.get(kind).cost;
                if ctx.ledger.withdraw(cost) {
                    self.queue.pop_front();
                    self.job = Some(TrainingJob {
                        kind,
                        started_tick: ctx.tick,
                        elapsed: 0,
                    });
                    tracing::debug!(facility = %self.id, %kind, cost, "Training started");
                    events.push(ProductionEvent::TrainingStarted {
                        facility: self.id,
                        kind,
                        cost,
                    });
                }
            }
        }

        let Some(job) = self.job.as_mut() else {
            return;
        };
        job.elapsed = ctx.tick.saturating_sub(job.started_tick);
        if job.elapsed < self.training_total {
            return;
        }

        let kind = job.kind;
        self.job = None;

        let preferred = self.spawn_point();
        let anchor = if ctx.grid.is_occupied(preferred, None) {
            ctx.grid
                .find_nearest_free(preferred, None, SPAWN_SEARCH_RADIUS)
        } else {
            Some(preferred)
        };

        match anchor {
            Some(anchor) => events.push(ProductionEvent::UnitReady {
                facility: self.id,
                kind,
                faction: self.faction,
                anchor,
            }),
            None => {
                tracing::debug!(facility = %self.id, %kind, "No room to spawn trained unit");
                events.push(ProductionEvent::SpawnBlocked {
                    facility: self.id,
                    kind,
                });
            }
        }
    }
}

/// True when `cell` is within `range` cells (Euclidean) of `center`.
#[must_use]
pub fn within(cell: GridCoord, center: GridCoord, range: i32) -> bool {
    let dx = i64::from(cell.x - center.x);
    let dy = i64::from(cell.y - center.y);
    let range = i64::from(range.max(0));
    dx * dx + dy * dy <= range * range
}

fn ratio(elapsed: u64, total: u64) -> Fixed {
    if total == 0 || elapsed >= total {
        return Fixed::ONE;
    }
    Fixed::from_num(elapsed) / Fixed::from_num(total)
}
