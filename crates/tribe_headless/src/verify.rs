//! Batch runs of a scenario: summaries and determinism checks.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use tribe_core::factions::FactionId;
use tribe_core::production::ProductionEvent;

use crate::scenario::{Scenario, ScenarioError};

/// What happened over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Stones thrown.
    pub shots: usize,
    /// Stones that hit.
    pub hits: usize,
    /// Units that died.
    pub deaths: usize,
    /// Units trained.
    pub trained: usize,
    /// Facilities finished.
    pub constructed: usize,
    /// Red units alive at the end.
    pub red_alive: usize,
    /// Blue units alive at the end.
    pub blue_alive: usize,
    /// Gems left.
    pub gems: u32,
    /// Final state hash.
    pub final_hash: u64,
}

/// Play a scenario for `ticks` ticks without input.
pub fn run_scenario(scenario: &Scenario, ticks: u64) -> Result<RunSummary, ScenarioError> {
    let mut sim = scenario.build()?;
    let mut summary = RunSummary {
        ticks,
        ..RunSummary::default()
    };

    for _ in 0..ticks {
        let events = sim.tick();
        summary.shots += events.shots.len();
        summary.hits += events.hits.len();
        summary.deaths += events.deaths.len();
        summary.trained += events.spawned.len();
        summary.constructed += events
            .production
            .iter()
            .filter(|event| matches!(event, ProductionEvent::ConstructionComplete { .. }))
            .count();
    }

    summary.red_alive = sim.units().filter(|unit| unit.faction == FactionId::Red).count();
    summary.blue_alive = sim.units().filter(|unit| unit.faction == FactionId::Blue).count();
    summary.gems = sim.gems();
    summary.final_hash = sim.state_hash();
    Ok(summary)
}

/// Outcome of running the same scenario several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismReport {
    /// Final hash of every run, in run order.
    pub hashes: Vec<u64>,
}

impl DeterminismReport {
    /// True when every run ended on the same hash.
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|pair| pair[0] == pair[1])
    }
}

/// Run `runs` copies of a scenario in parallel and collect their hashes.
pub fn verify_determinism(
    scenario: &Scenario,
    ticks: u64,
    runs: u32,
) -> Result<DeterminismReport, ScenarioError> {
    let hashes = (0..runs.max(1))
        .into_par_iter()
        .map(|run| -> Result<u64, ScenarioError> {
            let summary = run_scenario(scenario, ticks)?;
            tracing::debug!(run, hash = %format!("{:016x}", summary.final_hash), "Run finished");
            Ok(summary.final_hash)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DeterminismReport { hashes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_is_quiet() {
        let summary = run_scenario(&Scenario::default_map(), 300).unwrap();
        assert_eq!(summary.ticks, 300);
        assert_eq!(summary.shots, 0);
        assert_eq!(summary.red_alive, 4);
        assert_eq!(summary.blue_alive, 4);
        assert_eq!(summary.gems, 45);
    }

    #[test]
    fn test_default_map_is_deterministic() {
        let report = verify_determinism(&Scenario::default_map(), 120, 4).unwrap();
        assert_eq!(report.hashes.len(), 4);
        assert!(report.is_deterministic());
    }

    #[test]
    fn test_report_detects_mismatch() {
        let report = DeterminismReport {
            hashes: vec![1, 1, 2],
        };
        assert!(!report.is_deterministic());
    }

    #[test]
    fn test_invalid_scenario_propagates() {
        let scenario = Scenario::from_ron_str("(config: (grid_width: 1))").unwrap();
        assert!(verify_determinism(&scenario, 10, 2).is_err());
    }
}
