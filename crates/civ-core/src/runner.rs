//! Simulation loop runner with operator controls.
//!
//! [`run_simulation`] drives [`Orchestrator::step`] until the turn limit is
//! reached or a stop is requested, sleeping the turn interval in between.
//! Stops are only observed between turns.

use std::sync::Arc;

use civ_agents::VectorStore;
use civ_db::EventLog;
use civ_llm::TextGenerator;
use tracing::{info, warn};

use crate::operator::{OperatorState, SimulationEndReason};
use crate::orchestrator::{Orchestrator, TurnSummary};

/// Result of a simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last turn summary, if any turn ran.
    pub final_summary: Option<TurnSummary>,
    /// Turns executed by this run.
    pub total_turns: u64,
}

/// Run turns until a termination condition is met.
pub async fn run_simulation<G, V, L>(
    orchestrator: &mut Orchestrator<G, V, L>,
    operator: &Arc<OperatorState>,
) -> SimulationResult
where
    G: TextGenerator,
    V: VectorStore,
    L: EventLog,
{
    let mut last_summary: Option<TurnSummary> = None;
    let mut total_turns: u64 = 0;

    info!(
        start_turn = orchestrator.turn(),
        max_turns = operator.max_turns(),
        turn_interval = ?operator.turn_interval(),
        "Simulation starting"
    );

    loop {
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            return SimulationResult {
                end_reason: SimulationEndReason::OperatorStop,
                final_summary: last_summary,
                total_turns,
            };
        }

        let summary = orchestrator.step().await;
        total_turns = total_turns.saturating_add(1);

        if operator.turn_limit_reached(total_turns) {
            info!(
                turn = summary.turn,
                max_turns = operator.max_turns(),
                "Turn limit reached"
            );
            return SimulationResult {
                end_reason: SimulationEndReason::MaxTurnsReached,
                final_summary: Some(summary),
                total_turns,
            };
        }
        last_summary = Some(summary);

        operator.pause_between_turns().await;
    }
}

/// Log how a run ended.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_turns = result.total_turns,
        final_turn = result.final_summary.as_ref().map(|s| s.turn),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            turn = summary.turn,
            actions = summary.actions_recorded,
            committed = summary.committed,
            "Final turn summary"
        );
    } else {
        warn!("Simulation ended with no turns executed");
    }
}
