//! The mutable simulation state driven by the orchestrator.

use std::sync::Arc;

use civ_agents::{Agent, Embellish, EntropyTransform, Passthrough, VectorStore};
use civ_types::{AgentId, SandboxSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::TurnClock;
use crate::config::{MemoryConfig, SimulationSection};

/// Everything that changes from turn to turn.
///
/// The orchestrator owns exactly one of these. The clock lives here rather
/// than in any global so that two simulations can run side by side.
pub struct SimulationState<V> {
    /// The turn counter.
    pub clock: TurnClock,
    /// The roster, in a fixed order that is also the processing order.
    pub agents: Vec<Agent<V>>,
    /// Source of all simulation randomness (walks, myth rolls).
    pub rng: StdRng,
}

impl<V: VectorStore> SimulationState<V> {
    /// Assemble state from parts.
    pub const fn new(clock: TurnClock, agents: Vec<Agent<V>>, rng: StdRng) -> Self {
        Self { clock, agents, rng }
    }

    /// Spawn `num_agents` agents named `Agent-0`, `Agent-1`, ... sharing one
    /// vector store. The RNG is seeded from `simulation.seed` when set, and
    /// agent ids are derived from the seed and name so they survive restarts.
    pub fn populate(
        clock: TurnClock,
        simulation: &SimulationSection,
        memory: &MemoryConfig,
        store: &Arc<V>,
    ) -> Self {
        let mut rng = simulation
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        let agents = (0..simulation.num_agents)
            .map(|i| {
                let entropy: Box<dyn EntropyTransform> = if memory.embellish_chance > 0.0 {
                    Box::new(Embellish::seeded(memory.embellish_chance, rng.random()))
                } else {
                    Box::new(Passthrough)
                };
                let name = format!("Agent-{i}");
                Agent::spawn(
                    AgentId::derived(simulation.seed, &name),
                    name,
                    simulation.personality.clone(),
                    Arc::clone(store),
                    entropy,
                    &mut rng,
                )
            })
            .collect();

        Self::new(clock, agents, rng)
    }

    /// The sandbox view for `turn`.
    pub fn snapshot(&self, turn: u64) -> SandboxSnapshot {
        SandboxSnapshot {
            turn,
            agents: self.agents.iter().map(Agent::view).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use civ_agents::{HashingEmbedder, InMemoryVectorStore};

    use super::*;

    #[test]
    fn populate_names_agents_in_order() {
        let store = Arc::new(InMemoryVectorStore::new(HashingEmbedder::default()));
        let simulation = SimulationSection {
            num_agents: 3,
            seed: Some(7),
            ..SimulationSection::default()
        };
        let state = SimulationState::populate(
            TurnClock::starting_at(4),
            &simulation,
            &MemoryConfig::default(),
            &store,
        );

        let names: Vec<&str> = state.agents.iter().map(Agent::name).collect();
        assert_eq!(names, vec!["Agent-0", "Agent-1", "Agent-2"]);
        assert_eq!(state.clock.turn(), 4);

        let snapshot = state.snapshot(4);
        assert_eq!(snapshot.turn, 4);
        assert_eq!(snapshot.agents.len(), 3);
        assert!(snapshot.agents.iter().all(|a| a.action == "Wandering"));
    }

    #[test]
    fn seeded_population_is_reproducible() {
        let store = Arc::new(InMemoryVectorStore::new(HashingEmbedder::default()));
        let simulation = SimulationSection {
            num_agents: 2,
            seed: Some(99),
            ..SimulationSection::default()
        };
        let memory = MemoryConfig::default();
        let a = SimulationState::populate(TurnClock::default(), &simulation, &memory, &store);
        let b = SimulationState::populate(TurnClock::default(), &simulation, &memory, &store);
        let positions = |s: &SimulationState<_>| -> Vec<(f64, f64)> {
            s.agents
                .iter()
                .map(|agent| (agent.state().position.x, agent.state().position.y))
                .collect()
        };
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn agent_ids_survive_a_restart() {
        let store = Arc::new(InMemoryVectorStore::new(HashingEmbedder::default()));
        let simulation = SimulationSection {
            num_agents: 3,
            seed: None,
            ..SimulationSection::default()
        };
        let memory = MemoryConfig::default();
        let ids = |s: &SimulationState<_>| -> Vec<AgentId> {
            s.agents.iter().map(Agent::id).collect()
        };

        let before = SimulationState::populate(TurnClock::default(), &simulation, &memory, &store);
        let after =
            SimulationState::populate(TurnClock::starting_at(40), &simulation, &memory, &store);
        assert_eq!(ids(&before), ids(&after));
        assert_eq!(
            ids(&before).get(1).copied(),
            Some(AgentId::derived(None, "Agent-1"))
        );
        assert_ne!(ids(&before).first(), ids(&before).get(1));
    }
}
