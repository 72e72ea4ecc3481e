//! Action policies: how an agent frames its day and how acting changes it.
//!
//! The orchestrator asks the policy for a scenario prompt before each daily
//! action and hands the classified result back afterwards so the policy can
//! adjust energy, boredom, and curiosity.

use civ_types::{ActionClassification, ActionLabel, AgentIdentity, AgentState};

/// Strategy for scenario framing and post-action state updates.
pub trait ActionPolicy: Send + Sync {
    /// The scenario text for this agent's next daily action.
    fn scenario(&self, identity: &AgentIdentity, state: &AgentState) -> String;

    /// Update `state` after an action was classified. `state` still holds
    /// the previous turn's display tags when this is called.
    fn after_action(&self, state: &mut AgentState, outcome: &ActionClassification);
}

/// Energy spent on any non-resting action.
const ACTION_COST: f64 = 0.05;
/// Energy recovered by resting.
const REST_GAIN: f64 = 0.3;
/// Boredom gained by repeating the previous action.
const REPEAT_BOREDOM: f64 = 0.1;
/// Boredom shed by doing something different.
const NOVELTY_RELIEF: f64 = 0.2;
/// Curiosity satisfied by a discovery.
const DISCOVERY_SATIATION: f64 = 0.1;
/// Curiosity regrown on every other action.
const CURIOSITY_REGROWTH: f64 = 0.02;

/// Boredom above which the scenario nudges the agent toward novelty.
const RESTLESS_THRESHOLD: f64 = 0.8;
/// Energy below which the scenario mentions exhaustion.
const EXHAUSTED_THRESHOLD: f64 = 0.2;
/// Survival need below which the scenario mentions hunger.
const HUNGRY_THRESHOLD: f64 = 0.3;

/// Default policy: asks "What will <name> do?" and tracks fatigue and
/// boredom.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioPolicy;

impl ActionPolicy for ScenarioPolicy {
    fn scenario(&self, identity: &AgentIdentity, state: &AgentState) -> String {
        let mut scenario = format!("What will {} do?", identity.name);
        if state.needs.survival < HUNGRY_THRESHOLD {
            scenario.push_str(" They are hungry and must find food.");
        }
        if state.energy < EXHAUSTED_THRESHOLD {
            scenario.push_str(" They are exhausted.");
        }
        if state.boredom > RESTLESS_THRESHOLD {
            scenario.push_str(" They are restless and crave something entirely new.");
        }
        scenario
    }

    fn after_action(&self, state: &mut AgentState, outcome: &ActionClassification) {
        state.energy = if outcome.action == ActionLabel::Resting {
            state.energy + REST_GAIN
        } else {
            state.energy - ACTION_COST
        }
        .clamp(0.0, 1.0);

        state.boredom = if outcome.action == state.action {
            state.boredom + REPEAT_BOREDOM
        } else {
            state.boredom - NOVELTY_RELIEF
        }
        .clamp(0.0, 1.0);

        state.curiosity = if outcome.action == ActionLabel::Discovering {
            state.curiosity - DISCOVERY_SATIATION
        } else {
            state.curiosity + CURIOSITY_REGROWTH
        }
        .clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use civ_types::{AgentId, Emotion};

    use super::*;

    fn identity(name: &str) -> AgentIdentity {
        AgentIdentity {
            id: AgentId::new(),
            name: name.to_owned(),
            personality: "Curious pioneer".to_owned(),
            skills: BTreeMap::new(),
        }
    }

    fn outcome(action: ActionLabel) -> ActionClassification {
        ActionClassification {
            emotion: Emotion::Speaking,
            action,
            speech: String::new(),
        }
    }

    #[test]
    fn fresh_agent_gets_plain_scenario() {
        let scenario = ScenarioPolicy.scenario(&identity("Agent-3"), &AgentState::default());
        assert_eq!(scenario, "What will Agent-3 do?");
    }

    #[test]
    fn strained_agent_gets_hints() {
        let state = AgentState {
            energy: 0.1,
            boredom: 0.9,
            ..AgentState::default()
        };
        let scenario = ScenarioPolicy.scenario(&identity("Agent-1"), &state);
        assert!(scenario.starts_with("What will Agent-1 do?"));
        assert!(scenario.contains("exhausted"));
        assert!(scenario.contains("restless"));
    }

    #[test]
    fn acting_costs_energy_and_resting_restores_it() {
        let mut state = AgentState::default();
        ScenarioPolicy.after_action(&mut state, &outcome(ActionLabel::Conversing));
        assert!((state.energy - 0.95).abs() < 1e-9);

        ScenarioPolicy.after_action(&mut state, &outcome(ActionLabel::Resting));
        assert!((state.energy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repetition_breeds_boredom() {
        let mut state = AgentState::default();
        // Default display action is Wandering.
        ScenarioPolicy.after_action(&mut state, &outcome(ActionLabel::Wandering));
        assert!((state.boredom - 0.1).abs() < 1e-9);

        ScenarioPolicy.after_action(&mut state, &outcome(ActionLabel::Thinking));
        assert!(state.boredom.abs() < 1e-9);
    }

    #[test]
    fn state_stays_in_unit_range() {
        let mut state = AgentState::default();
        for _ in 0..100 {
            ScenarioPolicy.after_action(&mut state, &outcome(ActionLabel::Discovering));
        }
        assert!(state.energy >= 0.0 && state.curiosity >= 0.0);
        assert!(state.boredom <= 1.0);
    }
}
