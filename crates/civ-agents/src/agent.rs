//! Agent creation and per-action state transitions.
//!
//! An [`Agent`] couples an immutable [`AgentIdentity`] with mutable
//! [`AgentState`], exactly one [`TieredMemory`], and an [`ActionPolicy`].
//! The orchestrator drives it: ask for a scenario, generate text, then hand
//! the text back through [`Agent::record_action`].

use std::collections::BTreeMap;
use std::sync::Arc;

use civ_types::{
    ActionClassification, AgentId, AgentIdentity, AgentState, AgentView, COORD_MAX, COORD_MIN,
    MemoryId, Position,
};
use rand::Rng;

use crate::classifier::classify;
use crate::entropy::EntropyTransform;
use crate::memory::TieredMemory;
use crate::policy::{ActionPolicy, ScenarioPolicy};
use crate::vector::VectorStore;

/// Importance given to a freshly recorded daily action.
pub const DAILY_ACTION_IMPORTANCE: f64 = 0.5;

/// Skills every new agent starts with, all at novice level.
const STARTING_SKILLS: &[&str] = &["gathering", "crafting", "storytelling"];
const NOVICE_SKILL: f64 = 0.1;

/// A simulated villager.
pub struct Agent<V> {
    identity: AgentIdentity,
    state: AgentState,
    memory: TieredMemory<V>,
    policy: Box<dyn ActionPolicy>,
}

impl<V: VectorStore> Agent<V> {
    /// Assemble an agent from parts.
    pub fn new(
        identity: AgentIdentity,
        state: AgentState,
        memory: TieredMemory<V>,
        policy: Box<dyn ActionPolicy>,
    ) -> Self {
        Self {
            identity,
            state,
            memory,
            policy,
        }
    }

    /// Create a fresh agent with default state and policy, placed at a
    /// random point in the sandbox.
    pub fn spawn<R: Rng>(
        id: AgentId,
        name: impl Into<String>,
        personality: impl Into<String>,
        store: Arc<V>,
        entropy: Box<dyn EntropyTransform>,
        rng: &mut R,
    ) -> Self {
        let identity = AgentIdentity {
            id,
            name: name.into(),
            personality: personality.into(),
            skills: STARTING_SKILLS
                .iter()
                .map(|skill| ((*skill).to_owned(), NOVICE_SKILL))
                .collect::<BTreeMap<_, _>>(),
        };
        let state = AgentState {
            position: Position::new(
                rng.random_range(COORD_MIN..=COORD_MAX),
                rng.random_range(COORD_MIN..=COORD_MAX),
            ),
            ..AgentState::default()
        };
        Self::new(
            identity,
            state,
            TieredMemory::with_entropy(id, store, entropy),
            Box::new(ScenarioPolicy),
        )
    }

    /// Stable id.
    pub const fn id(&self) -> AgentId {
        self.identity.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Immutable identity.
    pub const fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Current runtime state.
    pub const fn state(&self) -> &AgentState {
        &self.state
    }

    /// This agent's memory.
    pub const fn memory(&self) -> &TieredMemory<V> {
        &self.memory
    }

    /// This agent's memory, mutably.
    pub const fn memory_mut(&mut self) -> &mut TieredMemory<V> {
        &mut self.memory
    }

    /// The scenario prompt for the next daily action.
    pub fn scenario(&self) -> String {
        self.policy.scenario(&self.identity, &self.state)
    }

    /// Fold a successful daily action into the agent.
    ///
    /// Buffers the text as a memory, classifies it, lets the policy update
    /// energy and boredom, refreshes the displayed tags, and moves the agent
    /// by a random step of at most `walk_step` on each axis.
    pub fn record_action<R: Rng>(
        &mut self,
        text: &str,
        turn: u64,
        walk_step: f64,
        rng: &mut R,
    ) -> ActionClassification {
        self.memory.add(text, DAILY_ACTION_IMPORTANCE, turn);

        let outcome = classify(text);
        self.policy.after_action(&mut self.state, &outcome);

        self.state.emotion = outcome.emotion;
        self.state.action = outcome.action;
        self.state.speech.clone_from(&outcome.speech);
        self.wander(walk_step, rng);

        outcome
    }

    /// Buffer a reflection as a high-importance legend and return its id.
    pub fn remember_legend(&mut self, reflection: &str, importance: f64, turn: u64) -> MemoryId {
        self.memory.add(format!("[LEGEND] {reflection}"), importance, turn)
    }

    /// The agent as shown in the sandbox view.
    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.identity.id,
            name: self.identity.name.clone(),
            x: self.state.position.x,
            y: self.state.position.y,
            emotion: self.state.emotion.glyph().to_owned(),
            action: self.state.action.as_str().to_owned(),
            speech: self.state.speech.clone(),
        }
    }

    fn wander<R: Rng>(&mut self, walk_step: f64, rng: &mut R) {
        if walk_step <= 0.0 || !walk_step.is_finite() {
            return;
        }
        let dx = rng.random_range(-walk_step..=walk_step);
        let dy = rng.random_range(-walk_step..=walk_step);
        self.state.position = self.state.position.offset(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use civ_types::{ActionLabel, Emotion};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::entropy::Passthrough;
    use crate::vector::{HashingEmbedder, InMemoryVectorStore};

    type Store = InMemoryVectorStore<HashingEmbedder>;

    fn agent(rng: &mut SmallRng) -> Agent<Store> {
        let store = Arc::new(InMemoryVectorStore::new(HashingEmbedder::default()));
        Agent::spawn(
            AgentId::derived(None, "Agent-0"),
            "Agent-0",
            "Curious pioneer",
            store,
            Box::new(Passthrough),
            rng,
        )
    }

    #[test]
    fn spawn_sets_identity_and_defaults() {
        let mut rng = SmallRng::seed_from_u64(42);
        let agent = agent(&mut rng);
        assert_eq!(agent.name(), "Agent-0");
        assert_eq!(agent.identity().personality, "Curious pioneer");
        assert_eq!(agent.identity().skills.len(), 3);
        let pos = agent.state().position;
        assert!((COORD_MIN..=COORD_MAX).contains(&pos.x));
        assert!((COORD_MIN..=COORD_MAX).contains(&pos.y));
        assert_eq!(agent.scenario(), "What will Agent-0 do?");
    }

    #[test]
    fn record_action_updates_memory_display_and_position() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut agent = agent(&mut rng);
        let before = agent.state().position;

        let outcome = agent.record_action("I discovered a cave. It was dark.", 3, 5.0, &mut rng);
        assert_eq!(outcome.action, ActionLabel::Discovering);
        assert_eq!(agent.state().emotion, Emotion::Inspired);
        assert_eq!(agent.state().speech, "I discovered a cave...");

        let buffered = agent.memory().short_term();
        assert_eq!(buffered.len(), 1);
        assert!(buffered.first().is_some_and(|m| m.timestamp == 3
            && (m.importance - DAILY_ACTION_IMPORTANCE).abs() < 1e-9));

        let after = agent.state().position;
        assert!((after.x - before.x).abs() <= 5.0 + 1e-9);
        assert!((after.y - before.y).abs() <= 5.0 + 1e-9);
    }

    #[test]
    fn walk_stays_inside_sandbox() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut agent = agent(&mut rng);
        for turn in 0..500 {
            agent.record_action("Wandered far", turn, 40.0, &mut rng);
            let pos = agent.state().position;
            assert!((COORD_MIN..=COORD_MAX).contains(&pos.x));
            assert!((COORD_MIN..=COORD_MAX).contains(&pos.y));
        }
    }

    #[test]
    fn legend_is_prefixed() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut agent = agent(&mut rng);
        let id = agent.remember_legend("The river spoke.", 0.9, 10);
        let item = agent.memory().short_term().first();
        assert_eq!(item.map(|m| m.id), Some(id));
        assert_eq!(item.map(|m| m.content.as_str()), Some("[LEGEND] The river spoke."));
    }

    #[test]
    fn view_uses_glyphs_and_labels() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut agent = agent(&mut rng);
        agent.record_action("Rested", 0, 0.0, &mut rng);
        let view = agent.view();
        assert_eq!(view.emotion, "\u{1F4A4}");
        assert_eq!(view.action, "Resting");
        assert_eq!(view.speech, "Rested");
    }
}
