//! The turn orchestrator.
//!
//! [`Orchestrator::step`] runs exactly one turn:
//!
//! 1. **Day** -- every agent is asked for a daily action (fast tier, all
//!    requests in flight together). Successful replies are remembered,
//!    classified, and staged as `DAILY_ACTION` events; failed ones skip
//!    that agent for the turn.
//! 2. **Night** -- on the consolidation cadence, every agent consolidates
//!    memory and reflects on it (smart tier), factually or as myth.
//!    Reflections are staged as `REFLECTION` events and remembered as
//!    legends.
//! 3. **Commit** -- all staged events are appended in one transaction.
//! 4. **Detect** -- the epoch detector and chronicle summarizer run, each
//!    with its own commit.
//! 5. **Publish** -- the sandbox snapshot goes to every listener.
//! 6. **Advance** -- the turn counter moves on.
//!
//! `step` never fails. Every failure is logged with the turn and the
//! component, and the counter always advances.

use std::sync::Arc;

use civ_agents::VectorStore;
use civ_db::EventLog;
use civ_llm::{GenerationError, ModelTier, PromptEngine, TextGenerator, is_fallback};
use civ_types::{Epoch, MemoryItem, NewEvent};
use futures::future::join_all;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::chronicle::ChronicleSummarizer;
use crate::clock::{Cadence, ClockError};
use crate::config::SimulationConfig;
use crate::epoch::EpochDetector;
use crate::snapshot::SnapshotListener;
use crate::state::SimulationState;

const DAILY_TEMPERATURE: f32 = 0.9;
const REFLECTION_TEMPERATURE: f32 = 1.1;
const REPLY_MAX_TOKENS: u32 = 120;
/// Importance of a reflection remembered as a legend.
pub const LEGEND_IMPORTANCE: f64 = 0.9;
/// How many consolidated memories a reflection draws on.
const REFLECTION_MEMORIES: usize = 5;
const NOTHING_NOTABLE: &str = "Nothing notable happened.";

/// Turn loop tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnSettings {
    /// When agents consolidate and reflect.
    pub consolidation: Cadence,
    /// When the epoch detector runs.
    pub epochs: Cadence,
    /// When the chronicle summarizer runs.
    pub chronicles: Cadence,
    /// Probability that a reflection is told as myth.
    pub entropy_factor: f64,
    /// Largest per-axis step of the random walk.
    pub walk_step: f64,
}

impl TurnSettings {
    /// Derive settings from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZeroInterval`] if any cadence is zero.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ClockError> {
        Ok(Self {
            consolidation: Cadence::new(
                "consolidation",
                config.simulation.consolidation_interval,
            )?,
            epochs: Cadence::new("epoch", config.detectors.epoch_interval)?,
            chronicles: Cadence::new("chronicle", config.detectors.chronicle_interval)?,
            entropy_factor: config.simulation.entropy_factor.clamp(0.0, 1.0),
            walk_step: config.simulation.walk_step,
        })
    }
}

/// What happened during one turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnSummary {
    /// The turn that ran.
    pub turn: u64,
    /// Agents whose daily action was recorded.
    pub actions_recorded: usize,
    /// Agents skipped because generation failed or returned nothing.
    pub agents_skipped: usize,
    /// Reflections recorded on a consolidation turn.
    pub reflections_recorded: usize,
    /// Whether the turn's events reached the log. `true` when there was
    /// nothing to write.
    pub committed: bool,
    /// The epoch recorded this turn, if any.
    pub epoch: Option<Epoch>,
    /// Sequence id of the chronicle written this turn, if any.
    pub chronicle: Option<i64>,
}

/// Drives the simulation one turn at a time.
pub struct Orchestrator<G, V, L> {
    state: SimulationState<V>,
    generator: Arc<G>,
    log: Arc<L>,
    prompts: Arc<PromptEngine>,
    settings: TurnSettings,
    epochs: EpochDetector<G, L>,
    chronicle: ChronicleSummarizer<G, L>,
    listeners: Vec<Box<dyn SnapshotListener>>,
}

impl<G, V, L> Orchestrator<G, V, L>
where
    G: TextGenerator,
    V: VectorStore,
    L: EventLog,
{
    /// Wire an orchestrator around existing state.
    pub fn new(
        state: SimulationState<V>,
        generator: Arc<G>,
        log: Arc<L>,
        prompts: Arc<PromptEngine>,
        settings: TurnSettings,
    ) -> Self {
        let epochs = EpochDetector::new(
            Arc::clone(&generator),
            Arc::clone(&log),
            Arc::clone(&prompts),
            settings.epochs,
        );
        let chronicle = ChronicleSummarizer::new(
            Arc::clone(&generator),
            Arc::clone(&log),
            Arc::clone(&prompts),
            settings.chronicles,
        );
        Self {
            state,
            generator,
            log,
            prompts,
            settings,
            epochs,
            chronicle,
            listeners: Vec::new(),
        }
    }

    /// Register a snapshot listener.
    pub fn add_listener(&mut self, listener: Box<dyn SnapshotListener>) {
        self.listeners.push(listener);
    }

    /// The turn the next `step` will run.
    pub const fn turn(&self) -> u64 {
        self.state.clock.turn()
    }

    /// The simulation state.
    pub const fn state(&self) -> &SimulationState<V> {
        &self.state
    }

    /// Run one turn.
    pub async fn step(&mut self) -> TurnSummary {
        let turn = self.state.clock.turn();
        let mut summary = TurnSummary {
            turn,
            ..TurnSummary::default()
        };
        let mut staged = Vec::new();

        self.daily_actions(turn, &mut staged, &mut summary).await;
        if self.settings.consolidation.fires_at(turn) {
            self.reflections(turn, &mut staged, &mut summary).await;
        }

        summary.committed = self.commit(turn, &staged).await;
        summary.epoch = self.epochs.check(turn).await;
        summary.chronicle = self.chronicle.check(turn).await;

        self.publish(turn);
        self.state.clock.advance();

        info!(
            turn,
            actions = summary.actions_recorded,
            skipped = summary.agents_skipped,
            reflections = summary.reflections_recorded,
            committed = summary.committed,
            "Turn complete"
        );
        summary
    }

    async fn daily_actions(
        &mut self,
        turn: u64,
        staged: &mut Vec<NewEvent>,
        summary: &mut TurnSummary,
    ) {
        let prompts: Vec<Option<String>> = self
            .state
            .agents
            .iter()
            .map(|agent| match self.prompts.daily(&agent.scenario()) {
                Ok(prompt) => Some(prompt),
                Err(e) => {
                    warn!(
                        component = "orchestrator",
                        turn,
                        agent = %agent.name(),
                        error = %e,
                        "Daily prompt failed"
                    );
                    None
                }
            })
            .collect();

        let generator = &self.generator;
        let replies = join_all(prompts.iter().map(|prompt| async move {
            match prompt {
                Some(prompt) => Some(
                    generator
                        .generate(ModelTier::Fast, prompt, DAILY_TEMPERATURE, REPLY_MAX_TOKENS)
                        .await,
                ),
                None => None,
            }
        }))
        .await;

        let walk_step = self.settings.walk_step;
        for (agent, reply) in self.state.agents.iter_mut().zip(replies) {
            let text = reply.and_then(|reply| usable(reply, turn, agent.name(), "daily action"));
            let Some(text) = text else {
                summary.agents_skipped = summary.agents_skipped.saturating_add(1);
                continue;
            };

            let outcome = agent.record_action(&text, turn, walk_step, &mut self.state.rng);
            debug!(
                turn,
                agent = %agent.name(),
                action = outcome.action.as_str(),
                "Daily action recorded"
            );
            staged.push(NewEvent::daily_action(turn, agent.id(), text));
            summary.actions_recorded = summary.actions_recorded.saturating_add(1);
        }
    }

    async fn reflections(
        &mut self,
        turn: u64,
        staged: &mut Vec<NewEvent>,
        summary: &mut TurnSummary,
    ) {
        for agent in &mut self.state.agents {
            let consolidated = agent.memory_mut().consolidate(turn).await;
            let memories = recall(&consolidated);
            let myth = self.state.rng.random_bool(self.settings.entropy_factor);

            let prompt = match self.prompts.reflection(&memories, myth) {
                Ok(prompt) => prompt,
                Err(e) => {
                    warn!(
                        component = "orchestrator",
                        turn,
                        agent = %agent.name(),
                        error = %e,
                        "Reflection prompt failed"
                    );
                    continue;
                }
            };
            let reply = self
                .generator
                .generate(
                    ModelTier::Smart,
                    &prompt,
                    REFLECTION_TEMPERATURE,
                    REPLY_MAX_TOKENS,
                )
                .await;
            let Some(text) = usable(reply, turn, agent.name(), "reflection") else {
                continue;
            };

            let legend = agent.remember_legend(&text, LEGEND_IMPORTANCE, turn);
            debug!(turn, agent = %agent.name(), myth, "Reflection recorded");
            staged.push(NewEvent::reflection(turn, agent.id(), text, Some(legend)));
            summary.reflections_recorded = summary.reflections_recorded.saturating_add(1);
        }
    }

    async fn commit(&self, turn: u64, staged: &[NewEvent]) -> bool {
        if staged.is_empty() {
            return true;
        }
        match self.log.append_batch(staged).await {
            Ok(ids) => {
                debug!(turn, events = ids.len(), "Turn events committed");
                true
            }
            Err(e) => {
                error!(
                    component = "event_log",
                    turn,
                    events = staged.len(),
                    error = %e,
                    "Turn commit failed, events rolled back"
                );
                false
            }
        }
    }

    fn publish(&mut self, turn: u64) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.state.snapshot(turn);
        for listener in &mut self.listeners {
            if let Err(e) = listener.publish(&snapshot) {
                warn!(component = "snapshot", turn, error = %e, "Snapshot publish failed");
            }
        }
    }
}

/// Trimmed text from a generation reply, or `None` (logged) when the call
/// failed, returned nothing, or carried the fallback marker.
fn usable(
    reply: Result<String, GenerationError>,
    turn: u64,
    agent: &str,
    what: &'static str,
) -> Option<String> {
    match reply {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() || is_fallback(text) {
                warn!(
                    component = "orchestrator",
                    turn,
                    agent,
                    what,
                    "No usable text, skipping agent"
                );
                None
            } else {
                Some(text.to_owned())
            }
        }
        Err(e) => {
            warn!(
                component = "orchestrator",
                turn,
                agent,
                what,
                error = %e,
                "Generation failed, skipping agent"
            );
            None
        }
    }
}

/// The reflection input: the last few consolidated memories.
fn recall(consolidated: &[MemoryItem]) -> String {
    if consolidated.is_empty() {
        return NOTHING_NOTABLE.to_owned();
    }
    let skip = consolidated.len().saturating_sub(REFLECTION_MEMORIES);
    consolidated
        .iter()
        .skip(skip)
        .map(|item| item.content.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
