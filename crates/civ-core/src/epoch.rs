//! Epoch detection: naming the eras of the village's history.
//!
//! Every `epoch_interval` turns the detector reads the reflections from the
//! trailing window. If there were any, and no epoch already starts inside
//! the window, it asks the smart tier to name the era and to write an art
//! prompt for it, then records the epoch together with an `EPOCH` event in
//! one transaction. Epoch starts therefore strictly increase.

use std::sync::Arc;

use civ_db::{DbError, EventLog, EventQuery};
use civ_llm::{ModelTier, PromptEngine, TextGenerator};
use civ_types::{Epoch, EventKind, NewEpoch, NewEvent};
use tracing::{debug, info, warn};

use crate::clock::Cadence;

/// How many reflections feed the era digest.
const DIGEST_REFLECTIONS: usize = 10;
/// Longest era name kept, in characters.
pub const ERA_NAME_MAX_CHARS: usize = 100;
const ERA_TEMPERATURE: f32 = 0.3;
const ERA_MAX_TOKENS: u32 = 80;
const QUOTES: &[char] = &['"', '\''];

/// Turn raw model output into a one-line era name, or the default name for
/// the window starting at `since` when nothing usable is left.
pub fn sanitize_era_name(raw: &str, since: u64) -> String {
    let name: String = raw
        .trim()
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(QUOTES)
        .chars()
        .take(ERA_NAME_MAX_CHARS)
        .collect();
    let name = name.trim();
    if name.is_empty() {
        default_era_name(since)
    } else {
        name.to_owned()
    }
}

/// The name used when the model gives none.
pub fn default_era_name(since: u64) -> String {
    format!("The Era of Turn {since}")
}

/// The art prompt used when the model gives none.
pub fn default_art_prompt(era: &str) -> String {
    format!(
        "A cinematic representation of the {era} era, ancient civilization style, \
         hyper-realistic --ar 16:9"
    )
}

/// Detects and records epochs on a fixed cadence.
pub struct EpochDetector<G, L> {
    generator: Arc<G>,
    log: Arc<L>,
    prompts: Arc<PromptEngine>,
    cadence: Cadence,
}

impl<G: TextGenerator, L: EventLog> EpochDetector<G, L> {
    /// Create a detector that runs every `cadence` turns.
    pub const fn new(
        generator: Arc<G>,
        log: Arc<L>,
        prompts: Arc<PromptEngine>,
        cadence: Cadence,
    ) -> Self {
        Self {
            generator,
            log,
            prompts,
            cadence,
        }
    }

    /// Run the detector for `turn`. Returns the epoch recorded, if any.
    ///
    /// Off-cadence turns, empty windows, and already-covered windows are
    /// silent no-ops. Store errors are logged and produce nothing.
    pub async fn check(&self, turn: u64) -> Option<Epoch> {
        if !self.cadence.fires_at(turn) {
            return None;
        }
        match self.detect(turn).await {
            Ok(epoch) => epoch,
            Err(e) => {
                warn!(component = "epoch", turn, error = %e, "Epoch detection failed");
                None
            }
        }
    }

    async fn detect(&self, turn: u64) -> Result<Option<Epoch>, DbError> {
        let since = self.cadence.window_start(turn);
        let reflections = self
            .log
            .query(&EventQuery::turns(since, turn).kind(EventKind::Reflection))
            .await?;
        if reflections.is_empty() {
            debug!(component = "epoch", turn, since, "No reflections in window");
            return Ok(None);
        }

        let latest = self.log.latest_epoch().await?;
        if latest.is_some_and(|epoch| epoch.turn_start >= since) {
            debug!(component = "epoch", turn, since, "Window already covered");
            return Ok(None);
        }

        let digest = reflections
            .iter()
            .take(DIGEST_REFLECTIONS)
            .map(|event| format!("T-{}: {}", event.turn, event.content))
            .collect::<Vec<_>>()
            .join("\n");

        let name = self.era_name(since, turn, &digest).await;
        let master_prompt = self.art_prompt(&name, &digest, turn).await;

        let epoch = NewEpoch {
            name,
            turn_start: since,
            turn_end: Some(turn),
            master_prompt: Some(master_prompt),
        };
        let announcement = NewEvent::system(
            turn,
            EventKind::Epoch,
            format!("[Epoch T{since}-{turn}] {}", epoch.name),
        );

        let recorded = self.log.record_epoch(&epoch, Some(&announcement)).await?;
        if let Some(ref stored) = recorded {
            info!(
                component = "epoch",
                turn,
                epoch = %stored.name,
                turn_start = stored.turn_start,
                "New epoch recorded"
            );
        }
        Ok(recorded)
    }

    async fn era_name(&self, since: u64, turn: u64, digest: &str) -> String {
        let raw = match self.prompts.era_name(since, turn, digest) {
            Ok(prompt) => self.ask(&prompt, turn, "era name").await,
            Err(e) => {
                warn!(component = "epoch", turn, error = %e, "Era name prompt failed");
                None
            }
        };
        sanitize_era_name(raw.as_deref().unwrap_or_default(), since)
    }

    async fn art_prompt(&self, era: &str, digest: &str, turn: u64) -> String {
        let raw = match self.prompts.era_art(era, digest) {
            Ok(prompt) => self.ask(&prompt, turn, "art prompt").await,
            Err(e) => {
                warn!(component = "epoch", turn, error = %e, "Art prompt template failed");
                None
            }
        };
        raw.map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| default_art_prompt(era))
    }

    async fn ask(&self, prompt: &str, turn: u64, what: &'static str) -> Option<String> {
        match self
            .generator
            .generate(ModelTier::Smart, prompt, ERA_TEMPERATURE, ERA_MAX_TOKENS)
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(
                    component = "epoch",
                    turn,
                    what,
                    error = %e,
                    "Generation failed, using default"
                );
                None
            }
        }
    }
}
