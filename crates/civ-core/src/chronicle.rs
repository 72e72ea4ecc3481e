//! Chronicle summaries over a trailing window of turns.
//!
//! Every `chronicle_interval` turns the summarizer samples the window's
//! reflections and daily actions and asks the smart tier for a short
//! history of the period. There is no fallback text: if generation fails
//! nothing is written.

use std::sync::Arc;

use civ_db::{DbError, EventLog, EventQuery};
use civ_llm::{ModelTier, PromptEngine, TextGenerator};
use civ_types::{Event, EventKind, NewEvent};
use tracing::{debug, info, warn};

use crate::clock::Cadence;

const MAX_REFLECTIONS: usize = 8;
const MAX_ACTIONS: usize = 5;
const NO_REFLECTIONS: &str = "No reflections recorded.";
const NO_ACTIONS: &str = "No actions recorded.";
const CHRONICLE_TEMPERATURE: f32 = 0.5;
const CHRONICLE_MAX_TOKENS: u32 = 200;

/// Writes `CHRONICLE_SUMMARY` events on a fixed cadence.
pub struct ChronicleSummarizer<G, L> {
    generator: Arc<G>,
    log: Arc<L>,
    prompts: Arc<PromptEngine>,
    cadence: Cadence,
}

impl<G: TextGenerator, L: EventLog> ChronicleSummarizer<G, L> {
    /// Create a summarizer that runs every `cadence` turns.
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

    /// Run the summarizer for `turn`. Returns the stored event's id, if one
    /// was written.
    pub async fn check(&self, turn: u64) -> Option<i64> {
        if !self.cadence.fires_at(turn) {
            return None;
        }
        match self.summarize(turn).await {
            Ok(id) => id,
            Err(e) => {
                warn!(component = "chronicle", turn, error = %e, "Chronicle failed");
                None
            }
        }
    }

    async fn summarize(&self, turn: u64) -> Result<Option<i64>, DbError> {
        let since = self.cadence.window_start(turn);
        let events = self.log.query(&EventQuery::turns(since, turn)).await?;
        if events.is_empty() {
            debug!(component = "chronicle", turn, since, "No events in window");
            return Ok(None);
        }

        let reflections = sample(&events, EventKind::Reflection, MAX_REFLECTIONS, NO_REFLECTIONS);
        let actions = sample(&events, EventKind::DailyAction, MAX_ACTIONS, NO_ACTIONS);

        let prompt = match self.prompts.chronicle(since, turn, &actions, &reflections) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(component = "chronicle", turn, error = %e, "Chronicle prompt failed");
                return Ok(None);
            }
        };
        let summary = match self
            .generator
            .generate(
                ModelTier::Smart,
                &prompt,
                CHRONICLE_TEMPERATURE,
                CHRONICLE_MAX_TOKENS,
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_owned(),
            Ok(_) => {
                debug!(component = "chronicle", turn, "Empty chronicle, skipping");
                return Ok(None);
            }
            Err(e) => {
                warn!(component = "chronicle", turn, error = %e, "Chronicle generation failed");
                return Ok(None);
            }
        };

        let event = NewEvent::system(
            turn,
            EventKind::ChronicleSummary,
            format!("[Chronicle T{since}-{turn}] {summary}"),
        );
        let ids = self.log.append_batch(std::slice::from_ref(&event)).await?;
        info!(component = "chronicle", turn, since, "Chronicle recorded");
        Ok(ids.first().copied())
    }
}

/// The first `limit` contents of `kind`, one per line, or `empty`.
fn sample(events: &[Event], kind: EventKind, limit: usize, empty: &str) -> String {
    let lines: Vec<&str> = events
        .iter()
        .filter(|event| event.kind == kind)
        .take(limit)
        .map(|event| event.content.as_str())
        .collect();
    if lines.is_empty() {
        empty.to_owned()
    } else {
        lines.join("\n")
    }
}
