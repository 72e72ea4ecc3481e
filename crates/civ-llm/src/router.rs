//! Tier-aware router over a single backend.
//!
//! Maps [`ModelTier`]s onto model names, bounds every call with the tier's
//! deadline, and rejects any text that carries the fallback marker.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::backend::LlmBackend;
use crate::config::{LlmConfig, TierModels, TierTimeouts};
use crate::error::GenerationError;
use crate::{ModelTier, TextGenerator, reject_fallback};

/// Routes generation and embedding calls to the configured models.
pub struct LlmRouter {
    backend: LlmBackend,
    models: TierModels,
    timeouts: TierTimeouts,
}

impl LlmRouter {
    /// Build a router from configuration.
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            backend: LlmBackend::from_config(config),
            models: config.models.clone(),
            timeouts: config.timeouts,
        }
    }

    /// Name of the backend in use, for logging.
    pub const fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// The model serving `tier`.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.models.fast,
            ModelTier::Smart => &self.models.smart,
        }
    }

    /// The deadline applied to `tier`.
    pub const fn timeout_for(&self, tier: ModelTier) -> Duration {
        match tier {
            ModelTier::Fast => self.timeouts.fast,
            ModelTier::Smart => self.timeouts.smart,
        }
    }

    /// Embed `text` with the embedding model, bounded by the embed deadline.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        let deadline = self.timeouts.embed;
        match timeout(deadline, self.backend.embed(&self.models.embed, text)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(
                    model = self.models.embed,
                    timeout_ms = deadline.as_millis(),
                    "embedding call timed out"
                );
                Err(GenerationError::Timeout {
                    tier: "embed",
                    after_ms: deadline.as_millis(),
                })
            }
        }
    }
}

impl TextGenerator for LlmRouter {
    async fn generate(
        &self,
        tier: ModelTier,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let model = self.model_for(tier);
        let deadline = self.timeout_for(tier);

        let call = self.backend.complete(model, prompt, temperature, max_tokens);
        let text = match timeout(deadline, call).await {
            Ok(result) => result?,
            Err(_elapsed) => {
                warn!(
                    %tier,
                    model,
                    timeout_ms = deadline.as_millis(),
                    "generation call timed out"
                );
                return Err(GenerationError::Timeout {
                    tier: tier.as_str(),
                    after_ms: deadline.as_millis(),
                });
            }
        };

        debug!(%tier, model, chars = text.len(), "generation complete");
        reject_fallback(tier, text)
    }
}
