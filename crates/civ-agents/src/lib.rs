//! Agents for the Entropy Civ simulation.
//!
//! Each agent owns a [`TieredMemory`] whose consolidated items flow into a
//! shared [`VectorStore`] after passing through an [`EntropyTransform`],
//! which is how mundane days turn into legends over time.
//!
//! # Modules
//!
//! - [`agent`] -- Agent identity, state transitions, sandbox view
//! - [`classifier`] -- Keyword rules mapping action text to display tags
//! - [`entropy`] -- Memory distortion strategies
//! - [`error`] -- Error types
//! - [`memory`] -- Short-term buffer and consolidation
//! - [`policy`] -- Scenario framing and post-action updates
//! - [`vector`] -- Embedders and similarity stores

pub mod agent;
pub mod classifier;
pub mod entropy;
pub mod error;
pub mod memory;
pub mod policy;
pub mod vector;

pub use agent::{Agent, DAILY_ACTION_IMPORTANCE};
pub use classifier::{classify, speech_excerpt};
pub use entropy::{Embellish, EntropyTransform, Passthrough};
pub use error::VectorError;
pub use memory::{ENTROPY_STEP, PROMOTION_THRESHOLD, TieredMemory};
pub use policy::{ActionPolicy, ScenarioPolicy};
pub use vector::{
    Embedder, HashingEmbedder, InMemoryVectorStore, MemoryMetadata, VectorMatch, VectorStore,
    cosine_similarity, rank,
};
