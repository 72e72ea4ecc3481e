//! Engine binary for the Entropy Civ simulation.
//!
//! Wires the turn orchestrator to `PostgreSQL` (event log and long-term
//! memory) and the LLM router, then runs the turn loop until the turn limit is
//! reached or Ctrl-C is pressed.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `civ-config.yaml` (or `CIV_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the LLM router from the environment
//! 4. Connect to `PostgreSQL` and run migrations
//! 5. Resume the turn counter from the event log
//! 6. Spawn the agent population
//! 7. Run the turn loop
//! 8. Log the result and close the pool

mod embedder;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use civ_agents::HashingEmbedder;
use civ_core::config::LoggingConfig;
use civ_core::{
    EmbedderKind, JsonFileSnapshot, OperatorState, Orchestrator, SimulationConfig,
    SimulationState, TurnClock, TurnSettings, runner,
};
use civ_db::{PgEventLog, PgVectorStore, PostgresPool};
use civ_llm::{LlmConfig, LlmRouter, PromptEngine};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::embedder::EngineEmbedder;
use crate::error::EngineError;

const DEFAULT_CONFIG_PATH: &str = "civ-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails. Failures inside the turn
/// loop are logged and never end the process.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config_path = std::env::var("CIV_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(config = %config_path.display(), "civ-engine starting");

    // 3. LLM router and prompts.
    let llm_config = LlmConfig::from_env()?;
    let router = Arc::new(LlmRouter::new(&llm_config));
    let prompts = match std::env::var("CIV_PROMPT_DIR") {
        Ok(dir) => PromptEngine::with_overrides(Path::new(&dir))?,
        Err(_) => PromptEngine::new()?,
    };
    info!(
        backend = router.backend_name(),
        fast_model = %llm_config.models.fast,
        smart_model = %llm_config.models.smart,
        "LLM router ready"
    );

    // 4. Event log and long-term memory.
    let pool = PostgresPool::connect(&config.infrastructure.postgres()).await?;
    pool.run_migrations().await?;
    let log = Arc::new(PgEventLog::new(pool.pool().clone()));

    // 5. Resume.
    let clock = TurnClock::resume(log.as_ref()).await;

    // 6. Population over the persistent memory store.
    let embedder = match config.memory.embedder {
        EmbedderKind::Hashing => {
            EngineEmbedder::Hashing(HashingEmbedder::new(config.memory.embedding_dimensions))
        }
        EmbedderKind::Model => EngineEmbedder::Model(Arc::clone(&router)),
    };
    let store = Arc::new(PgVectorStore::new(pool.pool().clone(), embedder));
    let state = SimulationState::populate(clock, &config.simulation, &config.memory, &store);
    info!(
        agents = state.agents.len(),
        start_turn = clock.turn(),
        "Population spawned"
    );

    let settings = TurnSettings::from_config(&config)?;
    let mut orchestrator = Orchestrator::new(state, router, log, Arc::new(prompts), settings);
    let (snapshots, snapshot_writer) =
        JsonFileSnapshot::spawn(config.infrastructure.snapshot_path.clone());
    orchestrator.add_listener(Box::new(snapshots));

    // 7. Run, stopping cleanly on Ctrl-C.
    let operator = Arc::new(OperatorState::new(
        config.simulation.turn_interval_ms,
        config.simulation.max_turns,
    ));
    spawn_ctrl_c_handler(Arc::clone(&operator));

    let result = runner::run_simulation(&mut orchestrator, &operator).await;

    // 8. Shutdown. Dropping the orchestrator lets the snapshot writer drain.
    runner::log_simulation_end(&result);
    drop(orchestrator);
    if let Err(e) = snapshot_writer.await {
        warn!(error = %e, "Snapshot writer ended abnormally");
    }
    pool.close().await;
    info!(
        end_reason = ?result.end_reason,
        total_turns = result.total_turns,
        "civ-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        Ok(SimulationConfig::parse("")?)
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Request a stop on the first Ctrl-C. The turn in progress finishes.
fn spawn_ctrl_c_handler(operator: Arc<OperatorState>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after the current turn");
                operator.request_stop();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
    });
}
