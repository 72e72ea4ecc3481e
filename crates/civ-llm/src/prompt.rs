//! Prompt template loading and rendering via `minijinja`.
//!
//! The built-in templates are compiled into the binary. Operators can tune
//! wording without recompiling by pointing [`PromptEngine::with_overrides`]
//! at a directory; any `<name>.j2` file found there replaces the built-in
//! template of the same name.

use std::path::Path;

use minijinja::{Environment, context};

use crate::error::PromptError;

const DAILY: &str = "daily";
const REFLECTION: &str = "reflection";
const ERA_NAME: &str = "era_name";
const ERA_ART: &str = "era_art";
const CHRONICLE: &str = "chronicle";

const BUILTIN: [(&str, &str); 5] = [
    (DAILY, include_str!("../templates/daily.j2")),
    (REFLECTION, include_str!("../templates/reflection.j2")),
    (ERA_NAME, include_str!("../templates/era_name.j2")),
    (ERA_ART, include_str!("../templates/era_art.j2")),
    (CHRONICLE, include_str!("../templates/chronicle.j2")),
];

/// Renders every prompt the simulation sends to a model.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create an engine holding only the built-in templates.
    pub fn new() -> Result<Self, PromptError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN {
            env.add_template(name, source)
                .map_err(|source| PromptError::Template { name, source })?;
        }
        Ok(Self { env })
    }

    /// Create an engine whose built-ins are replaced by any `<name>.j2`
    /// files present in `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self, PromptError> {
        let mut engine = Self::new()?;
        for (name, _) in BUILTIN {
            let path = dir.join(format!("{name}.j2"));
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|source| PromptError::Read {
                path: path.display().to_string(),
                source,
            })?;
            engine
                .env
                .add_template_owned(name, source)
                .map_err(|source| PromptError::Template { name, source })?;
            tracing::debug!(template = name, path = %path.display(), "prompt override loaded");
        }
        Ok(engine)
    }

    /// The daily-action prompt for an agent's scenario.
    pub fn daily(&self, scenario: &str) -> Result<String, PromptError> {
        self.render(DAILY, context! { scenario })
    }

    /// The nightly reflection prompt. `myth` selects hallucination mode.
    pub fn reflection(&self, memories: &str, myth: bool) -> Result<String, PromptError> {
        self.render(REFLECTION, context! { memories, myth })
    }

    /// The era-naming prompt over a reflection digest.
    pub fn era_name(&self, since: u64, current: u64, digest: &str) -> Result<String, PromptError> {
        self.render(ERA_NAME, context! { since, current, digest })
    }

    /// The master art prompt request for a named era.
    pub fn era_art(&self, era: &str, digest: &str) -> Result<String, PromptError> {
        self.render(ERA_ART, context! { era, digest })
    }

    /// The chronicle prompt over sampled actions and reflections.
    pub fn chronicle(
        &self,
        since: u64,
        current: u64,
        actions: &str,
        reflections: &str,
    ) -> Result<String, PromptError> {
        self.render(CHRONICLE, context! { since, current, actions, reflections })
    }

    fn render(&self, name: &'static str, ctx: minijinja::Value) -> Result<String, PromptError> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|source| PromptError::Template { name, source })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn engine() -> PromptEngine {
        PromptEngine::new().unwrap()
    }

    #[test]
    fn daily_prompt_embeds_scenario() {
        let prompt = engine().daily("What will Agent-0 do?").unwrap_or_default();
        assert!(prompt.contains("Scenario: What will Agent-0 do?"));
        assert!(prompt.ends_with("Your action:"));
    }

    #[test]
    fn reflection_mode_switches_instructions() {
        let engine = engine();
        let myth = engine.reflection("found a wolf", true).unwrap_or_default();
        let fact = engine.reflection("found a wolf", false).unwrap_or_default();
        assert!(myth.contains("myth or legend"));
        assert!(!fact.contains("myth or legend"));
        assert!(fact.contains("village elder"));
        assert!(fact.contains("Today's events: found a wolf"));
    }

    #[test]
    fn era_and_chronicle_prompts_carry_turn_range() {
        let engine = engine();
        let name = engine.era_name(50, 100, "T-51: rain").unwrap_or_default();
        assert!(name.contains("turns 50 to 100"));
        assert!(name.contains("T-51: rain"));

        let art = engine.era_art("Age of Rain", "T-51: rain").unwrap_or_default();
        assert!(art.contains("'Age of Rain'"));

        let chronicle = engine
            .chronicle(0, 100, "No actions recorded.", "No reflections recorded.")
            .unwrap_or_default();
        assert!(chronicle.contains("Turns 0 to 100 have passed."));
        assert!(chronicle.contains("No actions recorded."));
    }

    #[test]
    fn overrides_replace_builtins() {
        let unique = format!(
            "civ_prompt_overrides_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("daily.j2"), "Custom: {{ scenario }}").ok();

        let engine = PromptEngine::with_overrides(&dir);
        assert!(engine.is_ok());
        if let Ok(engine) = engine {
            assert_eq!(engine.daily("hunt").unwrap_or_default(), "Custom: hunt");
            // Untouched templates keep their built-in text.
            assert!(engine.reflection("x", false).unwrap_or_default().contains("village elder"));
        }

        std::fs::remove_dir_all(&dir).ok();
    }
}
