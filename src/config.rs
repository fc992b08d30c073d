//! Engine configuration: token budgets, loop bounds and tool limits.
//!
//! Defaults mirror the reference deployment; every knob can be overridden
//! via `COLLOQUY_*` environment variables (a `.env` file is honored through
//! dotenvy) or builder-style setters.
//!
//! The token budgets are character-based approximations (`chars_per_token`,
//! default 4), deliberately not a real tokenizer.

use serde::{Deserialize, Serialize};

/// Tunable limits for the orchestration engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Characters-per-token heuristic used by all token budgets.
    pub chars_per_token: usize,
    /// Context-window budget, in heuristic tokens.
    pub context_window_tokens: usize,
    /// Chat size, in heuristic tokens, past which a chat is archived into
    /// the long-term history.
    pub summarize_threshold_tokens: usize,
    /// Replan loop bound: at this many attempts the feedback verdict is
    /// forced to proceed.
    pub max_replan_attempts: u32,
    /// Fallback recovery bound: past this many fallback entries in one run
    /// the engine stops recovering and finishes with an apology.
    pub max_fallback_attempts: u32,
    /// Hard ceiling on node transitions per run; backstops any residual
    /// routing cycle.
    pub max_transitions: u32,
    /// Result cap handed to the web-search provider when a plan does not
    /// specify one.
    pub web_search_max_results: usize,
    /// Number of trailing history messages included in prompts.
    pub history_tail: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chars_per_token: 4,
            context_window_tokens: 4000,
            summarize_threshold_tokens: 2000,
            max_replan_attempts: 2,
            max_fallback_attempts: 2,
            max_transitions: 24,
            web_search_max_results: 10,
            history_tail: 10,
        }
    }
}

impl Config {
    /// Builds a config from the environment, falling back to defaults for
    /// unset or unparseable variables.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        read_env("COLLOQUY_CHARS_PER_TOKEN", &mut config.chars_per_token);
        read_env("COLLOQUY_CONTEXT_WINDOW_TOKENS", &mut config.context_window_tokens);
        read_env(
            "COLLOQUY_SUMMARIZE_THRESHOLD_TOKENS",
            &mut config.summarize_threshold_tokens,
        );
        read_env("COLLOQUY_MAX_REPLAN_ATTEMPTS", &mut config.max_replan_attempts);
        read_env("COLLOQUY_MAX_FALLBACK_ATTEMPTS", &mut config.max_fallback_attempts);
        read_env("COLLOQUY_MAX_TRANSITIONS", &mut config.max_transitions);
        read_env("COLLOQUY_WEB_SEARCH_MAX_RESULTS", &mut config.web_search_max_results);
        read_env("COLLOQUY_HISTORY_TAIL", &mut config.history_tail);
        config
    }

    #[must_use]
    pub fn with_context_window_tokens(mut self, tokens: usize) -> Self {
        self.context_window_tokens = tokens;
        self
    }

    #[must_use]
    pub fn with_summarize_threshold_tokens(mut self, tokens: usize) -> Self {
        self.summarize_threshold_tokens = tokens;
        self
    }

    #[must_use]
    pub fn with_max_replan_attempts(mut self, attempts: u32) -> Self {
        self.max_replan_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_max_fallback_attempts(mut self, attempts: u32) -> Self {
        self.max_fallback_attempts = attempts;
        self
    }
}

fn read_env<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(key, raw = %raw, "ignoring unparseable config override"),
        }
    }
}
