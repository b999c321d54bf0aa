//! Resolver settings loaded from the environment.

use serde::{Deserialize, Serialize};

pub const FORMULA_POLICY_VAR: &str = "SUMMONER_FORMULA_POLICY";
pub const FLAG_SCOPE_VAR: &str = "SUMMONER_FLAG_SCOPE";
pub const GAME_SYSTEM_VAR: &str = "SUMMONER_GAME_SYSTEM";

/// Scope the host module reads summoner flags from.
const DEFAULT_FLAG_SCOPE: &str = "arbron-summoner";
const DEFAULT_GAME_SYSTEM: &str = "dnd5e";

/// What a resolution pass does when a configured formula cannot be evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaFailurePolicy {
    /// Omit the one field, log a warning and keep going.
    #[default]
    SkipField,
    /// Abort the pass on the first bad formula.
    Strict,

    /// Forward-compatibility fallback for newer variants.
    #[serde(other)]
    Unknown,
}

impl FormulaFailurePolicy {
    /// Whether a formula failure aborts the pass.
    ///
    /// Unknown policies behave like the default.
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl std::fmt::Display for FormulaFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormulaFailurePolicy::SkipField => write!(f, "skip_field"),
            FormulaFailurePolicy::Strict => write!(f, "strict"),
            FormulaFailurePolicy::Unknown => write!(f, "unknown"),
        }
    }
}

/// A policy name that matches none of the known policies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown formula failure policy: '{0}'")]
pub struct UnknownPolicyError(pub String);

impl std::str::FromStr for FormulaFailurePolicy {
    type Err = UnknownPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip_field" | "skipfield" | "skip" | "lenient" => Ok(FormulaFailurePolicy::SkipField),
            "strict" | "fail" | "abort" => Ok(FormulaFailurePolicy::Strict),
            _ => Err(UnknownPolicyError(s.trim().to_string())),
        }
    }
}

/// Settings a [`SummonResolver`](crate::use_cases::summon::SummonResolver) runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub formula_failure_policy: FormulaFailurePolicy,
    /// Flag namespace the summoner stamp is written under
    pub flag_scope: String,
    /// Rules system used when the caller does not pick one
    pub game_system: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            formula_failure_policy: FormulaFailurePolicy::default(),
            flag_scope: DEFAULT_FLAG_SCOPE.to_string(),
            game_system: DEFAULT_GAME_SYSTEM.to_string(),
        }
    }
}

impl ResolverSettings {
    pub fn with_policy(mut self, policy: FormulaFailurePolicy) -> Self {
        self.formula_failure_policy = policy;
        self
    }

    pub fn with_flag_scope(mut self, scope: impl Into<String>) -> Self {
        self.flag_scope = scope.into();
        self
    }

    pub fn with_game_system(mut self, system: impl Into<String>) -> Self {
        self.game_system = system.into();
        self
    }

    /// Load settings from `SUMMONER_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Blank values are ignored; an unrecognised policy falls back to the
    /// default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let mut settings = Self::default();

        if let Some(raw) = read(FORMULA_POLICY_VAR) {
            match raw.parse::<FormulaFailurePolicy>() {
                Ok(policy) => settings.formula_failure_policy = policy,
                Err(e) => tracing::warn!(
                    var = FORMULA_POLICY_VAR,
                    error = %e,
                    default = %settings.formula_failure_policy,
                    "Unrecognised formula failure policy, using default"
                ),
            }
        }
        if let Some(scope) = read(FLAG_SCOPE_VAR) {
            settings.flag_scope = scope;
        }
        if let Some(system) = read(GAME_SYSTEM_VAR) {
            settings.game_system = system;
        }

        settings
    }
}
