//! Environment-backed configuration.
//!
//! Precedence is defaults < environment (`.env` is loaded first) < CLI flags.
//! The CLI layer applies its own overrides on top of what this returns.

use crate::domain::{AnalysisConfig, FailurePolicy};
use crate::error::{AppError, EXIT_INPUT};

pub const ENV_THRESHOLD: &str = "GS_THRESHOLD";
pub const ENV_MAX_EVALUATIONS: &str = "GS_MAX_EVALUATIONS";
pub const ENV_FAILURE_POLICY: &str = "GS_FAILURE_POLICY";

impl AnalysisConfig {
    /// Defaults overridden by `GS_*` environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AnalysisConfig::default();

        if let Some(raw) = lookup(ENV_THRESHOLD) {
            let threshold: f64 = raw
                .trim()
                .parse()
                .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid {ENV_THRESHOLD}='{raw}': {e}")))?;
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(AppError::new(
                    EXIT_INPUT,
                    format!("Invalid {ENV_THRESHOLD}='{raw}': must be positive."),
                ));
            }
            config.threshold = threshold;
        }

        if let Some(raw) = lookup(ENV_MAX_EVALUATIONS) {
            let n: usize = raw.trim().parse().map_err(|e| {
                AppError::new(EXIT_INPUT, format!("Invalid {ENV_MAX_EVALUATIONS}='{raw}': {e}"))
            })?;
            if n == 0 {
                return Err(AppError::new(
                    EXIT_INPUT,
                    format!("Invalid {ENV_MAX_EVALUATIONS}='{raw}': must be >= 1."),
                ));
            }
            config.fit.max_evaluations = n;
        }

        if let Some(raw) = lookup(ENV_FAILURE_POLICY) {
            config.policy = match raw.trim().to_ascii_lowercase().as_str() {
                "skip" => FailurePolicy::Skip,
                "abort" => FailurePolicy::Abort,
                _ => {
                    return Err(AppError::new(
                        EXIT_INPUT,
                        format!("Invalid {ENV_FAILURE_POLICY}='{raw}': expected 'skip' or 'abort'."),
                    ));
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AnalysisConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AnalysisConfig::from_lookup(lookup_from(&[
            (ENV_THRESHOLD, "0.01"),
            (ENV_MAX_EVALUATIONS, "800"),
            (ENV_FAILURE_POLICY, "Abort"),
        ]))
        .unwrap();
        assert_eq!(config.threshold, 0.01);
        assert_eq!(config.fit.max_evaluations, 800);
        assert_eq!(config.policy, FailurePolicy::Abort);
    }

    #[test]
    fn invalid_values_are_input_errors() {
        for pairs in [
            [(ENV_THRESHOLD, "-1")],
            [(ENV_THRESHOLD, "abc")],
            [(ENV_MAX_EVALUATIONS, "0")],
            [(ENV_FAILURE_POLICY, "retry")],
        ] {
            let err = AnalysisConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert_eq!(err.exit_code(), EXIT_INPUT);
        }
    }
}
