//! Engine configuration, resolved once and threaded into [`Engine`](crate::Engine).

use std::time::Duration;

/// Value of `AWS_EXECUTION_ENV` prefix identifying a Lambda runtime.
const LAMBDA_EXECUTION_ENV_PREFIX: &str = "AWS_Lambda";

/// Tuning and policy for the resolution pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Responses are size-capped here, so full bundles are refused
    pub size_constrained: bool,
    /// Maximum blob fetches in flight for one request
    pub fetch_concurrency: usize,
    /// Limit on a single blob fetch
    pub fetch_timeout: Duration,
    /// Limit on the record store query
    pub store_timeout: Duration,
    /// Check fetched bytes against the record's content hash
    pub verify_content_hash: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            size_constrained: false,
            fetch_concurrency: 4,
            fetch_timeout: Duration::from_secs(30),
            store_timeout: Duration::from_secs(10),
            verify_content_hash: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// `AWS_EXECUTION_ENV` starting with `AWS_Lambda` marks the environment as
    /// size-constrained; `OTA_SIZE_CONSTRAINED` overrides that detection.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let detected = lookup("AWS_EXECUTION_ENV")
            .is_some_and(|v| v.starts_with(LAMBDA_EXECUTION_ENV_PREFIX));
        let size_constrained = lookup("OTA_SIZE_CONSTRAINED")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(detected);

        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&s| s > 0)
                .map_or(default, Duration::from_secs)
        };

        Self {
            size_constrained,
            fetch_concurrency: lookup("OTA_FETCH_CONCURRENCY")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.fetch_concurrency),
            fetch_timeout: secs("OTA_FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            store_timeout: secs("OTA_STORE_TIMEOUT_SECS", defaults.store_timeout),
            verify_content_hash: lookup("OTA_VERIFY_CONTENT_HASH")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.verify_content_hash),
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    if v == "1" || v.eq_ignore_ascii_case("true") {
        Some(true)
    } else if v == "0" || v.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EngineConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn lambda_runtime_is_size_constrained() {
        assert!(config(&[("AWS_EXECUTION_ENV", "AWS_Lambda_python3.12")]).size_constrained);
        assert!(!config(&[("AWS_EXECUTION_ENV", "AWS_ECS_FARGATE")]).size_constrained);
        assert!(!config(&[]).size_constrained);
    }

    #[test]
    fn explicit_override_wins() {
        let cfg = config(&[
            ("AWS_EXECUTION_ENV", "AWS_Lambda_python3.12"),
            ("OTA_SIZE_CONSTRAINED", "false"),
        ]);
        assert!(!cfg.size_constrained);
        assert!(config(&[("OTA_SIZE_CONSTRAINED", "1")]).size_constrained);
    }

    #[test]
    fn numeric_settings_fall_back_on_garbage() {
        let cfg = config(&[
            ("OTA_FETCH_CONCURRENCY", "0"),
            ("OTA_FETCH_TIMEOUT_SECS", "5"),
            ("OTA_STORE_TIMEOUT_SECS", "soon"),
        ]);
        assert_eq!(cfg.fetch_concurrency, 4);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(5));
        assert_eq!(cfg.store_timeout, Duration::from_secs(10));
    }
}
