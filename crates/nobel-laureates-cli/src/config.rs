//! Configuration loading and resolution.
//!
//! Every setting resolves from the explicit flag, then the environment, then
//! the built-in default.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_START_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_Nobel_laureates_by_country";
pub const DEFAULT_OUTPUT: &str = "nobel_winners.jsonl";
pub const DEFAULT_IMAGES_DIR: &str = "images";
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_USER_AGENT: &str = concat!(
    "nobel-laureates/",
    env!("CARGO_PKG_VERSION"),
    " (laureate record harvester)"
);

pub const START_URL_ENV: &str = "NOBEL_START_URL";
pub const OUTPUT_ENV: &str = "NOBEL_OUTPUT";
pub const IMAGES_DIR_ENV: &str = "NOBEL_IMAGES_DIR";

/// Where records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    fn parse(raw: &str) -> Self {
        if raw == "-" {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(raw))
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub start_url: Option<String>,
    pub output: Option<String>,
    pub images_dir: Option<String>,
    pub no_images: bool,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

/// Fully resolved and validated harvest settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    pub start_url: Url,
    pub output: OutputTarget,
    pub images_dir: PathBuf,
    pub resolve_images: bool,
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl HarvestConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with `env` standing in for the process environment.
    pub fn resolve_with(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let setting = |explicit: Option<String>, key: &str, default: &str| {
            explicit
                .or_else(|| env(key).filter(|v| !v.trim().is_empty()))
                .unwrap_or_else(|| default.to_string())
        };

        let raw_url = setting(overrides.start_url, START_URL_ENV, DEFAULT_START_URL);
        let start_url =
            Url::parse(&raw_url).with_context(|| format!("invalid start URL: {raw_url}"))?;
        if !matches!(start_url.scheme(), "http" | "https") {
            bail!("start URL must be http or https: {start_url}");
        }

        let output = OutputTarget::parse(&setting(overrides.output, OUTPUT_ENV, DEFAULT_OUTPUT));
        let images_dir = PathBuf::from(setting(
            overrides.images_dir,
            IMAGES_DIR_ENV,
            DEFAULT_IMAGES_DIR,
        ));

        let concurrency = overrides.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        let timeout_ms = overrides.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            bail!("timeout must be greater than zero");
        }
        let user_agent = overrides
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        if user_agent.trim().is_empty() {
            bail!("user agent must not be empty");
        }

        Ok(Self {
            start_url,
            output,
            images_dir,
            resolve_images: !overrides.no_images,
            concurrency,
            timeout_ms,
            user_agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::resolve_with(ConfigOverrides::default(), env_of(&[])).unwrap();
        assert_eq!(config.start_url.as_str(), DEFAULT_START_URL);
        assert_eq!(config.output, OutputTarget::File(PathBuf::from("nobel_winners.jsonl")));
        assert_eq!(config.images_dir, PathBuf::from("images"));
        assert!(config.resolve_images);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.timeout_ms, 15_000);
        assert!(config.user_agent.starts_with("nobel-laureates/"));
    }

    #[test]
    fn test_env_beats_default() {
        let env = env_of(&[
            (OUTPUT_ENV, "-"),
            (IMAGES_DIR_ENV, "/tmp/portraits"),
            (START_URL_ENV, "http://localhost:8080/list"),
        ]);
        let config = HarvestConfig::resolve_with(ConfigOverrides::default(), env).unwrap();
        assert_eq!(config.output, OutputTarget::Stdout);
        assert_eq!(config.images_dir, PathBuf::from("/tmp/portraits"));
        assert_eq!(config.start_url.as_str(), "http://localhost:8080/list");
    }

    #[test]
    fn test_flag_beats_env() {
        let env = env_of(&[(OUTPUT_ENV, "from-env.jsonl")]);
        let overrides = ConfigOverrides {
            output: Some("from-flag.jsonl".into()),
            no_images: true,
            ..Default::default()
        };
        let config = HarvestConfig::resolve_with(overrides, env).unwrap();
        assert_eq!(config.output, OutputTarget::File(PathBuf::from("from-flag.jsonl")));
        assert!(!config.resolve_images);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let env = env_of(&[(IMAGES_DIR_ENV, "  ")]);
        let config = HarvestConfig::resolve_with(ConfigOverrides::default(), env).unwrap();
        assert_eq!(config.images_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero = ConfigOverrides {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(HarvestConfig::resolve_with(zero, env_of(&[])).is_err());

        let bad_url = ConfigOverrides {
            start_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(HarvestConfig::resolve_with(bad_url, env_of(&[])).is_err());

        let ftp = ConfigOverrides {
            start_url: Some("ftp://example.org/list".into()),
            ..Default::default()
        };
        assert!(HarvestConfig::resolve_with(ftp, env_of(&[])).is_err());

        let no_timeout = ConfigOverrides {
            timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(HarvestConfig::resolve_with(no_timeout, env_of(&[])).is_err());
    }
}
