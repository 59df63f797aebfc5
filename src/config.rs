use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::video::Provider;

/// Runtime settings, read from the environment (after `.env`).
///
/// | Env var                | Default |
/// |------------------------|---------|
/// | `PORT`                 | `8081`  |
/// | `SIMULATED_LATENCY_MS` | `0`     |
/// | `CATALOG_PATH`         | bundled |
/// | `VIDEO_PROVIDER`       | `aws`   |
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub simulated_latency: Duration,
    pub catalog_path: Option<PathBuf>,
    pub video_provider: Provider,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8081,
            simulated_latency: Duration::ZERO,
            catalog_path: None,
            video_provider: Provider::Aws,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(s) => s.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %s, "unparseable setting, using default");
            default
        }),
        None => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let port = parse_or("PORT", lookup("PORT"), defaults.port);
        let latency_ms = parse_or("SIMULATED_LATENCY_MS", lookup("SIMULATED_LATENCY_MS"), 0u64);
        let video_provider = match lookup("VIDEO_PROVIDER") {
            Some(p) => p.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "unknown VIDEO_PROVIDER, using default");
                defaults.video_provider
            }),
            None => defaults.video_provider,
        };
        Self {
            port,
            simulated_latency: Duration::from_millis(latency_ms),
            catalog_path: lookup("CATALOG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            video_provider,
        }
    }
}
