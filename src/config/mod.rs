mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./slidequeue.toml",
        "~/.config/slidequeue/config.toml",
        "/etc/slidequeue/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.sampling.target_queue_size == 0 {
        anyhow::bail!("sampling.target_queue_size cannot be 0");
    }

    if config.sequential.page_size == 0 {
        anyhow::bail!("sequential.page_size cannot be 0");
    }

    if config.navigation.window_size == 0 {
        anyhow::bail!("navigation.window_size cannot be 0");
    }

    for p in &config.sampling.priority_patterns {
        if regex::Regex::new(&p.pattern).is_err() {
            anyhow::bail!("Priority pattern '{}' is not a valid regex", p.pattern);
        }
        if p.multiplier <= 0.0 {
            anyhow::bail!("Priority pattern '{}' needs a positive multiplier", p.pattern);
        }
    }

    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }

    Ok(())
}

impl Config {
    /// Return a list of validation warnings (non-fatal issues).
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.engine.root.is_none() {
            warnings.push("engine.root is not set; it must be given on the command line".into());
        }

        if self.queue.age_out_keep >= 1.0 {
            warnings.push("queue.age_out_keep >= 1.0 disables age-out; items will not resurface".into());
        }

        if self.sequential.low_water >= self.sequential.page_size {
            warnings.push(format!(
                "sequential.low_water ({}) >= page_size ({}); every step will fetch a page",
                self.sequential.low_water, self.sequential.page_size
            ));
        }

        if self.navigation.history_cap < self.navigation.history_floor {
            warnings.push("navigation.history_cap is below history_floor; the cap wins".into());
        }

        if let Some(total) = self.sampling.estimated_total {
            if (total as usize) < self.sampling.target_queue_size {
                warnings.push(format!(
                    "sampling.estimated_total ({total}) is below target_queue_size; every file will be queued"
                ));
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidequeue_common::{MediaFilter, OrderBy, OrderDirection};
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.engine.mode, ProviderMode::Random);
        assert_eq!(config.sampling.target_queue_size, 100);
        assert_eq!(config.scanner.browse_timeout_secs, 180);
        assert_eq!(config.scanner.batch_size, 2);
        assert_eq!(config.breaker.threshold, 3);
        assert_eq!(config.breaker.window_secs, 10);
        assert_eq!(config.navigation.max_duplicate_retries, 10);
    }

    #[test]
    fn parses_full_file() {
        let file = write_config(
            r#"
[engine]
root = "media-source://photos"
mode = "sequential"
media_filter = "images"
max_depth = 3
seed = 7

[sampling]
target_queue_size = 40
estimated_total = 20000
priority_patterns = [{ pattern = "favorites", multiplier = 3.0 }]

[sequential]
page_size = 25
order_by = "modified"
order_direction = "desc"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.engine.root.as_deref(), Some("media-source://photos"));
        assert_eq!(config.engine.mode, ProviderMode::Sequential);
        assert_eq!(config.engine.media_filter, MediaFilter::Images);
        assert_eq!(config.engine.max_depth, Some(3));
        assert_eq!(config.sampling.estimated_total, Some(20000));
        assert_eq!(config.sampling.priority_patterns.len(), 1);
        assert_eq!(config.sequential.page_size, 25);
        assert_eq!(config.sequential.order_by, OrderBy::Modified);
        assert_eq!(config.sequential.order_direction, OrderDirection::Desc);
        // untouched fields keep defaults
        assert_eq!(config.sequential.low_water, 10);
    }

    #[test]
    fn rejects_invalid_pattern() {
        let file = write_config(
            r#"
[sampling]
priority_patterns = [{ pattern = "(unclosed", multiplier = 2.0 }]
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_zero_page_size() {
        let file = write_config("[sequential]\npage_size = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_custom_path_is_an_error() {
        let result = load_config_or_default(Some(Path::new("/nonexistent/slidequeue.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn resolve_compiles_patterns() {
        let mut config = Config::for_root("photos", ProviderMode::Random);
        config.sampling.priority_patterns.push(PriorityPattern {
            pattern: "^photos/best".into(),
            multiplier: 2.5,
        });
        let engine = config.resolve().unwrap();
        assert_eq!(engine.priority.len(), 1);
        assert!(engine.priority[0].regex.is_match("photos/best/2020"));
        assert_eq!(engine.require_root().unwrap(), "photos");
    }

    #[test]
    fn resolve_without_root_defers_error() {
        let engine = Config::default().resolve().unwrap();
        let err = engine.require_root().unwrap_err();
        assert!(matches!(err, slidequeue_common::Error::Configuration(_)));
    }

    #[test]
    fn blank_root_is_treated_as_missing() {
        let engine = Config::for_root("   ", ProviderMode::Random).resolve().unwrap();
        assert!(engine.root.is_none());
    }

    #[test]
    fn history_capacity_formula() {
        let mut config = Config::default();
        config.navigation.window_size = 10;
        config.navigation.discovery_window_secs = 600;
        config.navigation.advance_interval_secs = 5;
        // max(50, 120, 100) = 120
        assert_eq!(config.resolve().unwrap().history_capacity(), 120);

        config.navigation.window_size = 2000;
        // 10_000 capped at 5000
        assert_eq!(config.resolve().unwrap().history_capacity(), 5000);

        config.navigation.window_size = 1;
        config.navigation.discovery_window_secs = 0;
        assert_eq!(config.resolve().unwrap().history_capacity(), 100);
    }

    #[test]
    fn window_bound_is_twice_target() {
        let mut config = Config::default();
        config.navigation.window_size = 7;
        assert_eq!(config.resolve().unwrap().window_bound(), 14);
    }

    #[test]
    fn provider_mode_from_str() {
        assert_eq!("Random".parse::<ProviderMode>().unwrap(), ProviderMode::Random);
        assert_eq!("ordered".parse::<ProviderMode>().unwrap(), ProviderMode::Sequential);
        assert!("bogus".parse::<ProviderMode>().is_err());
    }
}
