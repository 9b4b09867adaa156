use std::{collections::HashMap, fs, time::Duration};

/// File-name suffix applied to multi-path bundles the engine packages into
/// a single archive.
pub const BUNDLE_SUFFIX: &str = ".tar.gz";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long a completed session stays visible before removal.
    pub completion_linger: Duration,
    /// Capacity of the outbound notification channel.
    pub event_capacity: usize,
    /// Template for multi-path bundle names; `#` expands to the path count.
    pub bundle_name_format: String,
    /// Completed transfers retained in history, oldest evicted first.
    pub history_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            completion_linger: Duration::from_secs(3),
            event_capacity: 1024,
            bundle_name_format: "#-files-bundle".into(),
            history_capacity: 256,
        }
    }
}

pub fn load_config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();

    if let Ok(raw) = fs::read_to_string("transfers.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("completion_linger_secs") {
                if let Ok(parsed) = v.parse::<u64>() {
                    config.completion_linger = Duration::from_secs(parsed);
                }
            }
            if let Some(v) = file_cfg.get("bundle_name_format") {
                config.bundle_name_format = v.clone();
            }
            if let Some(v) = file_cfg.get("history_capacity") {
                if let Ok(parsed) = v.parse::<usize>() {
                    config.history_capacity = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("TRANSFERS__COMPLETION_LINGER_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            config.completion_linger = Duration::from_secs(parsed);
        }
    }
    if let Ok(v) = std::env::var("TRANSFERS__BUNDLE_NAME_FORMAT") {
        config.bundle_name_format = v;
    }
    if let Ok(v) = std::env::var("TRANSFERS__HISTORY_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            config.history_capacity = parsed;
        }
    }

    config
}

/// Expand the bundle-name template for a path count. An empty template
/// falls back to the default rather than producing a bare suffix.
pub fn bundle_display_name(format: &str, count: usize) -> String {
    let default_format = OrchestratorConfig::default().bundle_name_format;
    let format = if format.trim().is_empty() {
        default_format.as_str()
    } else {
        format
    };
    let name = format.replace('#', &count.to_string());
    format!("{name}{BUNDLE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_name_expands_count_marker() {
        assert_eq!(
            bundle_display_name("#-files-bundle", 3),
            "3-files-bundle.tar.gz"
        );
    }

    #[test]
    fn bundle_name_without_marker_is_used_verbatim() {
        assert_eq!(bundle_display_name("holiday-photos", 7), "holiday-photos.tar.gz");
    }

    #[test]
    fn empty_bundle_format_falls_back_to_default() {
        assert_eq!(bundle_display_name("  ", 2), "2-files-bundle.tar.gz");
    }
}
