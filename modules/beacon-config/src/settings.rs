use std::collections::BTreeMap;
use std::env;

use crate::raw::RawSettings;

/// Ambient runtime settings: where logs go, how verbose they are, and
/// per-module overrides (the YAML `settings:` block). Nothing here is a
/// secret, so unlike `Config::from_env` it has no required env vars — the
/// YAML block is authoritative and env vars only fill in what it omits.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub log_directory: String,
    pub logfile_size: u64,
    pub logfile_level: String,
    pub loglevel_override: BTreeMap<String, String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            log_directory: "logs".to_string(),
            logfile_size: 10_000_000,
            logfile_level: "info".to_string(),
            loglevel_override: BTreeMap::new(),
        }
    }
}

impl RuntimeSettings {
    pub fn from_raw(raw: RawSettings) -> Self {
        let default = Self::default();
        Self {
            log_directory: raw
                .log_directory
                .or_else(|| env::var("BEACON_LOG_DIRECTORY").ok())
                .unwrap_or(default.log_directory),
            logfile_size: raw.logfile_size.unwrap_or(default.logfile_size),
            logfile_level: raw
                .logfile_level
                .or_else(|| env::var("BEACON_LOGFILE_LEVEL").ok())
                .unwrap_or(default.logfile_level),
            loglevel_override: raw.loglevel_override,
        }
    }

    /// Builds an `EnvFilter` directive string combining `logfile_level` with
    /// per-module overrides, e.g. `"info,bus=info,chain=info,actor.request=info"`.
    pub fn env_filter_directive(&self) -> String {
        let mut directive = self.logfile_level.clone();
        for (module, level) in &self.loglevel_override {
            directive.push_str(&format!(",{module}={level}"));
        }
        directive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_have_sane_fallbacks() {
        let settings = RuntimeSettings::from_raw(RawSettings::default());
        assert_eq!(settings.log_directory, "logs");
        assert_eq!(settings.logfile_level, "info");
    }

    #[test]
    fn env_filter_directive_appends_overrides() {
        let mut raw = RawSettings::default();
        raw.logfile_level = Some("debug".to_string());
        raw.loglevel_override.insert("bus".to_string(), "warn".to_string());
        let settings = RuntimeSettings::from_raw(raw);
        assert_eq!(settings.env_filter_directive(), "debug,bus=warn");
    }
}
