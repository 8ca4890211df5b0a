//! Runtime configuration.
//!
//! One immutable record, assembled once at startup from `HEXES_*`
//! environment variables and (in the binary) CLI overrides, then
//! passed by reference. There is no global mutable configuration.

pub mod logging;

use std::path::PathBuf;

/// Log line rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Pretty,
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse the `pretty|text|json` knob; unknown values fall back to
    /// text rather than failing startup.
    pub fn parse(s: &str) -> LogFormat {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// EnvFilter directive string, e.g. `"info"` or
    /// `"warn,screen.render=trace"`.
    pub level: String,
    /// Log file path; stderr when absent.
    pub file: Option<PathBuf>,
    pub format: LogFormat,
    pub timestamps: bool,
    /// Custom chrono timestamp format, when `timestamps` is on.
    pub timestamp_format: Option<String>,
    /// Record file and line numbers on every event.
    pub full_paths: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            format: LogFormat::default(),
            timestamps: true,
            timestamp_format: None,
            full_paths: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileConfig {
    /// Profiling mode requested by the operator (consumed by the
    /// external profiler integration).
    pub mode: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub log: LogConfig,
    pub profile: ProfileConfig,
}

/// Optional overrides, typically parsed from the CLI. `None` fields
/// leave the environment-derived value in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub log_format: Option<String>,
    pub log_timestamps: Option<bool>,
    pub log_timestamp_format: Option<String>,
    pub log_full_paths: Option<bool>,
    pub profile: Option<String>,
    pub profile_path: Option<PathBuf>,
}

impl Config {
    /// Read the `HEXES_*` environment.
    pub fn from_env() -> Config {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Environment parsing against an explicit lookup, for tests.
    pub fn from_lookup<F>(get: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        if let Some(level) = get("HEXES_LOG_LEVEL").filter(|s| !s.is_empty()) {
            cfg.log.level = level;
        }
        cfg.log.file = get("HEXES_LOG_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        if let Some(format) = get("HEXES_LOG_FORMAT") {
            cfg.log.format = LogFormat::parse(&format);
        }
        if let Some(ts) = get("HEXES_LOG_TIMESTAMPS") {
            cfg.log.timestamps = parse_bool(&ts);
        }
        cfg.log.timestamp_format = get("HEXES_LOG_TIMESTAMP_FORMAT").filter(|s| !s.is_empty());
        if let Some(fp) = get("HEXES_LOG_FULL_PATHS") {
            cfg.log.full_paths = parse_bool(&fp);
        }
        cfg.profile.mode = get("HEXES_PROFILE").filter(|s| !s.is_empty());
        cfg.profile.path = get("HEXES_PROFILE_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        cfg
    }

    /// Fold CLI overrides over the environment-derived record.
    pub fn apply(mut self, o: Overrides) -> Config {
        if let Some(level) = o.log_level {
            self.log.level = level;
        }
        if let Some(file) = o.log_file {
            self.log.file = Some(file);
        }
        if let Some(format) = o.log_format {
            self.log.format = LogFormat::parse(&format);
        }
        if let Some(ts) = o.log_timestamps {
            self.log.timestamps = ts;
        }
        if let Some(fmt) = o.log_timestamp_format {
            self.log.timestamp_format = Some(fmt);
        }
        if let Some(fp) = o.log_full_paths {
            self.log.full_paths = fp;
        }
        if let Some(mode) = o.profile {
            self.profile.mode = Some(mode);
        }
        if let Some(path) = o.profile_path {
            self.profile.path = Some(path);
        }
        self
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |name| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg.log.level, "warn");
        assert_eq!(cfg.log.format, LogFormat::Text);
        assert!(cfg.log.timestamps);
        assert!(cfg.log.file.is_none());
        assert!(cfg.profile.mode.is_none());
    }

    #[test]
    fn environment_is_read() {
        let cfg = Config::from_lookup(lookup(&[
            ("HEXES_LOG_LEVEL", "debug"),
            ("HEXES_LOG_FILE", "/tmp/hexes.log"),
            ("HEXES_LOG_FORMAT", "json"),
            ("HEXES_LOG_TIMESTAMPS", "no"),
            ("HEXES_LOG_FULL_PATHS", "1"),
            ("HEXES_PROFILE", "cpu"),
        ]));
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.log.file.as_deref(), Some(std::path::Path::new("/tmp/hexes.log")));
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert!(!cfg.log.timestamps);
        assert!(cfg.log.full_paths);
        assert_eq!(cfg.profile.mode.as_deref(), Some("cpu"));
    }

    #[test]
    fn unknown_format_falls_back_to_text() {
        assert_eq!(LogFormat::parse("fancy"), LogFormat::Text);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
    }

    #[test]
    fn overrides_win_over_environment() {
        let cfg = Config::from_lookup(lookup(&[("HEXES_LOG_LEVEL", "debug")])).apply(Overrides {
            log_level: Some("trace".into()),
            log_format: Some("pretty".into()),
            ..Overrides::default()
        });
        assert_eq!(cfg.log.level, "trace");
        assert_eq!(cfg.log.format, LogFormat::Pretty);
    }

    #[test]
    fn empty_values_are_ignored() {
        let cfg = Config::from_lookup(lookup(&[
            ("HEXES_LOG_LEVEL", ""),
            ("HEXES_LOG_FILE", ""),
        ]));
        assert_eq!(cfg.log.level, "warn");
        assert!(cfg.log.file.is_none());
    }
}
