//! Agent options.
//!
//! The host passes a single string after the library path, e.g.
//! `archive=/data/local/tmp/pcall.dex.jar,heap_class=java/lang/String,log=pcall=debug`.
//! Pairs are comma separated; a value runs to the next comma and may itself
//! contain `=`.

use std::path::PathBuf;
use std::str::FromStr;

use crate::companion::CompanionConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentOptions {
    /// `archive=`: companion archive path.
    pub archive: Option<PathBuf>,
    /// `companion=`: companion class, internal name.
    pub companion_class: Option<String>,
    /// `init=`: companion static initializer.
    pub init_method: Option<String>,
    /// `heap_class=`: restrict the heap walk to instances of this class.
    pub heap_class: Option<String>,
    /// `log=`: `tracing` filter directives.
    pub log_filter: Option<String>,
    /// `log_file=`: append records here instead of stderr.
    pub log_file: Option<PathBuf>,
    /// `no_heap`
    pub skip_heap: bool,
    /// `no_companion`
    pub skip_companion: bool,
}

impl AgentOptions {
    pub fn parse(options: &str) -> Result<Self, ConfigError> {
        let mut parsed = AgentOptions::default();

        for pair in options.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (pair, None),
            };

            match (key, value) {
                ("no_heap", None) => parsed.skip_heap = true,
                ("no_companion", None) => parsed.skip_companion = true,
                ("no_heap" | "no_companion", Some(_)) => {
                    return Err(ConfigError::UnexpectedValue(key.to_string()))
                }
                (_, None) | (_, Some("")) if is_valued(key) => {
                    return Err(ConfigError::MissingValue(key.to_string()))
                }
                ("archive", Some(v)) => parsed.archive = Some(PathBuf::from(v)),
                ("companion", Some(v)) => parsed.companion_class = Some(v.to_string()),
                ("init", Some(v)) => parsed.init_method = Some(v.to_string()),
                ("heap_class", Some(v)) => parsed.heap_class = Some(v.to_string()),
                ("log", Some(v)) => parsed.log_filter = Some(v.to_string()),
                ("log_file", Some(v)) => parsed.log_file = Some(PathBuf::from(v)),
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            }
        }

        Ok(parsed)
    }

    /// Companion settings with the options layered over the defaults.
    pub fn companion_config(&self) -> CompanionConfig {
        let mut config = CompanionConfig::default();
        if let Some(archive) = &self.archive {
            config.archive = archive.clone();
        }
        if let Some(class_name) = &self.companion_class {
            config.class_name = class_name.clone();
        }
        if let Some(init_method) = &self.init_method {
            config.init_method = init_method.clone();
        }
        config
    }
}

fn is_valued(key: &str) -> bool {
    matches!(key, "archive" | "companion" | "init" | "heap_class" | "log" | "log_file")
}

impl FromStr for AgentOptions {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentOptions::parse(s)
    }
}
