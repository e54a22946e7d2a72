//! `busmigrate.json` loading.
//!
//! Every field is optional. Values found here override the built-in
//! defaults; command-line flags override both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::migrate::{EventMapping, EventRegistry, MigrateOptions, Strictness};
use crate::utils::io;

pub const CONFIG_FILE_NAME: &str = "busmigrate.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    /// Script extension, with or without the leading dot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Replaces the default skip list when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_dirs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strictness: Option<Strictness>,
    /// Skip the built-in event table and use only `events`.
    pub replace_default_events: bool,
    /// Extra or overriding entries keyed `namespace.event_name`.
    pub events: BTreeMap<String, EventMapping>,
}

impl MigrateConfig {
    /// Load a config file. A missing file is `path.not_found`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::path_not_found(path.display().to_string()));
        }
        let raw = io::read_text(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
    }

    /// Look for `busmigrate.json` in `target` (or its parent when `target` is
    /// a file).
    pub fn discover(target: &Path) -> Result<Option<(PathBuf, Self)>> {
        let dir = if target.is_file() {
            match target.parent() {
                Some(parent) => parent,
                None => return Ok(None),
            }
        } else {
            target
        };

        let candidate = dir.join(CONFIG_FILE_NAME);
        if !candidate.is_file() {
            return Ok(None);
        }

        log_status!("config", "Using {}", candidate.display());
        let config = Self::load(&candidate)?;
        Ok(Some((candidate, config)))
    }

    /// Explicit `--config` wins; otherwise discover next to the target;
    /// otherwise defaults.
    pub fn resolve(explicit: Option<&Path>, target: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::discover(target)?
                .map(|(_, config)| config)
                .unwrap_or_default()),
        }
    }

    pub fn build_registry(&self) -> Result<EventRegistry> {
        let mut registry = if self.replace_default_events {
            EventRegistry::new()
        } else {
            EventRegistry::builtin()
        };
        registry.extend_from_mappings(&self.events)?;
        Ok(registry)
    }

    /// Run options with this config applied over the defaults.
    pub fn options(&self) -> Result<MigrateOptions> {
        let mut options = MigrateOptions::default();
        if let Some(extension) = &self.extension {
            options.extension = normalize_extension(extension)
                .map_err(|problem| Error::config_invalid_value("extension", Some(extension.clone()), problem))?;
        }
        if let Some(skip_dirs) = &self.skip_dirs {
            options.skip_dirs = skip_dirs.clone();
        }
        if let Some(strictness) = self.strictness {
            options.strictness = strictness;
        }
        Ok(options)
    }
}

/// Strip a leading dot and reject empty or path-like extensions.
pub fn normalize_extension(raw: &str) -> std::result::Result<String, String> {
    let ext = raw.trim().trim_start_matches('.');
    if ext.is_empty() {
        return Err("extension must not be empty".to_string());
    }
    if ext.contains(['/', '\\', '.']) || ext.chars().any(char::is_whitespace) {
        return Err(format!("'{}' is not a plain file extension", raw));
    }
    Ok(ext.to_string())
}
