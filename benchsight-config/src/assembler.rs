//! Configuration assembly from a directory of JSON fragments.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::document::{Document, as_document, merge};
use crate::error::{ConfigError, Result};
use crate::registry::{Origin, ParameterRegistry, remove_info};

/// Result of assembling configuration fragments.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadedConfig {
    /// Fragments in the order they were merged.
    pub files: Vec<PathBuf>,
    /// Merged document with bare parameter values.
    #[serde(rename = "config")]
    pub document: Document,
    /// Parameter descriptors collected from all fragments.
    #[serde(rename = "params")]
    pub registry: ParameterRegistry,
}

impl LoadedConfig {
    /// Fold one parsed fragment into the assembled configuration.
    ///
    /// The registry sees the raw fragment, the document receives the
    /// fragment with descriptors reduced to their values.
    pub fn merge_fragment(&mut self, fragment: &Value, origin: Origin) -> Result<()> {
        self.registry.update(fragment, origin)?;
        let clean = remove_info(fragment)?;
        merge(&mut self.document, as_document(&clean)?, true)
    }

    /// Apply a user-supplied fragment on top of the system configuration.
    pub fn apply_user_config(&mut self, fragment: &Value) -> Result<()> {
        self.merge_fragment(fragment, Origin::User)
    }

    /// Read a user-supplied fragment from disk and apply it.
    pub fn apply_user_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!(file = %path.display(), "Loading user configuration");
        let fragment = read_fragment(path)?;
        self.apply_user_config(&fragment)
    }

    /// Value of a parameter in the merged document.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.document
            .get(crate::document::PARAMETERS)
            .and_then(|params| params.get(name))
    }
}

/// Loads system configuration fragments from a directory.
///
/// # Example
///
/// ```ignore
/// use benchsight_config::ConfigurationAssembler;
///
/// let loaded = ConfigurationAssembler::new("configs")
///     .with_files(["base.json", "tensorflow.json"])
///     .load()?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigurationAssembler {
    dir: PathBuf,
    files: Option<Vec<PathBuf>>,
}

impl ConfigurationAssembler {
    /// Assembler for every `*.json` file directly under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: None,
        }
    }

    /// Restrict loading to these files, relative to the directory, in order.
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Resolve the fragment paths to load.
    ///
    /// Without an explicit file list the order is whatever the directory
    /// listing yields.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(ConfigError::InvalidDirectory {
                path: self.dir.clone(),
            });
        }

        if let Some(files) = &self.files {
            return Ok(files.iter().map(|f| self.dir.join(f)).collect());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|source| ConfigError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                found.push(path);
            }
        }

        Ok(found)
    }

    /// Load and merge all fragments as system configuration.
    pub fn load(&self) -> Result<LoadedConfig> {
        let files = self.discover()?;
        let mut loaded = LoadedConfig::default();

        for file in &files {
            debug!(file = %file.display(), "Loading configuration");
            let fragment = read_fragment(file)?;
            loaded.merge_fragment(&fragment, Origin::System)?;
        }

        info!(
            dir = %self.dir.display(),
            files = files.len(),
            parameters = loaded.registry.len(),
            "Configuration assembled"
        );

        loaded.files = files;
        Ok(loaded)
    }
}

/// Load configuration fragments from `path`.
///
/// With `files`, only those names (relative to `path`) are loaded, in the
/// given order. Otherwise every `*.json` file in `path` is loaded.
pub fn load(path: impl Into<PathBuf>, files: Option<&[&str]>) -> Result<LoadedConfig> {
    let assembler = ConfigurationAssembler::new(path);
    match files {
        Some(files) => assembler.with_files(files.iter().copied()).load(),
        None => assembler.load(),
    }
}

fn read_fragment(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| {
        error!(file = %path.display(), error = %source, "Invalid JSON configuration");
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_directory() {
        let err = ConfigurationAssembler::new("/nonexistent/configs")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDirectory { .. }));
    }

    #[test]
    fn test_merge_fragment_keeps_registry_and_document_apart() {
        let mut loaded = LoadedConfig::default();
        loaded
            .merge_fragment(
                &json!({"parameters": {"exp.gpus": {"val": "0", "type": "str", "desc": "GPUs."}}}),
                Origin::System,
            )
            .unwrap();

        assert_eq!(loaded.parameter("exp.gpus"), Some(&json!("0")));
        assert_eq!(
            loaded.registry.get("exp.gpus").unwrap().val,
            json!("0")
        );
    }

    #[test]
    fn test_user_config_updates_both() {
        let mut loaded = LoadedConfig::default();
        loaded
            .merge_fragment(&json!({"parameters": {"exp.batch": 16}}), Origin::System)
            .unwrap();
        loaded
            .apply_user_config(&json!({"parameters": {"exp.batch": {"val": 128}}}))
            .unwrap();

        assert_eq!(loaded.parameter("exp.batch"), Some(&json!(128)));
        assert_eq!(loaded.registry.get("exp.batch").unwrap().val, json!(128));
    }

    #[test]
    fn test_fragment_must_be_object() {
        let mut loaded = LoadedConfig::default();
        assert!(matches!(
            loaded.merge_fragment(&json!([1, 2]), Origin::System),
            Err(ConfigError::NotAnObject { found: "list" })
        ));
    }
}
