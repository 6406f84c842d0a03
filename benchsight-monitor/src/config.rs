//! Resource monitor settings.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{MonitorError, Result};
use crate::field::FieldSpec;

/// Fields printed by the stock resource monitor script:
/// `proc_pid date virt res shrd cpu mem power gpus_power`.
pub const DEFAULT_FIELDS: &str = "time:str:1,mem_virt:float:2,mem_res:float:3,mem_shrd:float:4,cpu:float:5,mem:float:6,power:float:7,gpus:float:8:";

/// Settings for one resource monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    /// Path to the resource monitor script.
    pub launcher: PathBuf,

    /// Folder holding the `proc.pid` marker file (default: system temp dir).
    #[serde(default = "default_pid_folder")]
    pub pid_folder: PathBuf,

    /// Sampling interval in seconds (default: 0.1).
    #[serde(default = "default_frequency")]
    pub frequency: f64,

    /// How sample lines are decoded.
    #[serde(default = "default_fields")]
    pub fields: FieldSpec,
}

fn default_pid_folder() -> PathBuf {
    std::env::temp_dir()
}

fn default_frequency() -> f64 {
    0.1
}

fn default_fields() -> FieldSpec {
    FieldSpec::parse(DEFAULT_FIELDS).expect("default field spec is valid")
}

impl MonitorSettings {
    pub fn new(launcher: impl Into<PathBuf>, pid_folder: impl Into<PathBuf>) -> Self {
        Self {
            launcher: launcher.into(),
            pid_folder: pid_folder.into(),
            frequency: default_frequency(),
            fields: default_fields(),
        }
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_fields(mut self, fields: FieldSpec) -> Self {
        self.fields = fields;
        self
    }

    /// Check values that deserialization cannot.
    pub fn validate(&self) -> Result<()> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(MonitorError::Settings(format!(
                "frequency must be a positive number of seconds, got {}",
                self.frequency
            )));
        }
        if !self.pid_folder.is_dir() {
            return Err(MonitorError::Settings(format!(
                "pid folder '{}' is not a directory",
                self.pid_folder.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: MonitorSettings =
            serde_json::from_str(r#"{"launcher": "/opt/bench/resource_monitor.sh"}"#).unwrap();

        assert_eq!(settings.frequency, 0.1);
        assert_eq!(settings.pid_folder, std::env::temp_dir());
        assert_eq!(settings.fields.fields().len(), 8);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_custom_fields() {
        let settings: MonitorSettings = serde_json::from_str(
            r#"{"launcher": "monitor.sh", "frequency": 0.5, "fields": "t:str:0,x:float:1:2"}"#,
        )
        .unwrap();

        assert_eq!(settings.frequency, 0.5);
        assert_eq!(settings.fields.to_string(), "t:str:0,x:float:1:2");
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let result = serde_json::from_str::<MonitorSettings>(
            r#"{"launcher": "monitor.sh", "fields": "t:str:0,t:int:1"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MonitorSettings::new("monitor.sh", dir.path());
        assert!(settings.validate().is_ok());
        assert!(settings.clone().with_frequency(0.0).validate().is_err());
        assert!(
            MonitorSettings::new("monitor.sh", dir.path().join("missing"))
                .validate()
                .is_err()
        );
    }
}
