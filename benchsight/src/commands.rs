//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use benchsight_common::Capabilities;
use benchsight_config::{ConfigurationAssembler, Policy, add_key_values, matches};
use benchsight_monitor::{MonitorSettings, ResourceMonitor};

/// Assemble a configuration directory and print the result.
pub fn config(
    dir: &Path,
    files: &[PathBuf],
    user: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let mut assembler = ConfigurationAssembler::new(dir);
    if !files.is_empty() {
        assembler = assembler.with_files(files.iter().cloned());
    }

    let mut loaded = assembler
        .load()
        .with_context(|| format!("Failed to load configuration from '{}'", dir.display()))?;

    if let Some(user) = user {
        loaded
            .apply_user_file(user)
            .with_context(|| format!("Failed to apply user configuration '{}'", user.display()))?;
    }

    write_json(&loaded, output)
}

/// Print the documents of a JSON array that match a query.
pub fn query(input: &Path, query: &str, policy: Policy) -> Result<()> {
    let query: Value = serde_json::from_str(query).context("Query must be a JSON object")?;
    let Value::Object(query) = query else {
        bail!("Query must be a JSON object");
    };

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    let documents: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("'{}' must contain a JSON array", input.display()))?;

    let mut selected = Vec::new();
    for document in documents {
        let Value::Object(fields) = &document else {
            warn!("Skipping non-object entry");
            continue;
        };

        let mut captures = Map::new();
        if matches(fields, &query, policy, Some(&mut captures))? {
            selected.push(json!({"document": document, "captures": captures}));
        }
    }

    info!(matched = selected.len(), "Query finished");
    write_json(&selected, None)
}

/// Scrape `__key__=value` lines from a log file.
pub fn scrape(log: &Path, pattern: &str, keys: &[String], must_match: bool) -> Result<()> {
    let content = std::fs::read_to_string(log)
        .with_context(|| format!("Failed to read '{}'", log.display()))?;

    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    let only_keys = (!keys.is_empty()).then_some(keys.as_slice());

    let mut values = Map::new();
    add_key_values(&mut values, content.lines(), pattern, must_match, only_keys)
        .with_context(|| format!("Failed to scrape '{}'", log.display()))?;

    write_json(&values, None)
}

/// Record resource usage for a fixed duration or until Ctrl+C.
pub async fn monitor(
    settings: MonitorSettings,
    duration: Option<f64>,
    output: Option<&Path>,
) -> Result<()> {
    let capabilities = Capabilities::probe(Some(settings.launcher.as_path()));
    if !capabilities.monitor {
        bail!(
            "Resource monitor launcher '{}' is not available",
            settings.launcher.display()
        );
    }
    settings.validate()?;
    if let Some(secs) = duration.filter(|s| !s.is_finite() || *s < 0.0) {
        bail!("Duration must be a non-negative number of seconds, got {}", secs);
    }

    let mut monitor = ResourceMonitor::new(settings);
    monitor.run()?;

    match duration {
        Some(secs) => {
            info!(seconds = secs, "Recording resource usage");
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs_f64(secs)) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        None => {
            info!("Recording resource usage. Press Ctrl+C to stop.");
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
            }
        }
    }

    monitor.stop().await?;
    let measurements = monitor.get_measurements()?;

    write_json(&measurements, output)
}

/// Write pretty JSON to `output`, creating its parent folder, or to stdout.
fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create '{}'", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(file = %path.display(), "Output written");
        }
        None => println!("{}", text),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_json_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");

        write_json(&json!({"a": 1}), Some(&path)).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"a": 1}));
    }

    #[test]
    fn test_config_command_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.json"),
            r#"{"parameters": {"exp.framework": {"val": "tensorflow", "type": "str", "desc": "Framework."}}}"#,
        )
        .unwrap();
        let out = dir.path().join("out/config.json");

        config(dir.path(), &[], None, Some(&out)).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["config"]["parameters"]["exp.framework"], json!("tensorflow"));
        assert_eq!(written["params"]["exp.framework"]["type"], json!("str"));
    }

    #[tokio::test]
    async fn test_monitor_requires_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MonitorSettings::new(dir.path().join("missing.sh"), dir.path());

        assert!(monitor(settings, Some(0.1), None).await.is_err());
    }
}
