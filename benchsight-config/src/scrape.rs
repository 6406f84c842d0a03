//! Key-value scraping from benchmark logs.
//!
//! Benchmark backends print their results as `__key__=value` lines where
//! the value is a JSON literal:
//!
//! ```text
//! __exp.framework__="tensorflow"
//! __results.time__= 34.12
//! ```

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::query::compile_anchored;

/// Pattern for `__key__=value` log lines.
pub const DEFAULT_PATTERN: &str = r"[ \t]*__(.+?)__[ \t]*=(.*)";

/// Parse key-value lines into `dictionary`.
///
/// Each line is matched at its start against `pattern`, whose first group
/// is the key and second group the JSON-encoded value (an empty value
/// becomes `null`). Lines that do not match are skipped, or rejected when
/// `must_match` is set. With `only_keys`, other keys are ignored. Existing
/// entries are overwritten. Returns the number of entries written.
pub fn add_key_values<I, S>(
    dictionary: &mut Map<String, Value>,
    lines: I,
    pattern: &str,
    must_match: bool,
    only_keys: Option<&[&str]>,
) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let regex = compile_anchored(pattern)?;
    let mut added = 0;

    for line in lines {
        let line = line.as_ref();
        let Some(groups) = regex.captures(line) else {
            if must_match {
                return Err(ConfigError::UnmatchedLine {
                    line: line.to_string(),
                    pattern: pattern.to_string(),
                });
            }
            continue;
        };

        let key = groups.get(1).map_or("", |m| m.as_str()).trim();
        let raw = groups.get(2).map_or("", |m| m.as_str()).trim();
        let value = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(raw).map_err(|source| ConfigError::KeyValue {
                key: key.to_string(),
                value: raw.to_string(),
                line: line.to_string(),
                source,
            })?
        };

        if only_keys.is_none_or(|keys| keys.contains(&key)) {
            debug!(key = %key, value = %value, "Key-value item parsed");
            dictionary.insert(key.to_string(), value);
            added += 1;
        }
    }

    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LOG: &str = r#"
Running benchmark...
__exp.framework__="tensorflow"
  __exp.effective_batch__= 256
__results.time__=34.5
__results.time_data__=[34.1, 34.9]
__exp.status__=
"#;

    #[test]
    fn test_scrape_log() {
        let mut dict = Map::new();
        let added = add_key_values(&mut dict, LOG.lines(), DEFAULT_PATTERN, false, None).unwrap();

        assert_eq!(added, 5);
        assert_eq!(dict["exp.framework"], json!("tensorflow"));
        assert_eq!(dict["exp.effective_batch"], json!(256));
        assert_eq!(dict["results.time"], json!(34.5));
        assert_eq!(dict["results.time_data"], json!([34.1, 34.9]));
        assert_eq!(dict["exp.status"], Value::Null);
    }

    #[test]
    fn test_only_keys() {
        let mut dict = Map::new();
        add_key_values(
            &mut dict,
            LOG.lines(),
            DEFAULT_PATTERN,
            false,
            Some(["results.time"].as_slice()),
        )
        .unwrap();

        assert_eq!(dict.len(), 1);
        assert_eq!(dict["results.time"], json!(34.5));
    }

    #[test]
    fn test_must_match() {
        let mut dict = Map::new();
        let err = add_key_values(&mut dict, LOG.lines(), DEFAULT_PATTERN, true, None).unwrap_err();
        assert!(matches!(err, ConfigError::UnmatchedLine { .. }));
    }

    #[test]
    fn test_invalid_json_value() {
        let mut dict = Map::new();
        let err = add_key_values(
            &mut dict,
            ["__exp.model__=resnet50"],
            DEFAULT_PATTERN,
            false,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::KeyValue { key, .. } if key == "exp.model"));
    }

    #[test]
    fn test_later_lines_overwrite() {
        let mut dict = Map::new();
        add_key_values(
            &mut dict,
            ["__a__=1", "__a__=2"],
            DEFAULT_PATTERN,
            true,
            None,
        )
        .unwrap();
        assert_eq!(dict["a"], json!(2));
    }
}
