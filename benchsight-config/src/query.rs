//! Matching configuration or result documents against queries.
//!
//! A query maps field names to conditions:
//!
//! - a string is a regular expression matched at the start of the field value,
//! - a list is a set of accepted values,
//! - any other value must be equal to the field value.
//!
//! ```json
//! {"exp.framework": ["tensorflow", "caffe2"], "exp.model": "resnet(\\d+)"}
//! ```

use std::borrow::Cow;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::{ConfigError, Result};

/// How to treat query fields that are missing from the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Every query field must be present.
    Strict,
    /// Missing fields are skipped.
    #[default]
    Relaxed,
}

impl std::str::FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Policy::Strict),
            "relaxed" => Ok(Policy::Relaxed),
            other => Err(format!(
                "Invalid match policy '{}' (expected 'strict' or 'relaxed')",
                other
            )),
        }
    }
}

/// Check whether `document` satisfies every condition of `query`.
///
/// When the document matches and `captures` is given, it receives
/// `<field>_0` with the matched document value and, for pattern
/// conditions, `<field>_<n>` with capture group `n` (`null` when the group
/// did not participate). Nothing is recorded for a failed match.
pub fn matches(
    document: &Document,
    query: &Document,
    policy: Policy,
    captures: Option<&mut Map<String, Value>>,
) -> Result<bool> {
    let mut found = Map::new();

    for (field, condition) in query {
        let Some(actual) = document.get(field) else {
            match policy {
                Policy::Relaxed => continue,
                Policy::Strict => return Ok(false),
            }
        };

        match condition {
            Value::String(pattern) => {
                let regex = compile_anchored(pattern)?;
                let text = value_text(actual);
                let Some(groups) = regex.captures(&text) else {
                    return Ok(false);
                };

                found.insert(format!("{}_0", field), actual.clone());
                for index in 1..groups.len() {
                    let group = groups
                        .get(index)
                        .map(|m| Value::String(m.as_str().to_string()))
                        .unwrap_or(Value::Null);
                    found.insert(format!("{}_{}", field, index), group);
                }
            }
            Value::Array(accepted) => {
                if !accepted.iter().any(|value| same_value(value, actual)) {
                    return Ok(false);
                }
                found.insert(format!("{}_0", field), actual.clone());
            }
            single => {
                if !same_value(actual, single) {
                    return Ok(false);
                }
                found.insert(format!("{}_0", field), actual.clone());
            }
        }
    }

    if let Some(captures) = captures {
        captures.extend(found);
    }

    Ok(true)
}

/// Compile `pattern` so that it only matches at the start of the input.
pub(crate) fn compile_anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(ConfigError::from)
}

/// Equality where `32` and `32.0` are the same number.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_set_membership() {
        let query = doc(json!({"k": ["a", "b"]}));

        for (value, expected) in [("a", true), ("b", true), ("c", false)] {
            let document = doc(json!({"k": value}));
            assert_eq!(
                matches(&document, &query, Policy::Strict, None).unwrap(),
                expected,
                "value {}",
                value
            );
        }
    }

    #[test]
    fn test_missing_field_policy() {
        let document = doc(json!({"other": 1}));
        let query = doc(json!({"missing": "x"}));

        assert!(matches(&document, &query, Policy::Relaxed, None).unwrap());
        assert!(!matches(&document, &query, Policy::Strict, None).unwrap());
    }

    #[test]
    fn test_scalar_query_is_single_element_set() {
        let document = doc(json!({"exp.batch": 32}));

        assert!(matches(&document, &doc(json!({"exp.batch": 32})), Policy::Strict, None).unwrap());
        assert!(!matches(&document, &doc(json!({"exp.batch": 64})), Policy::Strict, None).unwrap());
    }

    #[test]
    fn test_integer_and_float_are_equal() {
        let document = doc(json!({"batch": 32, "rate": 0.5}));

        let query = doc(json!({"batch": 32.0}));
        assert!(matches(&document, &query, Policy::Strict, None).unwrap());

        let query = doc(json!({"batch": [16.0, 32.0], "rate": 0.5}));
        assert!(matches(&document, &query, Policy::Strict, None).unwrap());

        let query = doc(json!({"batch": [16, 64]}));
        assert!(!matches(&document, &query, Policy::Strict, None).unwrap());
    }

    #[test]
    fn test_pattern_captures() {
        let document = doc(json!({"exp.model": "resnet50", "exp.framework": "tensorflow"}));
        let query = doc(json!({"exp.model": "([a-z]+)(\\d+)", "exp.framework": ["tensorflow"]}));
        let mut captures = Map::new();

        assert!(matches(&document, &query, Policy::Strict, Some(&mut captures)).unwrap());
        assert_eq!(captures["exp.model_0"], json!("resnet50"));
        assert_eq!(captures["exp.model_1"], json!("resnet"));
        assert_eq!(captures["exp.model_2"], json!("50"));
        assert_eq!(captures["exp.framework_0"], json!("tensorflow"));
    }

    #[test]
    fn test_pattern_is_anchored_at_start() {
        let document = doc(json!({"exp.model": "alexnet"}));

        assert!(!matches(&document, &doc(json!({"exp.model": "net"})), Policy::Strict, None).unwrap());
        assert!(matches(&document, &doc(json!({"exp.model": "alex"})), Policy::Strict, None).unwrap());
    }

    #[test]
    fn test_pattern_against_number() {
        let document = doc(json!({"exp.batch": 128}));
        assert!(matches(&document, &doc(json!({"exp.batch": "1\\d\\d"})), Policy::Strict, None).unwrap());
    }

    #[test]
    fn test_optional_group_records_null() {
        let document = doc(json!({"exp.model": "vgg"}));
        let query = doc(json!({"exp.model": "vgg(\\d+)?"}));
        let mut captures = Map::new();

        assert!(matches(&document, &query, Policy::Strict, Some(&mut captures)).unwrap());
        assert_eq!(captures["exp.model_1"], Value::Null);
    }

    #[test]
    fn test_failed_match_records_nothing() {
        let document = doc(json!({"a": "x", "b": "y"}));
        let query = doc(json!({"a": ["x"], "b": ["z"]}));
        let mut captures = Map::new();

        assert!(!matches(&document, &query, Policy::Strict, Some(&mut captures)).unwrap());
        assert!(captures.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let document = doc(json!({"a": "x"}));
        assert!(matches!(
            matches(&document, &doc(json!({"a": "("})), Policy::Strict, None),
            Err(ConfigError::Pattern(_))
        ));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("strict".parse::<Policy>().unwrap(), Policy::Strict);
        assert_eq!("relaxed".parse::<Policy>().unwrap(), Policy::Relaxed);
        assert!("loose".parse::<Policy>().is_err());
    }
}
