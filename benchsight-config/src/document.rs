//! Configuration documents and the fragment merge rules.
//!
//! A configuration document is a JSON object whose recognized top-level
//! sections are `parameters` and `variables` (objects) and `extensions`
//! (an array). Fragments are merged into a running document:
//!
//! | level    | source value | effect                                   |
//! |----------|--------------|------------------------------------------|
//! | root     | mapping      | merged member-wise into the destination  |
//! | root     | sequence     | appended to the destination sequence     |
//! | root     | scalar       | rejected                                 |
//! | member   | sequence     | replaces the destination value           |
//! | member   | scalar       | replaces the destination value           |
//! | member   | mapping      | rejected                                 |
//!
//! Root sequences therefore accumulate across fragments while member
//! sequences are overwritten.

use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Section holding parameter values or descriptors.
pub const PARAMETERS: &str = "parameters";
/// Section holding experiment variables.
pub const VARIABLES: &str = "variables";
/// Section holding extensions.
pub const EXTENSIONS: &str = "extensions";

/// A JSON object, the shape of every configuration document.
pub type Document = Map<String, Value>;

/// Structural shape of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'a> {
    Mapping(&'a Map<String, Value>),
    Sequence(&'a [Value]),
    /// Strings, numbers, booleans and null.
    Scalar(&'a Value),
}

impl<'a> Shape<'a> {
    /// Classify a JSON value.
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Shape::Mapping(map),
            Value::Array(items) => Shape::Sequence(items),
            other => Shape::Scalar(other),
        }
    }

    fn same_kind(&self, other: &Shape<'_>) -> bool {
        matches!(
            (self, other),
            (Shape::Mapping(_), Shape::Mapping(_))
                | (Shape::Sequence(_), Shape::Sequence(_))
                | (Shape::Scalar(_), Shape::Scalar(_))
        )
    }
}

/// View a parsed JSON value as a configuration document.
pub fn as_document(value: &Value) -> Result<&Document> {
    value.as_object().ok_or(ConfigError::NotAnObject {
        found: crate::error::kind_of(value),
    })
}

/// Deep-merge `source` into `dest`.
///
/// `root` selects the rule set: `true` for whole configuration documents,
/// `false` for the members of a section. See the module documentation for
/// the rule table. On error `dest` may be partially updated.
pub fn merge(dest: &mut Document, source: &Document, root: bool) -> Result<()> {
    for (key, value) in source {
        match (root, Shape::of(value)) {
            (true, Shape::Mapping(section)) => {
                let slot = dest
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                match slot {
                    Value::Object(existing) => merge(existing, section, false)?,
                    _ => return Err(ConfigError::RootShape { key: key.clone() }),
                }
            }
            (true, Shape::Sequence(items)) => {
                let slot = dest
                    .entry(key.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(existing) => existing.extend(items.iter().cloned()),
                    _ => return Err(ConfigError::RootShape { key: key.clone() }),
                }
            }
            (true, Shape::Scalar(_)) => {
                return Err(ConfigError::RootShape { key: key.clone() });
            }
            (false, Shape::Mapping(_)) => {
                return Err(ConfigError::MemberShape { key: key.clone() });
            }
            (false, incoming @ (Shape::Sequence(_) | Shape::Scalar(_))) => {
                if let Some(existing) = dest.get(key) {
                    if !Shape::of(existing).same_kind(&incoming) {
                        return Err(ConfigError::MemberShape { key: key.clone() });
                    }
                }
                dest.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(())
}
