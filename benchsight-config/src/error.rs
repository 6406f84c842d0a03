//! Error types for configuration assembly.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading, merging or querying configuration documents.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration path is not an existing directory.
    #[error("Configuration path '{}' must point to an existing directory", .path.display())]
    InvalidDirectory { path: PathBuf },

    /// A configuration file could not be read.
    #[error("Failed to read configuration file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid JSON.
    #[error("Invalid JSON configuration in file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A system configuration defines a parameter that already exists.
    #[error("Trying to redefine parameter ({name}). Current value is '{current}', new value is '{new}'")]
    Redefinition {
        name: String,
        current: String,
        new: String,
    },

    /// A parameter descriptor has no `val` field.
    #[error("Invalid parameter ({name}) definition. A descriptor object must define a 'val' field")]
    MissingValue { name: String },

    /// A bare parameter value has a type that cannot be inferred.
    #[error("Unsupported type of parameter {name}: {kind}")]
    UnsupportedType { name: String, kind: &'static str },

    /// A recognized section has the wrong JSON type.
    #[error("Configuration section '{section}' must be a {expected}")]
    InvalidSection {
        section: &'static str,
        expected: &'static str,
    },

    /// A configuration document is not a JSON object.
    #[error("Configuration document must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// A root-level merge value is neither a mapping nor a sequence.
    #[error("In root configuration objects, only dictionaries and lists are allowed (key '{key}')")]
    RootShape { key: String },

    /// A member-level merge value is neither a sequence nor a primitive,
    /// or its shape does not match the destination.
    #[error("Members of configuration must be either lists or primitive types of the same shape (key '{key}')")]
    MemberShape { key: String },

    /// A query or scrape pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A scraped line did not match the key-value pattern.
    #[error("Cannot match key-value from '{line}' with pattern '{pattern}'")]
    UnmatchedLine { line: String, pattern: String },

    /// A scraped value is not valid JSON.
    #[error("Cannot parse JSON string '{value}' with key '{key}' (key-value definition: '{line}'): {source}")]
    KeyValue {
        key: String,
        value: String,
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Name of a JSON value's type, used in diagnostics.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
