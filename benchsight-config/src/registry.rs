//! Typed parameter descriptors.
//!
//! The `parameters` section of a configuration fragment maps a parameter
//! name either to a bare value or to a descriptor object:
//!
//! ```json
//! {
//!     "parameters": {
//!         "exp.framework": {"val": "tensorflow", "type": "str", "desc": "Framework to benchmark."},
//!         "exp.num_warmup_batches": 1
//!     }
//! }
//! ```
//!
//! The registry keeps one descriptor per name. System fragments may never
//! redefine a name; user fragments may only change the value of an existing
//! parameter or introduce new ones.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::document::{PARAMETERS, as_document};
use crate::error::{ConfigError, Result, kind_of};

/// Description attached to bare parameter values.
pub const AUTO_DESCRIPTION: &str =
    "No description for this parameter provided (it was automatically converted from its value).";

/// Value category of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Str,
    Float,
    Bool,
}

impl ParamType {
    /// Infer the category of a bare value.
    ///
    /// Strings and lists are both `str`. Objects and null have no category.
    pub fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) | Value::Array(_) => Some(ParamType::Str),
            Value::Bool(_) => Some(ParamType::Bool),
            Value::Number(n) if n.is_f64() => Some(ParamType::Float),
            Value::Number(_) => Some(ParamType::Int),
            Value::Null | Value::Object(_) => None,
        }
    }
}

/// Parameter help text, either a single string or a list of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Description {
    Text(String),
    Lines(Vec<String>),
}

/// A named, typed configuration knob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Current value.
    pub val: Value,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ParamType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Description>,

    /// Any other fields the descriptor carried (constraints and the like).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParameterDescriptor {
    /// Descriptor synthesized from a bare value.
    fn from_value(val: Value, kind: ParamType) -> Self {
        Self {
            val,
            kind: Some(kind),
            desc: Some(Description::Text(AUTO_DESCRIPTION.to_string())),
            extra: Map::new(),
        }
    }

    /// Descriptor taken as written. `type` and `desc` values that do not
    /// have a known form are kept untouched in `extra`.
    fn adopt(val: Value, fields: &Map<String, Value>) -> Self {
        let mut extra = fields.clone();
        extra.remove("val");
        let kind = take_known(&mut extra, "type");
        let desc = take_known(&mut extra, "desc");

        Self {
            val,
            kind,
            desc,
            extra,
        }
    }
}

fn take_known<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let parsed = T::deserialize(fields.get(key)?).ok()?;
    fields.remove(key);
    Some(parsed)
}

/// Where a configuration fragment comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Authoritative defaults shipped with the harness.
    System,
    /// Overrides supplied by the user.
    User,
}

/// Parameter descriptors keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterRegistry {
    params: BTreeMap<String, ParameterDescriptor>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update descriptors from the `parameters` section of `document`.
    ///
    /// Documents without a `parameters` section are ignored. On error the
    /// registry may hold the parameters processed before the failing one.
    pub fn update(&mut self, document: &Value, origin: Origin) -> Result<()> {
        let document = as_document(document)?;
        let Some(params) = document.get(PARAMETERS) else {
            return Ok(());
        };
        let params = params.as_object().ok_or(ConfigError::InvalidSection {
            section: PARAMETERS,
            expected: "dictionary",
        })?;

        for (name, value) in params {
            if origin == Origin::System {
                if let Some(current) = self.params.get(name) {
                    return Err(ConfigError::Redefinition {
                        name: name.clone(),
                        current: current.val.to_string(),
                        new: value.to_string(),
                    });
                }
            }

            match value {
                Value::Object(fields) => self.update_descriptor(name, value, fields)?,
                bare => self.update_value(name, bare)?,
            }
        }

        Ok(())
    }

    fn update_descriptor(
        &mut self,
        name: &str,
        value: &Value,
        fields: &Map<String, Value>,
    ) -> Result<()> {
        let Some(val) = fields.get("val") else {
            return Err(ConfigError::MissingValue {
                name: name.to_string(),
            });
        };

        match self.params.get_mut(name) {
            Some(existing) => {
                if fields.len() > 1 {
                    warn!(
                        parameter = %name,
                        provided = %value,
                        existing = %existing.val,
                        "User provided parameter entirely redefines existing parameter. Normally, only value needs to be provided."
                    );
                }
                existing.val = val.clone();
            }
            None => {
                self.params.insert(
                    name.to_string(),
                    ParameterDescriptor::adopt(val.clone(), fields),
                );
            }
        }

        Ok(())
    }

    fn update_value(&mut self, name: &str, value: &Value) -> Result<()> {
        let kind = ParamType::infer(value).ok_or(ConfigError::UnsupportedType {
            name: name.to_string(),
            kind: kind_of(value),
        })?;

        match self.params.get_mut(name) {
            Some(existing) => existing.val = value.clone(),
            None => {
                self.params.insert(
                    name.to_string(),
                    ParameterDescriptor::from_value(value.clone(), kind),
                );
            }
        }

        Ok(())
    }

    /// Get a parameter descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.get(name)
    }

    /// Check if a parameter is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Number of registered parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterDescriptor)> {
        self.params.iter().map(|(name, d)| (name.as_str(), d))
    }
}

/// Return a copy of `document` with every parameter descriptor replaced by
/// its bare `val`. The input is left untouched.
pub fn remove_info(document: &Value) -> Result<Value> {
    let mut clean = as_document(document)?.clone();

    if let Some(params) = clean.get_mut(PARAMETERS) {
        let params = params.as_object_mut().ok_or(ConfigError::InvalidSection {
            section: PARAMETERS,
            expected: "dictionary",
        })?;

        for (name, value) in params.iter_mut() {
            if let Value::Object(fields) = value {
                let val = fields.remove("val").ok_or_else(|| ConfigError::MissingValue {
                    name: name.clone(),
                })?;
                *value = val;
            }
        }
    }

    Ok(Value::Object(clean))
}
