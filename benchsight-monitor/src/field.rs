//! Field specs: how a sample line maps to named metric series.
//!
//! A spec is a comma-separated list of `name:type:index[:count]` entries:
//!
//! ```text
//! time:str:1,mem_virt:float:2,cpu:float:5,gpus:float:8:
//! ```
//!
//! - `name:type:index` decodes token `index` into one scalar per sample.
//! - `name:type:index:` decodes token `index` into a one-element list.
//! - `name:type:index:n` decodes tokens `index..index+n` into a list.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::decode::{Measurements, MetricEntry, ValueType, decode};
use crate::error::{MonitorError, Result};

/// How many tokens a field consumes and how the result is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// One token, appended as a scalar.
    Scalar,
    /// One token, appended as a single-element list.
    SingleWrapped,
    /// `n` consecutive tokens, appended as a list.
    Fixed(usize),
}

/// One named field of a sample line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: ValueType,
    /// Zero-based token position.
    pub index: usize,
    pub repeat: Repeat,
}

impl Field {
    fn parse(raw: &str) -> Result<Self> {
        let invalid = || MonitorError::InvalidFieldSpec(raw.to_string());

        let parts: Vec<&str> = raw.split(':').collect();
        if !(3..=4).contains(&parts.len()) || parts[0].is_empty() {
            return Err(invalid());
        }

        let kind: ValueType = parts[1].parse()?;
        let index: usize = parts[2].parse().map_err(|_| invalid())?;
        let repeat = match parts.get(3) {
            None => Repeat::Scalar,
            Some(&"") => Repeat::SingleWrapped,
            Some(count) => match count.parse::<usize>() {
                Ok(n) if n > 0 && index.checked_add(n).is_some() => Repeat::Fixed(n),
                _ => return Err(invalid()),
            },
        };

        Ok(Self {
            name: parts[0].to_string(),
            kind,
            index,
            repeat,
        })
    }

    /// Decode this field from a tokenized sample line.
    pub fn decode(&self, tokens: &[&str], line: &str) -> Result<MetricEntry> {
        let token = |index: usize| {
            tokens
                .get(index)
                .copied()
                .ok_or_else(|| MonitorError::SampleTooShort {
                    field: self.name.clone(),
                    index,
                    len: tokens.len(),
                    line: line.to_string(),
                })
        };

        match self.repeat {
            Repeat::Scalar => Ok(MetricEntry::Scalar(decode(token(self.index)?, self.kind)?)),
            Repeat::SingleWrapped => Ok(MetricEntry::Vector(vec![decode(
                token(self.index)?,
                self.kind,
            )?])),
            Repeat::Fixed(count) => (self.index..self.index + count)
                .map(|i| decode(token(i)?, self.kind))
                .collect::<Result<Vec<_>>>()
                .map(MetricEntry::Vector),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.kind, self.index)?;
        match self.repeat {
            Repeat::Scalar => Ok(()),
            Repeat::SingleWrapped => f.write_str(":"),
            Repeat::Fixed(n) => write!(f, ":{}", n),
        }
    }
}

/// Ordered set of fields with unique names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct FieldSpec {
    fields: Vec<Field>,
}

impl FieldSpec {
    /// Parse a spec string.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();

        for raw in spec.split(',') {
            let field = Field::parse(raw.trim())?;
            if !seen.insert(field.name.clone()) {
                return Err(MonitorError::DuplicateField(field.name));
            }
            fields.push(field);
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Decode every field from one sample line.
    ///
    /// Fails without a partial result if any field cannot be decoded.
    pub fn decode_line(&self, line: &str) -> Result<Vec<(&str, MetricEntry)>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        self.fields
            .iter()
            .map(|field| Ok((field.name.as_str(), field.decode(&tokens, line)?)))
            .collect()
    }

    /// Measurements with an empty series for every field.
    pub fn empty_measurements(&self) -> Measurements {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), Vec::new()))
            .collect()
    }
}

impl FromStr for FieldSpec {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldSpec {
    type Error = MonitorError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
