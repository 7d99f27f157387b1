//! Declarative configuration tree.
//!
//! A [`ConfigNode`] is a tag with string attributes and child nodes, the
//! shape robot descriptions are written in. Attribute values stay strings
//! until a component asks for them with a concrete type, so one malformed
//! value only fails the component that reads it.

use crate::error::ConfigError;
use crate::math::{quat_from_euler_degrees, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of a configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute insertion.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style child insertion.
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    /// Parse a tree from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Document {
            reason: err.to_string(),
        })
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = &ConfigNode> {
        self.children.iter()
    }

    /// Children carrying the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ConfigNode> {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    pub fn raw_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Required attribute.
    pub fn attribute<T: ParseAttribute>(&self, name: &str) -> Result<T, ConfigError> {
        let raw = self
            .raw_attribute(name)
            .ok_or_else(|| ConfigError::MissingAttribute {
                tag: self.tag.clone(),
                attribute: name.to_string(),
            })?;
        self.parse_value(name, raw)
    }

    /// Optional attribute; `default` when absent, an error when present but malformed.
    pub fn attribute_or<T: ParseAttribute>(&self, name: &str, default: T) -> Result<T, ConfigError> {
        match self.raw_attribute(name) {
            Some(raw) => self.parse_value(name, raw),
            None => Ok(default),
        }
    }

    fn parse_value<T: ParseAttribute>(&self, name: &str, raw: &str) -> Result<T, ConfigError> {
        T::parse_attribute(raw.trim()).map_err(|reason| ConfigError::MalformedAttribute {
            tag: self.tag.clone(),
            attribute: name.to_string(),
            value: raw.to_string(),
            reason,
        })
    }
}

/// Conversion from an attribute string.
pub trait ParseAttribute: Sized {
    fn parse_attribute(raw: &str) -> Result<Self, String>;
}

impl ParseAttribute for String {
    fn parse_attribute(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl ParseAttribute for f32 {
    fn parse_attribute(raw: &str) -> Result<Self, String> {
        let value: f32 = raw.parse().map_err(|err| format!("{err}"))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err("value is not finite".to_string())
        }
    }
}

impl ParseAttribute for usize {
    fn parse_attribute(raw: &str) -> Result<Self, String> {
        raw.parse().map_err(|err| format!("{err}"))
    }
}

impl ParseAttribute for u32 {
    fn parse_attribute(raw: &str) -> Result<Self, String> {
        raw.parse().map_err(|err| format!("{err}"))
    }
}

impl ParseAttribute for bool {
    fn parse_attribute(raw: &str) -> Result<Self, String> {
        raw.parse().map_err(|err| format!("{err}"))
    }
}

fn parse_triple(raw: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 comma-separated values, got {}", parts.len()));
    }
    let mut out = [0.0f32; 3];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = f32::parse_attribute(part)?;
    }
    Ok(out)
}

impl ParseAttribute for Vec3 {
    fn parse_attribute(raw: &str) -> Result<Self, String> {
        parse_triple(raw).map(Vec3::from_array)
    }
}

/// Orientation written as `"z,y,x"` Euler angles in degrees.
impl ParseAttribute for Quat {
    fn parse_attribute(raw: &str) -> Result<Self, String> {
        let [z, y, x] = parse_triple(raw)?;
        Ok(quat_from_euler_degrees(z, y, x))
    }
}
