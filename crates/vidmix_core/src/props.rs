// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property values and per-node property sets.
//!
//! Nodes expose their tunable parameters as a flat name -> value map.
//! Animation writes interpolated values into the same map before each
//! tick's dirty propagation, so "a parameter changed" has a single
//! definition for the whole engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a single node property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// 2D vector
    Vec2([f64; 2]),
    /// 4D vector / RGBA color
    Vec4([f64; 4]),
    /// Text value (file paths, URLs, labels)
    Text(String),
}

impl PropValue {
    /// Linearly interpolate toward `other` by `t` in `[0, 1]`.
    ///
    /// Numeric kinds interpolate component-wise; non-numeric kinds and
    /// mismatched kinds step to `other` at `t >= 1` and hold otherwise.
    pub fn lerp(&self, other: &PropValue, t: f64) -> PropValue {
        match (self, other) {
            (PropValue::Float(a), PropValue::Float(b)) => PropValue::Float(a + (b - a) * t),
            (PropValue::Int(a), PropValue::Int(b)) => {
                PropValue::Int((*a as f64 + (*b - *a) as f64 * t).round() as i64)
            }
            (PropValue::Vec2(a), PropValue::Vec2(b)) => {
                PropValue::Vec2([a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t])
            }
            (PropValue::Vec4(a), PropValue::Vec4(b)) => {
                let mut out = [0.0; 4];
                for i in 0..4 {
                    out[i] = a[i] + (b[i] - a[i]) * t;
                }
                PropValue::Vec4(out)
            }
            _ => {
                if t >= 1.0 {
                    other.clone()
                } else {
                    self.clone()
                }
            }
        }
    }
}

/// Named property values of one node.
///
/// Backed by a `BTreeMap` so iteration order is stable regardless of
/// write order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    values: BTreeMap<String, PropValue>,
}

impl PropertySet {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value by name.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    /// Get a float property, if present and of float kind.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(PropValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Set a property value. Returns `true` when the stored value
    /// actually changed.
    pub fn set(&mut self, name: impl Into<String>, value: PropValue) -> bool {
        let name = name.into();
        match self.values.get(&name) {
            Some(existing) if *existing == value => false,
            _ => {
                self.values.insert(name, value);
                true
            }
        }
    }

    /// Iterate over all properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no properties are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
