//! Element bounds lookup used for element-relative pointer origins.
//!
//! The compiler never locates elements itself. Callers hand it something that
//! implements [`ElementBoundsResolver`]; the runtime uses [`KnownElements`], a
//! per-session registry preloaded from configuration.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::ELEMENT_KEY_PREFIX;

/// A rectangle region on screen.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Center point, using integer halving of the extent.
    pub fn center(&self) -> (f64, f64) {
        let mid = |origin: i32, extent: i32| (i64::from(origin) + i64::from(extent / 2)) as f64;
        (mid(self.x, self.width), mid(self.y, self.height))
    }
}

/// Resolves an opaque element handle to its on-screen bounds.
pub trait ElementBoundsResolver {
    /// Returns `None` when the handle is unknown or stale.
    fn element_bounds(&self, handle: &str) -> Option<Rect>;
}

/// In-memory element registry keyed by handle.
#[derive(Debug, Clone, Default)]
pub struct KnownElements {
    elements: BTreeMap<String, Rect>,
}

impl KnownElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: impl Into<String>, bounds: Rect) -> Option<Rect> {
        self.elements.insert(handle.into(), bounds)
    }

    pub fn remove(&mut self, handle: &str) -> Option<Rect> {
        self.elements.remove(handle)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl FromIterator<(String, Rect)> for KnownElements {
    fn from_iter<T: IntoIterator<Item = (String, Rect)>>(iter: T) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl ElementBoundsResolver for KnownElements {
    fn element_bounds(&self, handle: &str) -> Option<Rect> {
        self.elements.get(handle).copied()
    }
}

/// Extract the element handle from a W3C/JSONWP element reference object.
///
/// Strings are taken as-is; numbers and other non-null values use their JSON
/// text, so `{"ELEMENT": 7}` names handle `"7"`.
pub fn extract_element_id(obj: &serde_json::Map<String, Value>) -> Option<String> {
    obj.iter().find_map(|(key, value)| {
        let is_ref = key
            .get(..ELEMENT_KEY_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(ELEMENT_KEY_PREFIX));
        match value {
            _ if !is_ref => None,
            Value::Null => None,
            Value::String(id) => Some(id.clone()),
            other => Some(other.to_string()),
        }
    })
}
