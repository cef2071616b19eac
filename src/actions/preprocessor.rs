//! Parsing and structural validation of the raw `actions` array.
//!
//! [`parse_actions`] turns JSON into typed [`ActionSource`]s, rejecting anything
//! it cannot represent. [`validate`] then enforces the cross-source rules and
//! strips `pointerCancel` pairs. [`preprocess`] runs both.

use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value};
use tracing::trace;

use super::elements::extract_element_id;
use super::error::{ActionsError, Result};
use super::model::{ActionItem, ActionSource, Origin, PointerMove, PointerType, SourceKind};

/// Parse and validate a raw `actions` array in one step.
pub fn preprocess(actions: &Value) -> Result<Vec<ActionSource>> {
    validate(parse_actions(actions)?)
}

/// Parse a raw `actions` array into typed sources.
pub fn parse_actions(actions: &Value) -> Result<Vec<ActionSource>> {
    let list = actions.as_array().ok_or(ActionsError::NotAnArray)?;
    list.iter()
        .enumerate()
        .map(|(index, raw)| parse_source(index, raw))
        .collect()
}

fn parse_source(index: usize, raw: &Value) -> Result<ActionSource> {
    let obj = raw
        .as_object()
        .ok_or(ActionsError::MissingSourceField { index, key: "id" })?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .ok_or(ActionsError::MissingSourceField { index, key: "id" })?
        .to_string();

    let type_str = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ActionsError::MissingSourceField { index, key: "type" })?;
    let kind = SourceKind::parse(type_str).ok_or_else(|| ActionsError::UnsupportedValue {
        id: id.clone(),
        key: "type",
        value: type_str.to_string(),
        allowed: &SourceKind::ALL,
    })?;

    let pointer_type = match obj
        .get("parameters")
        .and_then(Value::as_object)
        .and_then(|p| p.get("pointerType"))
    {
        Some(value) => {
            let name = value.as_str().unwrap_or_default();
            let parsed =
                PointerType::parse(name).ok_or_else(|| ActionsError::UnsupportedValue {
                    id: id.clone(),
                    key: "pointerType",
                    value: value.to_string(),
                    allowed: &PointerType::ALL,
                })?;
            Some(parsed)
        }
        None => None,
    };

    let raw_items = obj
        .get("actions")
        .and_then(Value::as_array)
        .ok_or(ActionsError::MissingSourceField {
            index,
            key: "actions",
        })?;

    let items = raw_items
        .iter()
        .enumerate()
        .map(|(item_index, item)| parse_item(&id, kind, item_index, item))
        .collect::<Result<Vec<_>>>()?;

    Ok(ActionSource {
        id,
        kind,
        pointer_type,
        items,
    })
}

fn parse_item(id: &str, kind: SourceKind, index: usize, raw: &Value) -> Result<ActionItem> {
    let unsupported = |item_type: &str| ActionsError::UnsupportedItemType {
        id: id.to_string(),
        kind: kind.as_str(),
        item_type: item_type.to_string(),
        allowed: kind.allowed_item_types(),
    };

    let obj = raw.as_object().ok_or_else(|| unsupported("<not an object>"))?;
    let item_type = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ActionsError::MissingItemField {
            id: id.to_string(),
            index,
            item_type: "<unknown>",
            key: "type",
        })?;

    let fields = ItemFields { id, index, obj };
    let item = match item_type {
        "pause" => ActionItem::Pause {
            duration: fields.int("duration")?,
        },
        "pointerDown" => ActionItem::PointerDown {
            button: fields.int("button")?,
        },
        "pointerUp" => ActionItem::PointerUp {
            button: fields.int("button")?,
        },
        "pointerCancel" => ActionItem::PointerCancel,
        "pointerMove" => ActionItem::PointerMove(PointerMove {
            duration: fields.int("duration")?,
            origin: fields.origin()?,
            x: fields.float("x")?,
            y: fields.float("y")?,
            pressure: fields.float("pressure")?,
            size: fields.float("size")?,
        }),
        "keyDown" => ActionItem::KeyDown {
            value: fields.string("value")?,
        },
        "keyUp" => ActionItem::KeyUp {
            value: fields.string("value")?,
        },
        other => return Err(unsupported(other)),
    };
    Ok(item)
}

/// Typed accessors over one raw item object. `null` counts as absent.
struct ItemFields<'a> {
    id: &'a str,
    index: usize,
    obj: &'a Map<String, Value>,
}

impl ItemFields<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.obj.get(key).filter(|v| !v.is_null())
    }

    fn invalid(&self, key: &'static str, reason: &str) -> ActionsError {
        ActionsError::InvalidItemField {
            id: self.id.to_string(),
            index: self.index,
            key,
            reason: reason.to_string(),
        }
    }

    fn int(&self, key: &'static str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .or_else(|| v.as_f64().map(|f| f.trunc() as i64))
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected an integer")),
        }
    }

    fn float(&self, key: &'static str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected a number")),
        }
    }

    fn string(&self, key: &'static str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(key, "expected a string")),
        }
    }

    fn origin(&self) -> Result<Origin> {
        match self.get("origin") {
            None => Ok(Origin::Viewport),
            Some(Value::String(s)) => Ok(match s.as_str() {
                "viewport" => Origin::Viewport,
                "pointer" => Origin::Pointer,
                handle => Origin::Element(handle.to_string()),
            }),
            Some(Value::Object(reference)) => extract_element_id(reference)
                .map(Origin::Element)
                .ok_or_else(|| ActionsError::UnknownElement {
                    id: self.id.to_string(),
                    index: self.index,
                    element: Value::Object(reference.clone()).to_string(),
                }),
            Some(_) => Err(self.invalid("origin", "expected a string or an element reference")),
        }
    }
}

/// Enforce cross-source rules and drop cancelled item pairs.
///
/// Validating already validated sources returns them unchanged.
pub fn validate(sources: Vec<ActionSource>) -> Result<Vec<ActionSource>> {
    let mut seen_ids = HashSet::with_capacity(sources.len());
    let mut pointer_types = BTreeSet::new();
    let mut out = Vec::with_capacity(sources.len());

    for (index, mut source) in sources.into_iter().enumerate() {
        if source.id.is_empty() {
            return Err(ActionsError::MissingSourceField { index, key: "id" });
        }
        if !seen_ids.insert(source.id.clone()) {
            return Err(ActionsError::DuplicateId(source.id));
        }

        if let Some(pointer_type) = source.pointer_type {
            if source.kind != SourceKind::Pointer {
                return Err(ActionsError::PointerTypeOnNonPointer(source.id));
            }
            pointer_types.insert(pointer_type);
        }

        if let Some(bad) = source.items.iter().find(|item| !source.kind.allows(item)) {
            return Err(ActionsError::UnsupportedItemType {
                id: source.id.clone(),
                kind: source.kind.as_str(),
                item_type: bad.type_name().to_string(),
                allowed: source.kind.allowed_item_types(),
            });
        }

        let before = source.items.len();
        source.items = strip_cancelled(source.items);
        if source.items.len() != before {
            trace!(
                target: "actionforge::preprocess",
                id = %source.id,
                removed = before - source.items.len(),
                "Removed cancelled pointer items"
            );
        }
        out.push(source);
    }

    if pointer_types.len() > 1 {
        return Err(ActionsError::MixedPointerTypes(
            pointer_types.iter().map(|t| t.to_string()).collect(),
        ));
    }

    Ok(out)
}

/// Scanning from the end, each `pointerCancel` removes itself together with the
/// closest preceding item that is not a cancel and not already consumed.
fn strip_cancelled(items: Vec<ActionItem>) -> Vec<ActionItem> {
    let mut kept = Vec::with_capacity(items.len());
    let mut skip_next = false;
    for item in items.into_iter().rev() {
        if matches!(item, ActionItem::PointerCancel) {
            skip_next = true;
            continue;
        }
        if skip_next {
            skip_next = false;
            continue;
        }
        kept.push(item);
    }
    kept.reverse();
    kept
}
