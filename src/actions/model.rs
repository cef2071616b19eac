//! Typed form of a W3C actions payload.
//!
//! Sources and items are produced by [`crate::actions::preprocessor`] from the raw
//! JSON payload. Fields the tokenizer is responsible for checking (durations,
//! coordinates, key values) stay optional here so that each failure is reported
//! by the stage that owns it.

use std::fmt;

/// Fixed injection interval in milliseconds. Every tick is a multiple of it.
pub const QUANTUM_MS: u64 = 5;

/// Longest timeline a payload may describe: ten minutes. This also bounds the
/// samples a single move can produce to `MAX_TIMELINE_MS / QUANTUM_MS`.
pub const MAX_TIMELINE_MS: u64 = 10 * 60 * 1000;

/// Key under which WebDriver clients serialize an element reference.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// Element reference keys start with this, ignoring case. Covers the W3C key
/// and the legacy JSONWP `ELEMENT` key.
pub const ELEMENT_KEY_PREFIX: &str = "element";

/// Input source kind (`type` of an action source).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Pointer,
    Key,
    None,
}

impl SourceKind {
    pub const ALL: [&'static str; 3] = ["pointer", "key", "none"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pointer" => Some(Self::Pointer),
            "key" => Some(Self::Key),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pointer => "pointer",
            Self::Key => "key",
            Self::None => "none",
        }
    }

    /// Item type names allowed in a source of this kind.
    pub fn allowed_item_types(self) -> &'static [&'static str] {
        match self {
            Self::Pointer => &[
                "pause",
                "pointerDown",
                "pointerUp",
                "pointerMove",
                "pointerCancel",
            ],
            Self::Key => &["pause", "keyDown", "keyUp"],
            Self::None => &["pause"],
        }
    }

    pub fn allows(self, item: &ActionItem) -> bool {
        self.allowed_item_types().contains(&item.type_name())
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `parameters.pointerType` of a pointer source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PointerType {
    #[default]
    Touch,
    Mouse,
    Pen,
}

impl PointerType {
    pub const ALL: [&'static str; 3] = ["touch", "mouse", "pen"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "touch" => Some(Self::Touch),
            "mouse" => Some(Self::Mouse),
            "pen" => Some(Self::Pen),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Touch => "touch",
            Self::Mouse => "mouse",
            Self::Pen => "pen",
        }
    }
}

impl fmt::Display for PointerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinate frame of a `pointerMove`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Origin {
    #[default]
    Viewport,
    Pointer,
    /// Opaque element handle, resolved through the element registry.
    Element(String),
}

/// Payload of a `pointerMove` item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointerMove {
    pub duration: Option<i64>,
    pub origin: Origin,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub pressure: Option<f64>,
    pub size: Option<f64>,
}

/// One action of a source.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionItem {
    Pause { duration: Option<i64> },
    PointerDown { button: Option<i64> },
    PointerUp { button: Option<i64> },
    PointerMove(PointerMove),
    PointerCancel,
    KeyDown { value: Option<String> },
    KeyUp { value: Option<String> },
}

impl ActionItem {
    /// The W3C item type name (`type` field).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Pause { .. } => "pause",
            Self::PointerDown { .. } => "pointerDown",
            Self::PointerUp { .. } => "pointerUp",
            Self::PointerMove(_) => "pointerMove",
            Self::PointerCancel => "pointerCancel",
            Self::KeyDown { .. } => "keyDown",
            Self::KeyUp { .. } => "keyUp",
        }
    }
}

/// One parallel chain of actions.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSource {
    pub id: String,
    pub kind: SourceKind,
    /// Only ever `Some` for pointer sources.
    pub pointer_type: Option<PointerType>,
    pub items: Vec<ActionItem>,
}

impl ActionSource {
    /// Effective pointer type; absent defaults to touch.
    pub fn pointer_type_or_default(&self) -> PointerType {
        self.pointer_type.unwrap_or_default()
    }
}
