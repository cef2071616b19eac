//! The tick-ordered event map shared by all input sources.

use std::collections::BTreeMap;
use std::collections::btree_map;

use super::model::PointerType;

/// Absolute offset from gesture start, in milliseconds.
pub type Tick = u64;

// Platform button-state flags attached to motion events.
pub const BUTTON_PRIMARY: u32 = 1;
pub const BUTTON_SECONDARY: u32 = 2;
pub const BUTTON_TERTIARY: u32 = 4;
pub const BUTTON_STYLUS_PRIMARY: u32 = 0x20;
pub const BUTTON_STYLUS_SECONDARY: u32 = 0x40;

/// Tool type a pointer source simulates. Events of different tool types are
/// dispatched as separate gesture streams.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolType {
    Finger,
    Mouse,
    Stylus,
}

impl From<PointerType> for ToolType {
    fn from(value: PointerType) -> Self {
        match value {
            PointerType::Touch => Self::Finger,
            PointerType::Mouse => Self::Mouse,
            PointerType::Pen => Self::Stylus,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActionCode {
    Down,
    Up,
    Move,
    HoverEnter,
    HoverMove,
    HoverExit,
}

impl ActionCode {
    pub fn is_hovering(self) -> bool {
        matches!(self, Self::HoverEnter | Self::HoverMove | Self::HoverExit)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerCoords {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
    pub size: f64,
}

impl PointerCoords {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            pressure: 1.0,
            size: 1.0,
        }
    }

    /// Point `step / steps` of the way towards `end`. Pressure and size are
    /// taken from `self`.
    pub fn lerp(&self, end: &Self, step: u64, steps: u64) -> Self {
        if steps == 0 || step >= steps {
            return *end;
        }
        let t = step as f64 / steps as f64;
        Self {
            x: self.x + (end.x - self.x) * t,
            y: self.y + (end.y - self.y) * t,
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionDescriptor {
    /// Tick at which the owning touch chain started.
    pub entry_tick: Tick,
    pub action: ActionCode,
    pub coords: PointerCoords,
    pub button: u32,
    pub pointer_id: u32,
    pub tool_type: ToolType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyDescriptor {
    pub entry_tick: Tick,
    pub action: KeyAction,
    pub code_point: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventDescriptor {
    Motion(MotionDescriptor),
    Key(KeyDescriptor),
}

/// Tick -> events multimap, iterated in increasing tick order.
///
/// A tick with an empty list is a timing placeholder: it produces no event but
/// the dispatcher still waits for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    events: BTreeMap<Tick, Vec<EventDescriptor>>,
    /// Down/Up codes per tick, in insertion order.
    transitions: BTreeMap<Tick, Vec<ActionCode>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_placeholder(&mut self, tick: Tick) {
        self.events.entry(tick).or_default();
    }

    pub fn add_event(&mut self, tick: Tick, event: EventDescriptor) {
        if let EventDescriptor::Motion(motion) = &event {
            if matches!(motion.action, ActionCode::Down | ActionCode::Up) {
                self.transitions.entry(tick).or_default().push(motion.action);
            }
        }
        self.events.entry(tick).or_default().push(event);
    }

    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        self.events.keys().copied()
    }

    pub fn events_at(&self, tick: Tick) -> &[EventDescriptor] {
        self.events.get(&tick).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Tick, Vec<EventDescriptor>> {
        self.events.iter()
    }

    /// Number of distinct ticks, placeholders included.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// If more than one pointer is down at `tick`, the tick at which the first
    /// of them went down.
    pub fn secondary_entry_tick(&self, tick: Tick) -> Option<Tick> {
        let mut first_down = None;
        let mut balance = 0i64;
        for (&at, codes) in self.transitions.range(..=tick) {
            for code in codes {
                match code {
                    ActionCode::Down => {
                        if balance == 0 {
                            first_down = Some(at);
                        }
                        balance += 1;
                    }
                    ActionCode::Up => balance -= 1,
                    _ => {}
                }
            }
        }
        if balance > 1 { first_down } else { None }
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = (&'a Tick, &'a Vec<EventDescriptor>);
    type IntoIter = btree_map::Iter<'a, Tick, Vec<EventDescriptor>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
