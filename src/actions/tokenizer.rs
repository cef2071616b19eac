//! Compiles validated action sources into a [`Timeline`].
//!
//! Each source is walked on its own with a small state struct; all of them
//! write into the same tick map. Sources are applied in a fixed order (none,
//! key, then pointer sources) so that pointer ids follow the pointer sources'
//! order in the payload.

use tracing::{debug, trace};

use super::elements::ElementBoundsResolver;
use super::error::{ActionsError, Result};
use super::model::{
    ActionItem, ActionSource, MAX_TIMELINE_MS, Origin, PointerMove, PointerType, QUANTUM_MS,
    SourceKind,
};
use super::timeline::{
    ActionCode, BUTTON_PRIMARY, BUTTON_SECONDARY, BUTTON_STYLUS_PRIMARY, BUTTON_STYLUS_SECONDARY,
    BUTTON_TERTIARY, EventDescriptor, KeyAction, KeyDescriptor, MotionDescriptor, PointerCoords,
    Tick, Timeline, ToolType,
};

/// Hover gestures need room for enter and exit events.
const MIN_HOVER_STEPS: u64 = 2;

/// Round a requested duration up to the injection quantum.
///
/// Non-positive durations align to zero; anything else becomes the smallest
/// non-zero multiple of [`QUANTUM_MS`] that is not below it.
pub fn align_duration(ms: i64) -> u64 {
    if ms <= 0 {
        return 0;
    }
    let ms = ms.unsigned_abs();
    ms.div_ceil(QUANTUM_MS) * QUANTUM_MS
}

/// Compile `sources` into a timeline, resolving element origins with `resolver`.
pub fn tokenize<R>(sources: &[ActionSource], resolver: &R) -> Result<Timeline>
where
    R: ElementBoundsResolver + ?Sized,
{
    let mut tokenizer = Tokenizer {
        resolver,
        timeline: Timeline::new(),
    };

    for source in sources.iter().filter(|s| s.kind == SourceKind::None) {
        tokenizer.apply_none_source(source)?;
    }
    for source in sources.iter().filter(|s| s.kind == SourceKind::Key) {
        tokenizer.apply_key_source(source)?;
    }
    for (pointer_index, source) in sources
        .iter()
        .filter(|s| s.kind == SourceKind::Pointer)
        .enumerate()
    {
        tokenizer.apply_pointer_source(source, pointer_index as u32)?;
    }

    debug!(
        target: "actionforge::tokenizer",
        ticks = tokenizer.timeline.len(),
        events = tokenizer.timeline.event_count(),
        "Actions tokenized"
    );
    Ok(tokenizer.timeline)
}

struct Tokenizer<'r, R: ?Sized> {
    resolver: &'r R,
    timeline: Timeline,
}

/// Running state of one pointer chain.
#[derive(Debug, Default)]
struct PointerState {
    tick: Tick,
    chain_entry: Tick,
    is_down: bool,
    recent_button: u32,
    recent_down: Option<Tick>,
    recent_up: Option<Tick>,
    /// Resolved pointer position after each item, filled on demand.
    positions: Vec<Option<PointerCoords>>,
}

/// Static properties of the pointer a source drives.
#[derive(Debug, Copy, Clone)]
struct Pointer {
    id: u32,
    tool_type: ToolType,
}

impl Pointer {
    fn motion(
        &self,
        entry_tick: Tick,
        action: ActionCode,
        coords: PointerCoords,
        button: u32,
    ) -> MotionDescriptor {
        MotionDescriptor {
            entry_tick,
            action,
            coords,
            button,
            pointer_id: self.id,
            tool_type: self.tool_type,
        }
    }
}

impl<R: ElementBoundsResolver + ?Sized> Tokenizer<'_, R> {
    fn apply_none_source(&mut self, source: &ActionSource) -> Result<()> {
        let mut tick = 0;
        for (index, item) in source.items.iter().enumerate() {
            let ActionItem::Pause { duration } = item else {
                return Err(unexpected_item(source, item));
            };
            tick = pause_end(source, index, item, tick, *duration)?;
            self.timeline.add_placeholder(tick);
        }
        Ok(())
    }

    fn apply_key_source(&mut self, source: &ActionSource) -> Result<()> {
        let mut tick = 0;
        let mut chain_entry = 0;
        for (index, item) in source.items.iter().enumerate() {
            let (action, value) = match item {
                ActionItem::Pause { duration } => {
                    tick = pause_end(source, index, item, tick, *duration)?;
                    self.timeline.add_placeholder(tick);
                    continue;
                }
                ActionItem::KeyDown { value } => {
                    chain_entry = tick;
                    (KeyAction::Down, value)
                }
                ActionItem::KeyUp { value } => (KeyAction::Up, value),
                other => return Err(unexpected_item(source, other)),
            };

            let code_point = key_code_point(source, index, item, value.as_deref())?;
            self.timeline.add_event(
                tick,
                EventDescriptor::Key(KeyDescriptor {
                    entry_tick: chain_entry,
                    action,
                    code_point,
                }),
            );
            chain_entry = tick;
        }
        Ok(())
    }

    fn apply_pointer_source(&mut self, source: &ActionSource, pointer_index: u32) -> Result<()> {
        let pointer_type = source.pointer_type_or_default();
        if pointer_index > 0 && pointer_type != PointerType::Touch {
            return Err(ActionsError::TooManyPointers(pointer_type.as_str()));
        }
        let pointer = Pointer {
            id: pointer_index,
            tool_type: pointer_type.into(),
        };
        let mut state = PointerState {
            positions: vec![None; source.items.len()],
            ..PointerState::default()
        };

        for (index, item) in source.items.iter().enumerate() {
            match item {
                ActionItem::Pause { duration } => {
                    state.tick = pause_end(source, index, item, state.tick, *duration)?;
                    self.timeline.add_placeholder(state.tick);
                }
                ActionItem::PointerDown { button } => {
                    if state.is_down || state.recent_down == Some(state.tick) {
                        return Err(ActionsError::SimultaneousActions {
                            id: source.id.clone(),
                            item_type: item.type_name(),
                            tick: state.tick,
                        });
                    }
                    state.chain_entry = state.tick;
                    state.recent_button = map_button(*button, pointer.tool_type);
                    let coords = self.resolve_coordinates(source, index, &mut state.positions)?;
                    self.record_motion(
                        state.tick,
                        pointer.motion(state.chain_entry, ActionCode::Down, coords, state.recent_button),
                    );
                    state.is_down = true;
                    state.recent_down = Some(state.tick);
                }
                ActionItem::PointerUp { button } => {
                    if !state.is_down {
                        return Err(ActionsError::UpWithoutDown {
                            id: source.id.clone(),
                            tick: state.tick,
                        });
                    }
                    if state.recent_up == Some(state.tick) {
                        return Err(ActionsError::SimultaneousActions {
                            id: source.id.clone(),
                            item_type: item.type_name(),
                            tick: state.tick,
                        });
                    }
                    let button = map_button(*button, pointer.tool_type);
                    let coords = self.resolve_coordinates(source, index, &mut state.positions)?;
                    self.record_motion(
                        state.tick,
                        pointer.motion(state.chain_entry, ActionCode::Up, coords, button),
                    );
                    state.is_down = false;
                    state.recent_button = 0;
                    state.chain_entry = state.tick;
                    state.recent_up = Some(state.tick);
                }
                ActionItem::PointerMove(movement) => {
                    self.apply_pointer_move(source, index, movement, pointer, &mut state)?;
                }
                other => return Err(unexpected_item(source, other)),
            }
        }
        Ok(())
    }

    fn apply_pointer_move(
        &mut self,
        source: &ActionSource,
        index: usize,
        movement: &PointerMove,
        pointer: Pointer,
        state: &mut PointerState,
    ) -> Result<()> {
        let item = &source.items[index];
        let duration = align_duration(required_duration(source, index, item, movement.duration)?);
        if duration < QUANTUM_MS {
            return Ok(());
        }
        let start_tick = state.tick;
        let end_tick = advance(source, index, item, start_tick, duration)?;
        if index == 0 {
            // Nothing to interpolate from; the move only books time.
            state.tick = end_tick;
            self.timeline.add_placeholder(state.tick);
            return Ok(());
        }

        let start = self.resolve_coordinates(source, index - 1, &mut state.positions)?;
        let end = self.resolve_coordinates(source, index, &mut state.positions)?;
        let steps = duration / QUANTUM_MS;

        if !state.is_down && pointer.tool_type == ToolType::Mouse {
            if steps < MIN_HOVER_STEPS {
                state.tick = end_tick;
                self.timeline.add_placeholder(state.tick);
                return Ok(());
            }
            self.record_motion(
                start_tick,
                pointer.motion(start_tick, ActionCode::HoverEnter, start, 0),
            );
            for step in 0..steps {
                self.record_motion(
                    start_tick + step * QUANTUM_MS,
                    pointer.motion(start_tick, ActionCode::HoverMove, start.lerp(&end, step, steps), 0),
                );
            }
            self.record_motion(
                end_tick,
                pointer.motion(start_tick, ActionCode::HoverExit, end, 0),
            );
        } else {
            for step in 0..steps {
                self.record_motion(
                    start_tick + step * QUANTUM_MS,
                    pointer.motion(
                        state.chain_entry,
                        ActionCode::Move,
                        start.lerp(&end, step, steps),
                        state.recent_button,
                    ),
                );
            }
            let next_is_positioned = matches!(
                source.items.get(index + 1),
                Some(
                    ActionItem::PointerMove(_)
                        | ActionItem::PointerDown { .. }
                        | ActionItem::PointerUp { .. }
                )
            );
            if !next_is_positioned {
                self.record_motion(
                    end_tick,
                    pointer.motion(state.chain_entry, ActionCode::Move, end, state.recent_button),
                );
            }
        }

        trace!(
            target: "actionforge::tokenizer",
            id = %source.id, index, start_tick, end_tick, steps,
            "Sampled pointer move"
        );
        state.tick = end_tick;
        Ok(())
    }

    /// Record a motion event; secondary pointers inherit the entry tick of the
    /// first pointer of their multi-touch chain.
    fn record_motion(&mut self, tick: Tick, mut motion: MotionDescriptor) {
        if !motion.action.is_hovering() {
            if let Some(entry) = self.timeline.secondary_entry_tick(tick) {
                motion.entry_tick = entry;
            }
        }
        self.timeline.add_event(tick, EventDescriptor::Motion(motion));
    }

    /// Position of the pointer after the item at `index`. Items without
    /// coordinates inherit them from the closest preceding move, and relative
    /// moves build on the position before them.
    ///
    /// Positions are folded forward from the nearest item that does not depend
    /// on an earlier one and cached in `positions`, so a chain of relative moves
    /// is resolved once.
    fn resolve_coordinates(
        &self,
        source: &ActionSource,
        index: usize,
        positions: &mut [Option<PointerCoords>],
    ) -> Result<PointerCoords> {
        if let Some(known) = positions[index] {
            return Ok(known);
        }

        let mut from = index;
        while from > 0 && positions[from - 1].is_none() && !is_anchor(&source.items[from]) {
            from -= 1;
        }
        let mut recent = from.checked_sub(1).and_then(|i| positions[i]);

        for (i, item) in source.items.iter().enumerate().take(index + 1).skip(from) {
            let coords = match item {
                ActionItem::PointerMove(movement) => self.move_target(source, i, movement, recent)?,
                _ => recent.ok_or_else(|| ActionsError::MissingStartPosition {
                    id: source.id.clone(),
                    index: i,
                })?,
            };
            positions[i] = Some(coords);
            recent = Some(coords);
        }

        recent.ok_or_else(|| ActionsError::MissingStartPosition {
            id: source.id.clone(),
            index,
        })
    }

    /// Where the move at `index` ends, given the position before it.
    fn move_target(
        &self,
        source: &ActionSource,
        index: usize,
        movement: &PointerMove,
        recent: Option<PointerCoords>,
    ) -> Result<PointerCoords> {
        let missing = |key| ActionsError::MissingItemField {
            id: source.id.clone(),
            index,
            item_type: "pointerMove",
            key,
        };

        let (x, y) = match &movement.origin {
            Origin::Viewport => (
                movement.x.ok_or_else(|| missing("x"))?,
                movement.y.ok_or_else(|| missing("y"))?,
            ),
            Origin::Pointer => {
                let recent = recent.ok_or_else(|| ActionsError::MissingStartPosition {
                    id: source.id.clone(),
                    index,
                })?;
                (
                    recent.x + movement.x.unwrap_or_default(),
                    recent.y + movement.y.unwrap_or_default(),
                )
            }
            Origin::Element(handle) => {
                let bounds = self.resolver.element_bounds(handle).ok_or_else(|| {
                    ActionsError::UnknownElement {
                        id: source.id.clone(),
                        index,
                        element: handle.clone(),
                    }
                })?;
                if bounds.is_empty() {
                    return Err(ActionsError::ZeroSizeElement {
                        id: source.id.clone(),
                        index,
                        element: handle.clone(),
                    });
                }
                let (cx, cy) = bounds.center();
                (
                    cx + movement.x.unwrap_or_default(),
                    cy + movement.y.unwrap_or_default(),
                )
            }
        };

        Ok(PointerCoords {
            x,
            y,
            pressure: movement.pressure.unwrap_or(1.0),
            size: movement.size.unwrap_or(1.0),
        })
    }
}

/// A move whose position does not depend on the items before it.
fn is_anchor(item: &ActionItem) -> bool {
    matches!(item, ActionItem::PointerMove(m) if m.origin != Origin::Pointer)
}

/// Tick reached after a pause of `duration` starting at `tick`.
fn pause_end(
    source: &ActionSource,
    index: usize,
    item: &ActionItem,
    tick: Tick,
    duration: Option<i64>,
) -> Result<Tick> {
    let duration = align_duration(required_duration(source, index, item, duration)?);
    advance(source, index, item, tick, duration)
}

/// `tick + duration`, bounded by [`MAX_TIMELINE_MS`].
fn advance(
    source: &ActionSource,
    index: usize,
    item: &ActionItem,
    tick: Tick,
    duration: u64,
) -> Result<Tick> {
    tick.checked_add(duration)
        .filter(|&end| end <= MAX_TIMELINE_MS)
        .ok_or_else(|| ActionsError::TimelineTooLong {
            id: source.id.clone(),
            index,
            item_type: item.type_name(),
            limit_ms: MAX_TIMELINE_MS,
        })
}

fn unexpected_item(source: &ActionSource, item: &ActionItem) -> ActionsError {
    ActionsError::UnsupportedItemType {
        id: source.id.clone(),
        kind: source.kind.as_str(),
        item_type: item.type_name().to_string(),
        allowed: source.kind.allowed_item_types(),
    }
}

fn required_duration(
    source: &ActionSource,
    index: usize,
    item: &ActionItem,
    duration: Option<i64>,
) -> Result<i64> {
    let duration = duration.ok_or_else(|| ActionsError::MissingItemField {
        id: source.id.clone(),
        index,
        item_type: item.type_name(),
        key: "duration",
    })?;
    if duration < 0 {
        return Err(ActionsError::NegativeDuration {
            id: source.id.clone(),
            index,
            item_type: item.type_name(),
        });
    }
    Ok(duration)
}

fn key_code_point(
    source: &ActionSource,
    index: usize,
    item: &ActionItem,
    value: Option<&str>,
) -> Result<u32> {
    let value = value.ok_or_else(|| ActionsError::MissingItemField {
        id: source.id.clone(),
        index,
        item_type: item.type_name(),
        key: "value",
    })?;
    value
        .chars()
        .next()
        .map(u32::from)
        .ok_or_else(|| ActionsError::InvalidItemField {
            id: source.id.clone(),
            index,
            key: "value",
            reason: "cannot be empty".to_string(),
        })
}

/// Convert a W3C button number into platform button-state flags.
fn map_button(button: Option<i64>, tool_type: ToolType) -> u32 {
    let raw = |b: i64| u32::try_from(b).unwrap_or_default();
    match (tool_type, button.unwrap_or(0)) {
        (ToolType::Finger, b) => raw(b),
        (ToolType::Stylus, 0) => BUTTON_STYLUS_PRIMARY,
        (ToolType::Stylus, 2) => BUTTON_STYLUS_SECONDARY,
        (_, 0) => BUTTON_PRIMARY,
        (_, 1) => BUTTON_TERTIARY,
        (_, 2) => BUTTON_SECONDARY,
        (_, b) => raw(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::elements::{KnownElements, Rect};
    use crate::actions::error::ErrorCategory;
    use crate::actions::preprocessor::preprocess;
    use serde_json::{Value, json};

    fn compile(raw: Value) -> Result<Timeline> {
        compile_with(raw, &KnownElements::new())
    }

    fn compile_with(raw: Value, elements: &KnownElements) -> Result<Timeline> {
        tokenize(&preprocess(&raw)?, elements)
    }

    fn motion(event: &EventDescriptor) -> &MotionDescriptor {
        match event {
            EventDescriptor::Motion(m) => m,
            other => panic!("expected motion event, got {other:?}"),
        }
    }

    fn key(event: &EventDescriptor) -> &KeyDescriptor {
        match event {
            EventDescriptor::Key(k) => k,
            other => panic!("expected key event, got {other:?}"),
        }
    }

    fn assert_at(m: &MotionDescriptor, action: ActionCode, x: f64, y: f64) {
        assert_eq!(m.action, action);
        assert!((m.coords.x - x).abs() < 1e-9, "x: {} != {x}", m.coords.x);
        assert!((m.coords.y - y).abs() < 1e-9, "y: {} != {y}", m.coords.y);
    }

    fn single_finger() -> Value {
        json!([{
            "type": "pointer",
            "id": "finger1",
            "parameters": {"pointerType": "touch"},
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 100, "y": 100},
                {"type": "pointerDown"},
                {"type": "pause", "duration": 10},
                {"type": "pointerMove", "duration": 10, "origin": "pointer", "x": -50, "y": 0},
                {"type": "pointerUp"}
            ]
        }])
    }

    #[test]
    fn align_rounds_up_to_quantum() {
        assert_eq!(align_duration(-10), 0);
        assert_eq!(align_duration(0), 0);
        assert_eq!(align_duration(1), 5);
        assert_eq!(align_duration(4), 5);
        assert_eq!(align_duration(5), 5);
        assert_eq!(align_duration(6), 10);
        assert_eq!(align_duration(220), 220);
        for d in 1..200 {
            let a = align_duration(d) as i64;
            assert_eq!(a % 5, 0);
            assert!(a >= d.max(5));
            assert!(a < d + 5 || d < 5);
        }
    }

    #[test]
    fn single_finger_gesture() {
        let timeline = compile(single_finger()).unwrap();
        assert_eq!(timeline.ticks().collect::<Vec<_>>(), vec![0, 10, 15, 20]);

        let down = motion(&timeline.events_at(0)[0]);
        assert_at(down, ActionCode::Down, 100.0, 100.0);
        assert_eq!(down.entry_tick, 0);
        assert_eq!(down.button, 0);
        assert_eq!(down.pointer_id, 0);
        assert_eq!(down.tool_type, ToolType::Finger);

        assert_eq!(timeline.events_at(10).len(), 1);
        assert_at(motion(&timeline.events_at(10)[0]), ActionCode::Move, 100.0, 100.0);
        assert_at(motion(&timeline.events_at(15)[0]), ActionCode::Move, 75.0, 100.0);

        let up = motion(&timeline.events_at(20)[0]);
        assert_eq!(timeline.events_at(20).len(), 1);
        assert_at(up, ActionCode::Up, 50.0, 100.0);
        assert_eq!(up.entry_tick, 0);
    }

    #[test]
    fn key_chain_with_pause() {
        let timeline = compile(json!([{
            "type": "key",
            "id": "keyboard",
            "actions": [
                {"type": "keyDown", "value": "A"},
                {"type": "pause", "duration": 500},
                {"type": "keyUp", "value": "A"}
            ]
        }]))
        .unwrap();
        assert_eq!(timeline.ticks().collect::<Vec<_>>(), vec![0, 500]);
        let down = key(&timeline.events_at(0)[0]);
        assert_eq!((down.action, down.code_point, down.entry_tick), (KeyAction::Down, 65, 0));
        let up = key(&timeline.events_at(500)[0]);
        assert_eq!((up.action, up.code_point, up.entry_tick), (KeyAction::Up, 65, 0));
    }

    #[test]
    fn key_chain_without_pause_shares_one_tick() {
        let timeline = compile(json!([{
            "type": "key",
            "id": "keyboard",
            "actions": [
                {"type": "keyDown", "value": "\u{E008}"},
                {"type": "keyDown", "value": "A"},
                {"type": "keyUp", "value": "A"},
                {"type": "keyUp", "value": "\u{E008}"}
            ]
        }]))
        .unwrap();
        assert_eq!(timeline.len(), 1);
        let codes: Vec<_> = timeline
            .events_at(0)
            .iter()
            .map(|e| key(e).code_point)
            .collect();
        assert_eq!(codes, vec![0xE008, 65, 65, 0xE008]);
    }

    #[test]
    fn none_source_only_books_time() {
        let timeline = compile(json!([{
            "type": "none",
            "id": "none1",
            "actions": [
                {"type": "pause", "duration": 200},
                {"type": "pause", "duration": 20}
            ]
        }]))
        .unwrap();
        assert_eq!(timeline.ticks().collect::<Vec<_>>(), vec![200, 220]);
        assert_eq!(timeline.event_count(), 0);
    }

    #[test]
    fn finger_gesture_with_keys_interleaves() {
        let timeline = compile(json!([
            {
                "type": "pointer",
                "id": "finger1",
                "parameters": {"pointerType": "touch"},
                "actions": single_finger()[0]["actions"].clone()
            },
            {
                "type": "key",
                "id": "keyboard",
                "actions": [
                    {"type": "pause", "duration": 10},
                    {"type": "keyDown", "value": "\u{E008}"},
                    {"type": "pause", "duration": 20},
                    {"type": "keyUp", "value": "\u{E008}"}
                ]
            }
        ]))
        .unwrap();
        assert_eq!(timeline.ticks().collect::<Vec<_>>(), vec![0, 10, 15, 20, 30]);
        // key sources are applied before pointer sources
        assert_eq!(timeline.events_at(10).len(), 2);
        assert_eq!(key(&timeline.events_at(10)[0]).entry_tick, 10);
        assert_at(motion(&timeline.events_at(10)[1]), ActionCode::Move, 100.0, 100.0);
        let up = key(&timeline.events_at(30)[0]);
        assert_eq!((up.action, up.entry_tick), (KeyAction::Up, 10));
    }

    #[test]
    fn mouse_drag_with_multiple_moves() {
        let timeline = compile(json!([{
            "type": "pointer",
            "id": "mouse1",
            "parameters": {"pointerType": "mouse"},
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 100, "y": 100},
                {"type": "pointerDown", "button": 2},
                {"type": "pointerMove", "duration": 10, "origin": "pointer", "x": -50, "y": 0},
                {"type": "pointerMove", "duration": 10, "origin": "pointer", "x": 100, "y": 0},
                {"type": "pointerMove", "duration": 10, "x": 0, "y": 0},
                {"type": "pointerUp", "button": 2}
            ]
        }]))
        .unwrap();
        assert_eq!(
            timeline.ticks().collect::<Vec<_>>(),
            vec![0, 5, 10, 15, 20, 25, 30]
        );
        let first = timeline.events_at(0);
        assert_eq!(first.len(), 2);
        assert_at(motion(&first[0]), ActionCode::Down, 100.0, 100.0);
        assert_eq!(motion(&first[0]).button, BUTTON_SECONDARY);
        assert_at(motion(&first[1]), ActionCode::Move, 100.0, 100.0);
        assert_eq!(motion(&first[1]).button, BUTTON_SECONDARY);

        let expected = [
            (5, 75.0, 100.0),
            (10, 50.0, 100.0),
            (15, 100.0, 100.0),
            (20, 150.0, 100.0),
            (25, 75.0, 50.0),
        ];
        for (tick, x, y) in expected {
            let events = timeline.events_at(tick);
            assert_eq!(events.len(), 1, "tick {tick}");
            assert_at(motion(&events[0]), ActionCode::Move, x, y);
        }
        let up = motion(&timeline.events_at(30)[0]);
        assert_at(up, ActionCode::Up, 0.0, 0.0);
        assert_eq!(up.button, BUTTON_SECONDARY);
        assert_eq!(up.tool_type, ToolType::Mouse);
    }

    #[test]
    fn mouse_hover_emits_enter_and_exit() {
        let timeline = compile(json!([{
            "type": "pointer",
            "id": "mouse1",
            "parameters": {"pointerType": "mouse"},
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 100, "y": 100},
                {"type": "pointerMove", "duration": 10, "x": 0, "y": 0}
            ]
        }]))
        .unwrap();
        assert_eq!(timeline.ticks().collect::<Vec<_>>(), vec![0, 5, 10]);
        let first = timeline.events_at(0);
        assert_at(motion(&first[0]), ActionCode::HoverEnter, 100.0, 100.0);
        assert_at(motion(&first[1]), ActionCode::HoverMove, 100.0, 100.0);
        assert_at(motion(&timeline.events_at(5)[0]), ActionCode::HoverMove, 50.0, 50.0);
        let exit = motion(&timeline.events_at(10)[0]);
        assert_at(exit, ActionCode::HoverExit, 0.0, 0.0);
        assert_eq!(exit.button, 0);
    }

    #[test]
    fn short_hover_only_advances_time() {
        let timeline = compile(json!([{
            "type": "pointer",
            "id": "mouse1",
            "parameters": {"pointerType": "mouse"},
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 100, "y": 100},
                {"type": "pointerMove", "duration": 3, "x": 0, "y": 0}
            ]
        }]))
        .unwrap();
        assert_eq!(timeline.ticks().collect::<Vec<_>>(), vec![5]);
        assert_eq!(timeline.event_count(), 0);
    }

    #[test]
    fn trailing_move_ends_on_exact_target() {
        let timeline = compile(json!([{
            "type": "pointer",
            "id": "finger1",
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 0, "y": 0},
                {"type": "pointerDown"},
                {"type": "pointerMove", "duration": 30, "x": 100, "y": 100}
            ]
        }]))
        .unwrap();
        let samples: Vec<_> = timeline
            .iter()
            .flat_map(|(tick, events)| events.iter().map(move |e| (*tick, motion(e).clone())))
            .filter(|(_, m)| m.action == ActionCode::Move)
            .collect();
        assert_eq!(samples.len(), 7);
        for (k, (tick, m)) in samples.iter().enumerate() {
            assert_eq!(*tick, 5 * k as u64);
            let expected = 100.0 * k as f64 / 6.0;
            assert!((m.coords.x - expected).abs() < 1e-9);
            assert!((m.coords.y - expected).abs() < 1e-9);
        }
        assert_eq!(samples[6].1.coords, PointerCoords::at(100.0, 100.0));
    }

    #[test]
    fn two_fingers_share_ticks() {
        let timeline = compile(json!([
            {
                "type": "pointer", "id": "finger1",
                "parameters": {"pointerType": "touch"},
                "actions": [
                    {"type": "pointerMove", "duration": 0, "x": 0, "y": 0},
                    {"type": "pointerDown"},
                    {"type": "pause", "duration": 10},
                    {"type": "pointerMove", "duration": 10, "origin": "pointer", "x": 50, "y": 50},
                    {"type": "pointerUp"}
                ]
            },
            {
                "type": "pointer", "id": "finger2",
                "parameters": {"pointerType": "touch"},
                "actions": [
                    {"type": "pointerMove", "duration": 0, "x": 100, "y": 100},
                    {"type": "pointerDown"},
                    {"type": "pause", "duration": 10},
                    {"type": "pointerMove", "duration": 10, "origin": "pointer", "x": -50, "y": -50},
                    {"type": "pointerUp"}
                ]
            }
        ]))
        .unwrap();
        assert_eq!(timeline.ticks().collect::<Vec<_>>(), vec![0, 10, 15, 20]);
        let downs = timeline.events_at(0);
        assert_eq!(motion(&downs[0]).pointer_id, 0);
        assert_eq!(motion(&downs[1]).pointer_id, 1);
        assert_at(motion(&downs[1]), ActionCode::Down, 100.0, 100.0);

        let mid = timeline.events_at(15);
        assert_at(motion(&mid[0]), ActionCode::Move, 25.0, 25.0);
        assert_at(motion(&mid[1]), ActionCode::Move, 75.0, 75.0);

        for event in timeline.events_at(20) {
            assert_at(motion(event), ActionCode::Up, 50.0, 50.0);
            assert_eq!(motion(event).entry_tick, 0);
        }
    }

    #[test]
    fn secondary_pointer_inherits_chain_entry() {
        let timeline = compile(json!([
            {
                "type": "pointer", "id": "finger1",
                "actions": [
                    {"type": "pointerMove", "duration": 0, "x": 0, "y": 0},
                    {"type": "pointerDown"},
                    {"type": "pause", "duration": 50},
                    {"type": "pointerUp"}
                ]
            },
            {
                "type": "pointer", "id": "finger2",
                "actions": [
                    {"type": "pause", "duration": 20},
                    {"type": "pointerMove", "duration": 0, "x": 10, "y": 10},
                    {"type": "pointerDown"},
                    {"type": "pause", "duration": 10},
                    {"type": "pointerUp"}
                ]
            }
        ]))
        .unwrap();
        let second_down = motion(&timeline.events_at(20)[0]);
        assert_eq!((second_down.pointer_id, second_down.action), (1, ActionCode::Down));
        // only the first pointer was down when this one landed
        assert_eq!(second_down.entry_tick, 20);

        let second_up = motion(&timeline.events_at(30)[0]);
        assert_eq!((second_up.pointer_id, second_up.action), (1, ActionCode::Up));
        assert_eq!(second_up.entry_tick, 0);
    }

    #[test]
    fn element_origin_uses_center_plus_offset() {
        let mut elements = KnownElements::new();
        elements.insert(
            "el-1",
            Rect { x: 100, y: 200, width: 50, height: 30 },
        );
        let timeline = compile_with(
            json!([{
                "type": "pointer", "id": "finger1",
                "actions": [
                    {"type": "pointerMove", "duration": 0,
                     "origin": {"element-6066-11e4-a52e-4f735466cecf": "el-1"}, "x": 5, "pressure": 0.5},
                    {"type": "pointerDown"},
                    {"type": "pointerUp"}
                ]
            }]),
            &elements,
        )
        .unwrap();
        let down = motion(&timeline.events_at(0)[0]);
        assert_at(down, ActionCode::Down, 130.0, 215.0);
        assert_eq!(down.coords.pressure, 0.5);
        assert_eq!(down.coords.size, 1.0);
    }

    #[test]
    fn unknown_and_empty_elements_are_rejected() {
        let mut elements = KnownElements::new();
        elements.insert("flat", Rect { x: 0, y: 0, width: 10, height: 0 });
        let gesture = |origin: &str| {
            json!([{
                "type": "pointer", "id": "finger1",
                "actions": [
                    {"type": "pointerMove", "duration": 0, "origin": origin},
                    {"type": "pointerDown"}
                ]
            }])
        };
        let err = compile_with(gesture("ghost"), &elements).unwrap_err();
        assert!(matches!(err, ActionsError::UnknownElement { .. }));
        assert_eq!(err.category(), ErrorCategory::Referential);
        assert!(matches!(
            compile_with(gesture("flat"), &elements),
            Err(ActionsError::ZeroSizeElement { .. })
        ));
    }

    #[test]
    fn missing_duration_names_item_and_source() {
        let err = compile(json!([{
            "type": "pointer", "id": "mouse1",
            "actions": [
                {"type": "pointerMove", "x": 100, "y": 100},
                {"type": "pointerDown", "button": 1}
            ]
        }]))
        .unwrap_err();
        assert_eq!(
            err,
            ActionsError::MissingItemField {
                id: "mouse1".into(),
                index: 0,
                item_type: "pointerMove",
                key: "duration",
            }
        );
        let message = err.to_string();
        assert!(message.contains("mouse1") && message.contains("pointerMove"));
    }

    #[test]
    fn negative_duration_is_temporal_error() {
        let err = compile(json!([{
            "type": "pointer", "id": "mouse1",
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 100, "y": 100},
                {"type": "pointerDown", "button": 1},
                {"type": "pointerMove", "duration": -1, "origin": "pointer", "x": -50, "y": 0},
                {"type": "pointerUp", "button": 1}
            ]
        }]))
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Temporal);
    }

    #[test]
    fn missing_start_position_is_rejected() {
        let err = compile(json!([{
            "type": "pointer", "id": "mouse1",
            "actions": [
                {"type": "pointerDown", "button": 1},
                {"type": "pointerMove", "duration": 10, "x": -50, "y": 0},
                {"type": "pointerUp", "button": 1}
            ]
        }]))
        .unwrap_err();
        assert!(matches!(err, ActionsError::MissingStartPosition { index: 0, .. }));
    }

    #[test]
    fn missing_viewport_coordinate_is_rejected() {
        let err = compile(json!([{
            "type": "pointer", "id": "mouse1",
            "actions": [
                {"type": "pointerMove", "duration": 0, "y": 100},
                {"type": "pointerDown", "button": 1}
            ]
        }]))
        .unwrap_err();
        assert!(matches!(err, ActionsError::MissingItemField { key: "x", .. }));
    }

    #[test]
    fn pointer_origin_on_first_item_is_rejected() {
        let err = compile(json!([{
            "type": "pointer", "id": "finger1",
            "actions": [
                {"type": "pointerMove", "duration": 0, "origin": "pointer", "x": 1, "y": 1},
                {"type": "pointerDown"}
            ]
        }]))
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Sequencing);
    }

    #[test]
    fn double_down_and_orphan_up_are_rejected() {
        let down_twice = json!([{
            "type": "pointer", "id": "finger1",
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 1, "y": 1},
                {"type": "pointerDown"},
                {"type": "pointerDown"}
            ]
        }]);
        assert!(matches!(
            compile(down_twice),
            Err(ActionsError::SimultaneousActions { item_type: "pointerDown", tick: 0, .. })
        ));

        let up_first = json!([{
            "type": "pointer", "id": "finger1",
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 1, "y": 1},
                {"type": "pointerUp"}
            ]
        }]);
        assert!(matches!(
            compile(up_first),
            Err(ActionsError::UpWithoutDown { .. })
        ));

        let down_up_down = json!([{
            "type": "pointer", "id": "finger1",
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 1, "y": 1},
                {"type": "pointerDown"},
                {"type": "pointerUp"},
                {"type": "pointerDown"}
            ]
        }]);
        assert!(matches!(
            compile(down_up_down),
            Err(ActionsError::SimultaneousActions { item_type: "pointerDown", .. })
        ));
    }

    #[test]
    fn two_mice_are_rejected() {
        let mouse = |id: &str| {
            json!({
                "type": "pointer", "id": id,
                "parameters": {"pointerType": "mouse"},
                "actions": [{"type": "pointerMove", "duration": 0, "x": 1, "y": 1}]
            })
        };
        let err = compile(json!([mouse("m1"), mouse("m2")])).unwrap_err();
        assert_eq!(err, ActionsError::TooManyPointers("mouse"));
        assert!(err.to_string().contains("No more than one simultaneous pointer"));
    }

    #[test]
    fn two_pens_are_rejected() {
        let pen = |id: &str| {
            json!({
                "type": "pointer", "id": id,
                "parameters": {"pointerType": "pen"},
                "actions": [{"type": "pointerMove", "duration": 0, "x": 1, "y": 1}]
            })
        };
        let err = compile(json!([pen("p1"), pen("p2")])).unwrap_err();
        assert_eq!(err, ActionsError::TooManyPointers("pen"));
    }

    #[test]
    fn huge_pauses_are_rejected_instead_of_overflowing() {
        let err = compile(json!([{
            "type": "none", "id": "none1",
            "actions": [
                {"type": "pause", "duration": i64::MAX},
                {"type": "pause", "duration": i64::MAX}
            ]
        }]))
        .unwrap_err();
        assert_eq!(
            err,
            ActionsError::TimelineTooLong {
                id: "none1".into(),
                index: 0,
                item_type: "pause",
                limit_ms: MAX_TIMELINE_MS,
            }
        );
        assert_eq!(err.category(), ErrorCategory::Temporal);
    }

    #[test]
    fn timeline_may_reach_the_limit_but_not_pass_it() {
        let pauses = |total: u64| {
            json!([{
                "type": "key", "id": "keyboard",
                "actions": [
                    {"type": "pause", "duration": total - 5},
                    {"type": "pause", "duration": 5}
                ]
            }])
        };
        let timeline = compile(pauses(MAX_TIMELINE_MS)).unwrap();
        assert_eq!(timeline.ticks().last(), Some(MAX_TIMELINE_MS));
        assert!(matches!(
            compile(pauses(MAX_TIMELINE_MS + 5)),
            Err(ActionsError::TimelineTooLong { index: 1, .. })
        ));
    }

    #[test]
    fn long_moves_are_rejected_before_sampling() {
        let err = compile(json!([{
            "type": "pointer", "id": "finger1",
            "actions": [
                {"type": "pointerMove", "duration": 0, "x": 0, "y": 0},
                {"type": "pointerDown"},
                {"type": "pointerMove", "duration": 1_000_000_000_000_i64, "x": 10, "y": 10},
                {"type": "pointerUp"}
            ]
        }]))
        .unwrap_err();
        assert!(matches!(
            err,
            ActionsError::TimelineTooLong { index: 2, item_type: "pointerMove", .. }
        ));
    }

    #[test]
    fn long_relative_move_chain_resolves() {
        const HOPS: usize = 100_000;
        let mut actions = vec![json!({"type": "pointerMove", "duration": 0, "x": 10, "y": 20})];
        actions.extend(
            std::iter::repeat_with(
                || json!({"type": "pointerMove", "duration": 0, "origin": "pointer", "x": 1, "y": 0}),
            )
            .take(HOPS),
        );
        actions.push(json!({"type": "pointerDown"}));
        actions.push(json!({"type": "pointerUp"}));

        let timeline = compile(json!([{
            "type": "pointer", "id": "finger1",
            "actions": actions
        }]))
        .unwrap();
        let events = timeline.events_at(0);
        assert_eq!(events.len(), 2);
        assert_at(motion(&events[0]), ActionCode::Down, 10.0 + HOPS as f64, 20.0);
        assert_at(motion(&events[1]), ActionCode::Up, 10.0 + HOPS as f64, 20.0);
    }

    #[test]
    fn relative_chain_without_anchor_is_rejected() {
        let mut actions: Vec<_> = std::iter::repeat_with(
            || json!({"type": "pointerMove", "duration": 0, "origin": "pointer", "x": 1, "y": 0}),
        )
        .take(1_000)
        .collect();
        actions.push(json!({"type": "pointerDown"}));
        let err = compile(json!([{
            "type": "pointer", "id": "finger1",
            "actions": actions
        }]))
        .unwrap_err();
        assert!(matches!(err, ActionsError::MissingStartPosition { index: 0, .. }));
    }

    #[test]
    fn key_value_must_be_present_and_non_empty() {
        let missing = json!([{
            "type": "key", "id": "keyboard",
            "actions": [{"type": "keyDown", "value": "A"}, {"type": "keyUp"}]
        }]);
        assert!(matches!(
            compile(missing),
            Err(ActionsError::MissingItemField { key: "value", index: 1, .. })
        ));
        let empty = json!([{
            "type": "key", "id": "keyboard",
            "actions": [{"type": "keyDown", "value": ""}]
        }]);
        assert!(matches!(
            compile(empty),
            Err(ActionsError::InvalidItemField { key: "value", .. })
        ));
    }

    #[test]
    fn pen_and_mouse_buttons_are_mapped() {
        assert_eq!(map_button(None, ToolType::Finger), 0);
        assert_eq!(map_button(Some(3), ToolType::Finger), 3);
        assert_eq!(map_button(None, ToolType::Mouse), BUTTON_PRIMARY);
        assert_eq!(map_button(Some(1), ToolType::Mouse), BUTTON_TERTIARY);
        assert_eq!(map_button(Some(2), ToolType::Mouse), BUTTON_SECONDARY);
        assert_eq!(map_button(Some(0), ToolType::Stylus), BUTTON_STYLUS_PRIMARY);
        assert_eq!(map_button(Some(2), ToolType::Stylus), BUTTON_STYLUS_SECONDARY);
        assert_eq!(map_button(Some(1), ToolType::Stylus), BUTTON_TERTIARY);
    }
}
