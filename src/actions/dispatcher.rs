//! Replays a [`Timeline`] against an input device.
//!
//! The dispatcher walks ticks in order and turns the descriptors of each tick
//! into low-level [`InputEvent`]s. It tracks the pointers that are down per
//! tool type, so that a Down/Up is sent as the primary action (first down,
//! last up) or as a secondary pointer action carrying the index of the pointer
//! that changed. Modifier keys are never injected on their own; they are
//! folded into the `meta_state` of every event sent while they are held.
//!
//! Injection failures do not stop the replay. Every event of every tick is
//! attempted and the failures are counted into the [`DispatchOutcome`].

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::keys::{KeyStroke, MetaKeySet, W3cKey, meta_state};
use super::timeline::{
    ActionCode, EventDescriptor, KeyAction, KeyDescriptor, MotionDescriptor, PointerCoords, Tick,
    Timeline, ToolType,
};

/// Low-level pointer action, as a device expects it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotionAction {
    /// First pointer of a gesture touches down.
    Down,
    /// Last pointer of a gesture lifts.
    Up,
    Move,
    /// Another pointer touches down while others are already down. `index` is
    /// its position in the event's pointer list.
    PointerDown { index: usize },
    /// A pointer lifts while others stay down.
    PointerUp { index: usize },
    HoverEnter,
    HoverMove,
    HoverExit,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerState {
    pub id: u32,
    pub coords: PointerCoords,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionEvent {
    /// When the gesture this event belongs to started.
    pub down_time: Instant,
    pub event_time: Instant,
    pub action: MotionAction,
    pub tool_type: ToolType,
    /// Pointers the event describes, ordered by pointer id.
    pub pointers: Vec<PointerState>,
    pub meta_state: u32,
    pub button_state: u32,
}

impl MotionEvent {
    /// The pointer a single-pointer device follows.
    pub fn primary(&self) -> Option<&PointerState> {
        self.pointers.first()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub down_time: Instant,
    pub event_time: Instant,
    pub action: KeyAction,
    pub key: KeyStroke,
    pub meta_state: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Motion(MotionEvent),
    Key(KeyEvent),
}

/// The platform capability that delivers events to a device.
///
/// Returns `false` when the device rejected or failed to deliver the event.
/// The call may block until the event is acknowledged.
pub trait InputInjector {
    fn inject(&mut self, event: &InputEvent) -> bool;
}

/// Result of replaying one timeline.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Events handed to the injector.
    pub injected: usize,
    /// Of those, how many failed.
    pub failed: usize,
}

impl DispatchOutcome {
    /// True when no injection failed.
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Some, but not all, injections failed.
    pub fn is_partial_failure(&self) -> bool {
        self.failed > 0 && self.failed < self.injected
    }

    fn record(&mut self, ok: bool) {
        self.injected += 1;
        if !ok {
            self.failed += 1;
        }
    }
}

/// Pointers of one tool type that are currently down.
#[derive(Debug, Default)]
struct PointerStream {
    balance: u32,
    live: BTreeMap<u32, PointerCoords>,
}

impl PointerStream {
    fn snapshot(&self) -> Vec<PointerState> {
        self.live
            .iter()
            .map(|(&id, &coords)| PointerState { id, coords })
            .collect()
    }

    fn index_of(&self, pointer_id: u32) -> usize {
        self.live
            .keys()
            .position(|&id| id == pointer_id)
            .unwrap_or_default()
    }
}

pub struct Dispatcher<'a, I: InputInjector + ?Sized> {
    injector: &'a mut I,
    pacing: bool,
    start: Instant,
    meta_keys: MetaKeySet,
    streams: BTreeMap<ToolType, PointerStream>,
    outcome: DispatchOutcome,
}

impl<'a, I: InputInjector + ?Sized> Dispatcher<'a, I> {
    pub fn new(injector: &'a mut I) -> Self {
        Self {
            injector,
            pacing: true,
            start: Instant::now(),
            meta_keys: MetaKeySet::new(),
            streams: BTreeMap::new(),
            outcome: DispatchOutcome::default(),
        }
    }

    /// When disabled, ticks are replayed back to back without sleeping.
    pub fn with_pacing(mut self, pacing: bool) -> Self {
        self.pacing = pacing;
        self
    }

    /// Replay `timeline`, sleeping between ticks so that wall-clock spacing
    /// matches tick spacing.
    pub fn dispatch(mut self, timeline: &Timeline) -> DispatchOutcome {
        self.start = Instant::now();
        let mut previous: Tick = 0;

        for (&tick, events) in timeline {
            // Wait out the gap before injecting, so a tick's events land at
            // their offset and a down/up pair keeps its hold time.
            if self.pacing && tick > previous {
                thread::sleep(Duration::from_millis(tick - previous));
            }
            previous = tick;

            let mut motions: BTreeMap<ToolType, Vec<&MotionDescriptor>> = BTreeMap::new();
            for event in events {
                match event {
                    EventDescriptor::Key(key) => self.dispatch_key(key),
                    EventDescriptor::Motion(motion) => {
                        motions.entry(motion.tool_type).or_default().push(motion)
                    }
                }
            }
            for (tool_type, group) in motions {
                self.dispatch_motions(tool_type, &group);
            }
        }

        debug!(
            target: "actionforge::dispatch",
            ticks = timeline.len(),
            injected = self.outcome.injected,
            failed = self.outcome.failed,
            "Timeline dispatched"
        );
        self.outcome
    }

    fn dispatch_key(&mut self, key: &KeyDescriptor) {
        match W3cKey::from_code_point(key.code_point) {
            Some(W3cKey::ReleaseAll) => self.meta_keys.clear(),
            Some(W3cKey::Modifier(meta)) => {
                match key.action {
                    KeyAction::Down => self.meta_keys.insert(meta),
                    KeyAction::Up => self.meta_keys.remove(&meta),
                };
            }
            Some(W3cKey::Stroke(stroke)) => {
                let event = InputEvent::Key(KeyEvent {
                    down_time: self.time_of(key.entry_tick),
                    event_time: Instant::now(),
                    action: key.action,
                    key: stroke,
                    meta_state: meta_state(&self.meta_keys),
                });
                self.inject(event);
            }
            None => {
                warn!(
                    target: "actionforge::dispatch",
                    code_point = key.code_point,
                    "Key value is not a valid character"
                );
                self.outcome.record(false);
            }
        }
    }

    /// Downs go first, then one event for all moves, then ups, then hover
    /// events grouped by action.
    fn dispatch_motions(&mut self, tool_type: ToolType, group: &[&MotionDescriptor]) {
        let of = move |code: ActionCode| group.iter().copied().filter(move |m| m.action == code);

        for down in of(ActionCode::Down) {
            self.pointer_down(tool_type, down);
        }

        let moves: Vec<_> = of(ActionCode::Move).collect();
        if !moves.is_empty() {
            self.pointer_move(tool_type, &moves);
        }

        for up in of(ActionCode::Up) {
            self.pointer_up(tool_type, up);
        }

        for (code, action) in [
            (ActionCode::HoverEnter, MotionAction::HoverEnter),
            (ActionCode::HoverMove, MotionAction::HoverMove),
            (ActionCode::HoverExit, MotionAction::HoverExit),
        ] {
            let hovering: Vec<_> = of(code).collect();
            let Some(first) = hovering.first() else {
                continue;
            };
            let pointers = hovering
                .iter()
                .map(|m| PointerState {
                    id: m.pointer_id,
                    coords: m.coords,
                })
                .collect();
            let event = self.motion_event(first, action, tool_type, pointers, 0);
            self.inject(event);
        }
    }

    fn pointer_down(&mut self, tool_type: ToolType, down: &MotionDescriptor) {
        let stream = self.streams.entry(tool_type).or_default();
        stream.live.insert(down.pointer_id, down.coords);
        stream.balance += 1;
        let action = if stream.balance == 1 {
            MotionAction::Down
        } else {
            MotionAction::PointerDown {
                index: stream.index_of(down.pointer_id),
            }
        };
        let pointers = stream.snapshot();
        let event = self.motion_event(down, action, tool_type, pointers, down.button);
        self.inject(event);
    }

    fn pointer_move(&mut self, tool_type: ToolType, moves: &[&MotionDescriptor]) {
        let stream = self.streams.entry(tool_type).or_default();
        let mut button_state = 0;
        for m in moves {
            if let Some(coords) = stream.live.get_mut(&m.pointer_id) {
                *coords = m.coords;
                button_state |= m.button;
            }
        }
        if stream.live.is_empty() {
            debug!(
                target: "actionforge::dispatch",
                ?tool_type,
                "Skipping move without pointers down"
            );
            return;
        }
        let pointers = stream.snapshot();
        let event = self.motion_event(
            moves[0],
            MotionAction::Move,
            tool_type,
            pointers,
            button_state,
        );
        self.inject(event);
    }

    fn pointer_up(&mut self, tool_type: ToolType, up: &MotionDescriptor) {
        let stream = self.streams.entry(tool_type).or_default();
        if stream.balance == 0 {
            debug!(
                target: "actionforge::dispatch",
                ?tool_type, pointer_id = up.pointer_id,
                "Ignoring unbalanced pointer up"
            );
            return;
        }
        stream.live.insert(up.pointer_id, up.coords);
        let action = if stream.balance <= 1 {
            MotionAction::Up
        } else {
            MotionAction::PointerUp {
                index: stream.index_of(up.pointer_id),
            }
        };
        let pointers = stream.snapshot();
        stream.live.remove(&up.pointer_id);
        stream.balance -= 1;

        let event = self.motion_event(up, action, tool_type, pointers, up.button);
        self.inject(event);
    }

    fn motion_event(
        &self,
        descriptor: &MotionDescriptor,
        action: MotionAction,
        tool_type: ToolType,
        pointers: Vec<PointerState>,
        button_state: u32,
    ) -> InputEvent {
        InputEvent::Motion(MotionEvent {
            down_time: self.time_of(descriptor.entry_tick),
            event_time: Instant::now(),
            action,
            tool_type,
            pointers,
            meta_state: meta_state(&self.meta_keys),
            button_state,
        })
    }

    fn time_of(&self, tick: Tick) -> Instant {
        self.start + Duration::from_millis(tick)
    }

    fn inject(&mut self, event: InputEvent) {
        trace!(target: "actionforge::dispatch", ?event, "Injecting input event");
        let ok = self.injector.inject(&event);
        if !ok {
            warn!(target: "actionforge::dispatch", ?event, "Input event injection failed");
        }
        self.outcome.record(ok);
    }
}
