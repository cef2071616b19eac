use anyhow::{Context, Result};
use enigo::Keyboard as _;
use enigo::Mouse as _;
use enigo::{Button as EButton, Coordinate, Direction, Enigo, Key, Settings};
use tracing::{debug, info, trace, warn};

use crate::actions::dispatcher::PointerState;
use crate::actions::keys::{META_ALT_ON, META_CTRL_ON, META_META_ON, META_SHIFT_ON, NamedKey};
use crate::actions::timeline::{
    BUTTON_SECONDARY, BUTTON_STYLUS_SECONDARY, BUTTON_TERTIARY, KeyAction,
};
use crate::actions::{InputEvent, InputInjector, KeyEvent, KeyStroke, MotionAction, MotionEvent};

/// Modifier flags and the key that holds each of them down.
const MODIFIERS: [(u32, Key); 4] = [
    (META_SHIFT_ON, Key::Shift),
    (META_CTRL_ON, Key::Control),
    (META_ALT_ON, Key::Alt),
    (META_META_ON, Key::Meta),
];

/// Injects dispatched input events into the desktop session via Enigo.
/// In dry-run mode, events are only logged and no real input is simulated.
///
/// A desktop has a single cursor, so secondary pointers of a multi-touch
/// gesture cannot be expressed; those events are reported as failed.
pub struct ActionExecutor {
    dry_run: bool,
    enigo: Option<Enigo>,
    /// `META_*_ON` flags of the modifier keys currently pressed.
    held_modifiers: u32,
}

impl ActionExecutor {
    /// Create a new executor.
    /// - dry_run: when true, only logs instead of simulating real input.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            enigo: None,
            held_modifiers: 0,
        }
    }

    /// Returns whether the executor is currently in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Enable or disable dry-run mode dynamically.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Release every modifier this executor still holds down.
    pub fn release_modifiers(&mut self) -> Result<()> {
        self.sync_modifiers(0)
    }

    fn inject_motion(&mut self, event: &MotionEvent) -> Result<bool> {
        let Some(pointer) = event.primary().copied() else {
            warn!(target: "actionforge::actions", action = ?event.action, "Motion event without pointers");
            return Ok(false);
        };
        if let MotionAction::PointerDown { index } | MotionAction::PointerUp { index } = event.action {
            warn!(
                target: "actionforge::actions",
                action = ?event.action, index, pointers = event.pointers.len(),
                "Secondary pointers are not supported by the desktop backend"
            );
            return Ok(false);
        }

        self.sync_modifiers(event.meta_state)?;
        if self.dry_run {
            info!(
                target: "actionforge::actions",
                action = ?event.action, x = pointer.coords.x, y = pointer.coords.y,
                button_state = event.button_state, meta_state = event.meta_state,
                "DRY-RUN motion"
            );
            return Ok(true);
        }

        self.move_to(&pointer)?;
        let direction = match event.action {
            MotionAction::Down => Direction::Press,
            MotionAction::Up => Direction::Release,
            _ => return Ok(true),
        };
        let button = map_button(event.button_state);
        trace!(target: "actionforge::actions", ?button, ?direction, "mouse button");
        self.ensure_enigo()?.button(button, direction)?;
        Ok(true)
    }

    fn inject_key(&mut self, event: &KeyEvent) -> Result<bool> {
        let direction = match event.action {
            KeyAction::Down => Direction::Press,
            KeyAction::Up => Direction::Release,
        };
        let Some(key) = map_key(event.key) else {
            warn!(target: "actionforge::actions", key = ?event.key, "Key has no desktop equivalent");
            return Ok(false);
        };

        self.sync_modifiers(event.meta_state)?;
        if self.dry_run {
            info!(
                target: "actionforge::actions",
                ?key, ?direction, meta_state = event.meta_state,
                "DRY-RUN key"
            );
            return Ok(true);
        }

        trace!(target: "actionforge::actions", ?key, ?direction, "key");
        self.ensure_enigo()?.key(key, direction)?;
        Ok(true)
    }

    fn move_to(&mut self, pointer: &PointerState) -> Result<()> {
        let (x, y) = (pointer.coords.x.round() as i32, pointer.coords.y.round() as i32);
        trace!(target: "actionforge::actions", x, y, "mouse_move_to");
        self.ensure_enigo()?.move_mouse(x, y, Coordinate::Abs)?;
        Ok(())
    }

    /// Press or release modifier keys until the held set matches `meta_state`.
    fn sync_modifiers(&mut self, meta_state: u32) -> Result<()> {
        for (flag, key) in MODIFIERS {
            let wanted = meta_state & flag != 0;
            let held = self.held_modifiers & flag != 0;
            if wanted == held {
                continue;
            }
            if self.dry_run {
                debug!(target: "actionforge::actions", ?key, wanted, "DRY-RUN modifier");
            } else {
                let direction = if wanted { Direction::Press } else { Direction::Release };
                self.ensure_enigo()?.key(key, direction)?;
            }
            self.held_modifiers ^= flag;
        }
        Ok(())
    }

    fn ensure_enigo(&mut self) -> Result<&mut Enigo> {
        if self.enigo.is_none() {
            trace!(target: "actionforge::actions", "Initializing Enigo");
            self.enigo =
                Some(Enigo::new(&Settings::default()).context("Failed to initialize Enigo")?);
        }
        self.enigo.as_mut().context("Enigo must be initialized")
    }
}

impl InputInjector for ActionExecutor {
    fn inject(&mut self, event: &InputEvent) -> bool {
        let result = match event {
            InputEvent::Motion(motion) => self.inject_motion(motion),
            InputEvent::Key(key) => self.inject_key(key),
        };
        match result {
            Ok(ok) => ok,
            Err(err) => {
                warn!(target: "actionforge::actions", error = %err, "Input injection failed");
                false
            }
        }
    }
}

/// Button for a platform button-state value. Touch contacts carry no button
/// and press the primary one, as do `BUTTON_PRIMARY` and `BUTTON_STYLUS_PRIMARY`.
fn map_button(button_state: u32) -> EButton {
    if button_state & (BUTTON_SECONDARY | BUTTON_STYLUS_SECONDARY) != 0 {
        EButton::Right
    } else if button_state & BUTTON_TERTIARY != 0 {
        EButton::Middle
    } else {
        EButton::Left
    }
}

fn map_key(stroke: KeyStroke) -> Option<Key> {
    let key = match stroke {
        KeyStroke::Char(c) => Key::Unicode(c),
        KeyStroke::Named(named) => match named {
            NamedKey::Backspace => Key::Backspace,
            NamedKey::Tab => Key::Tab,
            NamedKey::Return | NamedKey::Enter => Key::Return,
            NamedKey::Escape => Key::Escape,
            NamedKey::Space => Key::Space,
            NamedKey::PageUp => Key::PageUp,
            NamedKey::PageDown => Key::PageDown,
            NamedKey::End => Key::End,
            NamedKey::Home => Key::Home,
            NamedKey::ArrowLeft => Key::LeftArrow,
            NamedKey::ArrowUp => Key::UpArrow,
            NamedKey::ArrowRight => Key::RightArrow,
            NamedKey::ArrowDown => Key::DownArrow,
            NamedKey::Delete => Key::Delete,
            NamedKey::F1 => Key::F1,
            NamedKey::F2 => Key::F2,
            NamedKey::F3 => Key::F3,
            NamedKey::F4 => Key::F4,
            NamedKey::F5 => Key::F5,
            NamedKey::F6 => Key::F6,
            NamedKey::F7 => Key::F7,
            NamedKey::F8 => Key::F8,
            NamedKey::F9 => Key::F9,
            NamedKey::F10 => Key::F10,
            NamedKey::F11 => Key::F11,
            NamedKey::F12 => Key::F12,
            NamedKey::Cancel
            | NamedKey::Help
            | NamedKey::Clear
            | NamedKey::Pause
            | NamedKey::Insert
            | NamedKey::ZenkakuHankaku => return None,
        },
    };
    Some(key)
}
