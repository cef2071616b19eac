//! W3C key values.
//!
//! A `keyDown`/`keyUp` value is a single code point. Code points in the
//! U+E000..U+E05D private-use block name special keys; everything else is a
//! literal character. Modifier keys never reach the device on their own, they
//! are folded into the `meta_state` flags of the events dispatched while they
//! are held.

use std::collections::BTreeSet;

pub const META_SHIFT_ON: u32 = 0x1;
pub const META_ALT_ON: u32 = 0x2;
pub const META_ALT_LEFT_ON: u32 = 0x10;
pub const META_ALT_RIGHT_ON: u32 = 0x20;
pub const META_SHIFT_LEFT_ON: u32 = 0x40;
pub const META_SHIFT_RIGHT_ON: u32 = 0x80;
pub const META_CTRL_ON: u32 = 0x1000;
pub const META_CTRL_LEFT_ON: u32 = 0x2000;
pub const META_CTRL_RIGHT_ON: u32 = 0x4000;
pub const META_META_ON: u32 = 0x10000;
pub const META_META_LEFT_ON: u32 = 0x20000;
pub const META_META_RIGHT_ON: u32 = 0x40000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetaKey {
    ShiftLeft,
    ShiftRight,
    CtrlLeft,
    CtrlRight,
    AltLeft,
    AltRight,
    MetaLeft,
    MetaRight,
}

impl MetaKey {
    pub fn mask(self) -> u32 {
        match self {
            Self::ShiftLeft => META_SHIFT_ON | META_SHIFT_LEFT_ON,
            Self::ShiftRight => META_SHIFT_ON | META_SHIFT_RIGHT_ON,
            Self::CtrlLeft => META_CTRL_ON | META_CTRL_LEFT_ON,
            Self::CtrlRight => META_CTRL_ON | META_CTRL_RIGHT_ON,
            Self::AltLeft => META_ALT_ON | META_ALT_LEFT_ON,
            Self::AltRight => META_ALT_ON | META_ALT_RIGHT_ON,
            Self::MetaLeft => META_META_ON | META_META_LEFT_ON,
            Self::MetaRight => META_META_ON | META_META_RIGHT_ON,
        }
    }
}

/// Combined modifier flags for a set of depressed meta keys.
pub fn meta_state<'a>(keys: impl IntoIterator<Item = &'a MetaKey>) -> u32 {
    keys.into_iter().fold(0, |state, key| state | key.mask())
}

/// Held modifiers, in a stable order.
pub type MetaKeySet = BTreeSet<MetaKey>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Cancel,
    Help,
    Backspace,
    Tab,
    Clear,
    Return,
    Enter,
    Pause,
    Escape,
    Space,
    PageUp,
    PageDown,
    End,
    Home,
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
    Insert,
    Delete,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    ZenkakuHankaku,
}

/// A key that produces a device event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyStroke {
    Named(NamedKey),
    Char(char),
}

/// Meaning of a key value code point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum W3cKey {
    /// U+E000 (and a zero code point): release every held modifier.
    ReleaseAll,
    Modifier(MetaKey),
    Stroke(KeyStroke),
}

impl W3cKey {
    /// Classify a code point. Returns `None` for values that are not Unicode
    /// scalar values.
    pub fn from_code_point(code_point: u32) -> Option<Self> {
        use NamedKey::*;

        let named = |key| Some(Self::Stroke(KeyStroke::Named(key)));
        let modifier = |key| Some(Self::Modifier(key));
        // Numpad keys are typed as the character they print.
        let printed = |c| Some(Self::Stroke(KeyStroke::Char(c)));

        match code_point {
            0 | 0xE000 => Some(Self::ReleaseAll),
            0xE001 => named(Cancel),
            0xE002 => named(Help),
            0xE003 => named(Backspace),
            0xE004 => named(Tab),
            0xE005 => named(Clear),
            0xE006 => named(Return),
            0xE007 => named(Enter),
            0xE008 => modifier(MetaKey::ShiftLeft),
            0xE009 => modifier(MetaKey::CtrlLeft),
            0xE00A => modifier(MetaKey::AltLeft),
            0xE00B => named(Pause),
            0xE00C => named(Escape),
            0xE00D => named(Space),
            0xE00E | 0xE054 => named(PageUp),
            0xE00F | 0xE055 => named(PageDown),
            0xE010 | 0xE056 => named(End),
            0xE011 | 0xE057 => named(Home),
            0xE012 | 0xE058 => named(ArrowLeft),
            0xE013 | 0xE059 => named(ArrowUp),
            0xE014 | 0xE05A => named(ArrowRight),
            0xE015 | 0xE05B => named(ArrowDown),
            0xE016 | 0xE05C => named(Insert),
            0xE017 | 0xE05D => named(Delete),
            0xE018 => printed(';'),
            0xE019 => printed('='),
            0xE01A..=0xE023 => char::from_digit(code_point - 0xE01A, 10).and_then(printed),
            0xE024 => printed('*'),
            0xE025 => printed('+'),
            0xE026 => printed(','),
            0xE027 => printed('-'),
            0xE028 => printed('.'),
            0xE029 => printed('/'),
            0xE031 => named(F1),
            0xE032 => named(F2),
            0xE033 => named(F3),
            0xE034 => named(F4),
            0xE035 => named(F5),
            0xE036 => named(F6),
            0xE037 => named(F7),
            0xE038 => named(F8),
            0xE039 => named(F9),
            0xE03A => named(F10),
            0xE03B => named(F11),
            0xE03C => named(F12),
            0xE03D => modifier(MetaKey::MetaLeft),
            0xE040 => named(ZenkakuHankaku),
            0xE050 => modifier(MetaKey::ShiftRight),
            0xE051 => modifier(MetaKey::CtrlRight),
            0xE052 => modifier(MetaKey::AltRight),
            0xE053 => modifier(MetaKey::MetaRight),
            other => char::from_u32(other).and_then(printed),
        }
    }
}
