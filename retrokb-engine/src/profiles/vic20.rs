//! Commodore VIC-20 keyboard.
//!
//! Drive lines are VIA #2 port B, sense lines port A. This adapter reports
//! the two Shift keys as separate modifiers and layers the alt-lock combos
//! on top of them:
//!
//! - Right Shift pressed while Left Shift is held toggles a persistent
//!   Left Alt latch, with a reminder beep while it is on.
//! - Left Shift pressed while Right Shift is held sends Right Alt for one
//!   report only.

use crate::keycode::Keycode as K;
use crate::profile::{Axis, DeviceProfile, LayoutEntry, ModifierKind, Side, Special};
use crate::KeyId;

const fn key(code: K, label: &'static str) -> LayoutEntry {
    LayoutEntry::key(code, label)
}

const fn shf(code: K, label: &'static str) -> LayoutEntry {
    LayoutEntry::shifted(code, label)
}

const fn spc(label: &'static str) -> LayoutEntry {
    LayoutEntry::special(label)
}

pub const CONTROL: KeyId = 2;
pub const COMMODORE: KeyId = 5;
pub const LEFT_SHIFT: KeyId = 11;
pub const RIGHT_SHIFT: KeyId = 52;
pub const CRSR_RIGHT: KeyId = 58;
pub const CRSR_DOWN: KeyId = 59;

#[rustfmt::skip]
static LAYOUT: [LayoutEntry; 64] = [
    // Drive 0
    key(K::N1, "1"), LayoutEntry::unshifted(K::Grave, "\u{2190}"), spc("CTRL"), key(K::Escape, "RUN/STOP"),
    key(K::Space, "SPACE"), spc("C="), key(K::Q, "Q"), key(K::N2, "2"),
    // Drive 1
    key(K::N3, "3"), key(K::W, "W"), key(K::A, "A"), spc("LSHIFT"),
    key(K::Z, "Z"), key(K::S, "S"), key(K::E, "E"), key(K::N4, "4"),
    // Drive 2
    key(K::N5, "5"), key(K::R, "R"), key(K::D, "D"), key(K::X, "X"),
    key(K::C, "C"), key(K::F, "F"), key(K::T, "T"), key(K::N6, "6"),
    // Drive 3
    key(K::N7, "7"), key(K::Y, "Y"), key(K::G, "G"), key(K::V, "V"),
    key(K::B, "B"), key(K::H, "H"), key(K::U, "U"), key(K::N8, "8"),
    // Drive 4
    key(K::N9, "9"), key(K::I, "I"), key(K::J, "J"), key(K::N, "N"),
    key(K::M, "M"), key(K::K, "K"), key(K::O, "O"), key(K::N0, "0"),
    // Drive 5
    shf(K::Equal, "+"), key(K::P, "P"), key(K::L, "L"), key(K::Comma, ","),
    key(K::Dot, "."), shf(K::Semicolon, ":"), shf(K::N2, "@"), key(K::Minus, "-"),
    // Drive 6
    shf(K::N3, "\u{a3}"), shf(K::N8, "*"), key(K::Semicolon, ";"), key(K::Slash, "/"),
    spc("RSHIFT"), key(K::Equal, "="), shf(K::N6, "\u{2191}"), key(K::Home, "CLR/HOME"),
    // Drive 7
    key(K::Backspace, "INST/DEL"), key(K::Enter, "RETURN"), spc("CRSR\u{2194}"), spc("CRSR\u{2195}"),
    key(K::F1, "F1"), key(K::F3, "F3"), key(K::F5, "F5"), key(K::F7, "F7"),
];

static SPECIALS: [(KeyId, Special); 6] = [
    (CONTROL, Special::Modifier(ModifierKind::Control)),
    (COMMODORE, Special::Modifier(ModifierKind::Gui)),
    (LEFT_SHIFT, Special::Shift(Side::Left)),
    (RIGHT_SHIFT, Special::Shift(Side::Right)),
    (CRSR_RIGHT, Special::Cursor(Axis::Horizontal)),
    (CRSR_DOWN, Special::Cursor(Axis::Vertical)),
];

pub static PROFILE: DeviceProfile = DeviceProfile {
    name: "vic20",
    description: "Commodore VIC-20 (8x8 matrix, alt-lock)",
    drive_count: 8,
    sense_count: 8,
    layout: &LAYOUT,
    specials: &SPECIALS,
    discrete_shift: true,
    alt_lock: true,
};
