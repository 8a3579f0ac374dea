//! Commodore 64 keyboard.
//!
//! The 8x8 CIA matrix plus a ninth drive line wired to RESTORE, which on the
//! C64 itself bypasses the matrix (it drives NMI). Drive lines are the CIA port A
//! columns, sense lines the port B rows.

use crate::keycode::Keycode as K;
use crate::profile::{Axis, CustomKey, DeviceProfile, LayoutEntry, ModifierKind, Side, Special};
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

const ___: LayoutEntry = LayoutEntry::key(K::None, "");

pub const INST_DEL: KeyId = 0;
pub const CRSR_RIGHT: KeyId = 2;
pub const CRSR_DOWN: KeyId = 7;
pub const LEFT_SHIFT: KeyId = 15;
pub const COLON: KeyId = 45;
pub const POUND: KeyId = 48;
pub const CLR_HOME: KeyId = 51;
pub const RIGHT_SHIFT: KeyId = 52;
pub const POINTER_UP: KeyId = 54;
pub const CONTROL: KeyId = 58;
pub const COMMODORE: KeyId = 61;
pub const RUN_STOP: KeyId = 63;
pub const RESTORE: KeyId = 64;

#[rustfmt::skip]
static LAYOUT: [LayoutEntry; 72] = [
    // Drive 0
    spc("INST/DEL"), key(K::Enter, "RETURN"), spc("CRSR\u{2194}"), key(K::F7, "F7"),
    key(K::F1, "F1"), key(K::F3, "F3"), key(K::F5, "F5"), spc("CRSR\u{2195}"),
    // Drive 1
    key(K::N3, "3"), key(K::W, "W"), key(K::A, "A"), key(K::N4, "4"),
    key(K::Z, "Z"), key(K::S, "S"), key(K::E, "E"), spc("LSHIFT"),
    // Drive 2
    key(K::N5, "5"), key(K::R, "R"), key(K::D, "D"), key(K::N6, "6"),
    key(K::C, "C"), key(K::F, "F"), key(K::T, "T"), key(K::X, "X"),
    // Drive 3
    key(K::N7, "7"), key(K::Y, "Y"), key(K::G, "G"), key(K::N8, "8"),
    key(K::B, "B"), key(K::H, "H"), key(K::U, "U"), key(K::V, "V"),
    // Drive 4
    key(K::N9, "9"), key(K::I, "I"), key(K::J, "J"), key(K::N0, "0"),
    key(K::M, "M"), key(K::K, "K"), key(K::O, "O"), key(K::N, "N"),
    // Drive 5
    shf(K::Equal, "+"), key(K::P, "P"), key(K::L, "L"), key(K::Minus, "-"),
    key(K::Dot, "."), spc(":"), shf(K::N2, "@"), key(K::Comma, ","),
    // Drive 6
    spc("\u{a3}"), shf(K::N8, "*"), key(K::Semicolon, ";"), spc("CLR/HOME"),
    spc("RSHIFT"), key(K::Equal, "="), spc("\u{2191}"), key(K::Slash, "/"),
    // Drive 7
    key(K::N1, "1"), key(K::Grave, "\u{2190}"), spc("CTRL"), key(K::N2, "2"),
    key(K::Space, "SPACE"), spc("C="), key(K::Q, "Q"), spc("RUN/STOP"),
    // Drive 8: RESTORE only
    spc("RESTORE"), ___, ___, ___, ___, ___, ___, ___,
];

static SPECIALS: [(KeyId, Special); 13] = [
    (INST_DEL, Special::Custom(CustomKey::InstDel)),
    (CRSR_RIGHT, Special::Cursor(Axis::Horizontal)),
    (CRSR_DOWN, Special::Cursor(Axis::Vertical)),
    (LEFT_SHIFT, Special::Shift(Side::Left)),
    (COLON, Special::Custom(CustomKey::Colon)),
    (POUND, Special::Custom(CustomKey::Pound)),
    (CLR_HOME, Special::Custom(CustomKey::ClrHome)),
    (RIGHT_SHIFT, Special::Shift(Side::Right)),
    (POINTER_UP, Special::Custom(CustomKey::PointerUp)),
    (CONTROL, Special::Modifier(ModifierKind::Control)),
    (COMMODORE, Special::Modifier(ModifierKind::Gui)),
    (RUN_STOP, Special::Modifier(ModifierKind::Alt)),
    (RESTORE, Special::Custom(CustomKey::Restore)),
];

pub static PROFILE: DeviceProfile = DeviceProfile {
    name: "c64",
    description: "Commodore 64 (8x8 matrix + RESTORE line)",
    drive_count: 9,
    sense_count: 8,
    layout: &LAYOUT,
    specials: &SPECIALS,
    discrete_shift: false,
    alt_lock: false,
};
