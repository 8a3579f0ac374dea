//! Special-key handlers.
//!
//! Keys listed in a profile's special-key table skip the generic
//! layout-table path. Each [`Special`] variant has its own handler; every
//! handler is gated by the debouncer like any other key. Handlers never fall
//! through into one another.

use log::{debug, info};

use crate::controller::ControllerState;
use crate::report::{Release, SetKey};
use crate::{Axis, CustomKey, KeyId, Keycode, ModifierKind, ShiftPolicy, Side, Special, Tone, ToneOutput};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Edge {
    Press,
    Release,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) enum ShiftLatch {
    #[default]
    Idle,
    Held,
}

/// What the handlers need from outside the controller state.
pub(crate) struct Env<'a, T: ToneOutput> {
    pub alt_lock: bool,
    pub confirm_tone: Tone,
    pub now: u32,
    pub audio: &'a mut T,
}

pub(crate) fn handle<T: ToneOutput>(
    state: &mut ControllerState,
    special: Special,
    key: KeyId,
    edge: Edge,
    env: &mut Env<'_, T>,
) {
    match special {
        Special::Shift(side) => shift(state, side, key, edge, env),
        Special::Modifier(kind) => modifier(state, kind, key, edge),
        Special::Cursor(axis) => cursor(state, axis, key, edge),
        Special::Custom(custom) => custom_key(state, custom, key, edge),
    }
}

/// Edge-triggered Shift latch. The modifier bit itself is applied when the
/// report is composed.
fn shift<T: ToneOutput>(
    state: &mut ControllerState,
    side: Side,
    key: KeyId,
    edge: Edge,
    env: &mut Env<'_, T>,
) {
    if !state.debounce.admit(key) {
        return;
    }
    let other_held = state.latches.shift(other(side)) == ShiftLatch::Held;
    let latch = state.latches.shift_mut(side);

    match (edge, *latch) {
        (Edge::Press, ShiftLatch::Idle) => {
            *latch = ShiftLatch::Held;
            state.committed.insert(key);
            state.report.mark_changed();
            debug!("{:?} shift held", side);
            if env.alt_lock && other_held {
                alt_combo(state, side, env);
            }
        }
        (Edge::Release, ShiftLatch::Held) => {
            *latch = ShiftLatch::Idle;
            state.committed.remove(key);
            state.report.mark_changed();
            debug!("{:?} shift released", side);
        }
        // Already in the requested state.
        (Edge::Press, ShiftLatch::Held) => state.committed.insert(key),
        (Edge::Release, ShiftLatch::Idle) => state.committed.remove(key),
    }
}

fn other(side: Side) -> Side {
    match side {
        Side::Left => Side::Right,
        Side::Right => Side::Left,
    }
}

/// Both shifts down: the key pressed second picks the action.
fn alt_combo<T: ToneOutput>(state: &mut ControllerState, pressed: Side, env: &mut Env<'_, T>) {
    match pressed {
        Side::Right => {
            state.latches.alt_lock = !state.latches.alt_lock;
            state.last_beat = env.now;
            info!("alt lock {}", if state.latches.alt_lock { "on" } else { "off" });
        }
        Side::Left => {
            state.latches.alt_pulse = true;
            info!("one-shot right alt");
        }
    }
    env.audio.tone(env.confirm_tone);
}

/// Level-triggered: the bit follows the debounced key.
fn modifier(state: &mut ControllerState, kind: ModifierKind, key: KeyId, edge: Edge) {
    if !state.debounce.admit(key) {
        return;
    }
    let down = edge == Edge::Press;
    let bit = match kind {
        ModifierKind::Control => &mut state.latches.control,
        ModifierKind::Alt => &mut state.latches.alt,
        ModifierKind::Gui => &mut state.latches.gui,
    };
    *bit = down;
    state.committed.set(key, down);
    state.report.mark_changed();
}

/// Direction is picked once, at press time, from the Shift latches.
fn cursor(state: &mut ControllerState, axis: Axis, key: KeyId, edge: Edge) {
    match edge {
        Edge::Press => {
            let reversed = state.latches.shift_held();
            let code = match (axis, reversed) {
                (Axis::Horizontal, false) => Keycode::Right,
                (Axis::Horizontal, true) => Keycode::Left,
                (Axis::Vertical, false) => Keycode::Down,
                (Axis::Vertical, true) => Keycode::Up,
            };
            match state.report.set_key(key, code, ShiftPolicy::None, &mut state.debounce) {
                SetKey::Committed | SetKey::AlreadyHeld => {
                    *state.latches.cursor_mut(axis) = true;
                    state.committed.insert(key);
                }
                SetKey::Pending | SetKey::Rejected => {}
            }
        }
        Edge::Release => match state.report.check_release(key, &mut state.debounce) {
            Release::Released | Release::NotHeld => {
                *state.latches.cursor_mut(axis) = false;
                state.committed.remove(key);
            }
            Release::Pending => {}
        },
    }
}

/// Fixed code for a device-specific key. `shift_gate` means the shifted
/// variant was chosen and a physically held Shift must not reach the host.
struct Action {
    code: Keycode,
    policy: ShiftPolicy,
    shift_gate: bool,
}

fn action(custom: CustomKey, shifted: bool) -> Action {
    let (code, policy, shift_gate) = match (custom, shifted) {
        (CustomKey::Pound, _) => (Keycode::N3, ShiftPolicy::Required, false),
        (CustomKey::PointerUp, _) => (Keycode::N6, ShiftPolicy::Required, false),
        (CustomKey::Restore, _) => (Keycode::Tab, ShiftPolicy::None, false),
        (CustomKey::InstDel, false) => (Keycode::Backspace, ShiftPolicy::None, false),
        (CustomKey::InstDel, true) => (Keycode::Insert, ShiftPolicy::None, true),
        (CustomKey::Colon, false) => (Keycode::Semicolon, ShiftPolicy::Required, false),
        (CustomKey::Colon, true) => (Keycode::LBracket, ShiftPolicy::None, true),
        (CustomKey::ClrHome, false) => (Keycode::Home, ShiftPolicy::None, false),
        (CustomKey::ClrHome, true) => (Keycode::End, ShiftPolicy::None, true),
    };
    Action {
        code,
        policy,
        shift_gate,
    }
}

fn custom_key(state: &mut ControllerState, custom: CustomKey, key: KeyId, edge: Edge) {
    match edge {
        Edge::Press => {
            let act = action(custom, state.latches.shift_held());
            match state.report.set_key(key, act.code, act.policy, &mut state.debounce) {
                SetKey::Committed | SetKey::AlreadyHeld => {
                    state.committed.insert(key);
                    state.latches.shift_gates.set(key, act.shift_gate);
                }
                SetKey::Pending | SetKey::Rejected => {}
            }
        }
        Edge::Release => match state.report.check_release(key, &mut state.debounce) {
            Release::Released | Release::NotHeld => {
                state.committed.remove(key);
                state.latches.shift_gates.remove(key);
            }
            Release::Pending => {}
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_customs_gate_shift() {
        for custom in [CustomKey::InstDel, CustomKey::Colon, CustomKey::ClrHome] {
            assert!(!action(custom, false).shift_gate);
            assert!(action(custom, true).shift_gate);
        }
        assert_eq!(action(CustomKey::ClrHome, true).code, Keycode::End);
        assert_eq!(action(CustomKey::Colon, false).policy, ShiftPolicy::Required);
    }

    #[test]
    fn fixed_customs_ignore_shift() {
        for custom in [CustomKey::Pound, CustomKey::PointerUp, CustomKey::Restore] {
            let plain = action(custom, false);
            let shifted = action(custom, true);
            assert_eq!(plain.code, shifted.code);
            assert!(!shifted.shift_gate);
        }
    }
}
