//! Active-key slots and the boot-protocol report.

use log::debug;

use crate::debounce::Debouncer;
use crate::{KeyId, Keycode, Mods, ShiftPolicy, REPORT_SLOTS};

/// Standard USB HID keyboard report (8 bytes).
/// Byte 0: modifier keys bitmask
/// Byte 1: reserved (0x00)
/// Bytes 2-7: up to 6 simultaneous keycodes
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub reserved: u8,
    pub keys: [u8; REPORT_SLOTS],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            reserved: 0,
            keys: [0; REPORT_SLOTS],
        }
    }

    pub fn mods(&self) -> Mods {
        Mods::from_bits_retain(self.modifiers)
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = self.modifiers;
        out[1] = self.reserved;
        out[2..].copy_from_slice(&self.keys);
        out
    }

    pub fn from_bytes(bytes: &[u8; 8]) -> Self {
        let mut keys = [0u8; REPORT_SLOTS];
        keys.copy_from_slice(&bytes[2..]);
        Self {
            modifiers: bytes[0],
            reserved: bytes[1],
            keys,
        }
    }
}

#[derive(Clone, Copy)]
struct Slot {
    key: KeyId,
    code: Keycode,
    policy: ShiftPolicy,
}

/// Outcome of [`ReportBuffer::set_key`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SetKey {
    /// Newly placed in a slot.
    Committed,
    /// The key already held a slot; nothing changed.
    AlreadyHeld,
    /// Still debouncing.
    Pending,
    /// All six slots are taken.
    Rejected,
}

/// Outcome of [`ReportBuffer::check_release`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Release {
    Released,
    /// Admitted, but the key held no slot.
    NotHeld,
    Pending,
}

/// Up to six held keys plus the shift-policy reference counts they carry.
pub struct ReportBuffer {
    slots: [Option<Slot>; REPORT_SLOTS],
    keys_used: usize,
    changed: bool,
    shift_required: u8,
    shift_cleared: u8,
}

impl ReportBuffer {
    pub const fn new() -> Self {
        Self {
            slots: [None; REPORT_SLOTS],
            keys_used: 0,
            changed: false,
            shift_required: 0,
            shift_cleared: 0,
        }
    }

    /// Place `key` in the first free slot once the debouncer admits it.
    pub fn set_key<const CAP: usize>(
        &mut self,
        key: KeyId,
        code: Keycode,
        policy: ShiftPolicy,
        gate: &mut Debouncer<CAP>,
    ) -> SetKey {
        if self.keys_used == REPORT_SLOTS {
            debug!("report full, ignoring key {}", key);
            return SetKey::Rejected;
        }
        if !gate.admit(key) {
            return SetKey::Pending;
        }
        if self.slot_of(key).is_some() {
            return SetKey::AlreadyHeld;
        }

        // keys_used < REPORT_SLOTS, so a free slot exists.
        if let Some(free) = self.slots.iter_mut().find(|s| s.is_none()) {
            *free = Some(Slot { key, code, policy });
        }
        self.keys_used += 1;
        match policy {
            ShiftPolicy::None => {}
            ShiftPolicy::Required => self.shift_required += 1,
            ShiftPolicy::ForceClearShift => self.shift_cleared += 1,
        }
        self.changed = true;
        debug!("key {} down as {:?}", key, code);
        SetKey::Committed
    }

    /// Free the slot held by `key` once the debouncer admits the release.
    pub fn check_release<const CAP: usize>(
        &mut self,
        key: KeyId,
        gate: &mut Debouncer<CAP>,
    ) -> Release {
        if !gate.admit(key) {
            return Release::Pending;
        }
        let Some(pos) = self.slot_of(key) else {
            return Release::NotHeld;
        };

        if let Some(slot) = self.slots[pos].take() {
            match slot.policy {
                ShiftPolicy::None => {}
                ShiftPolicy::Required => self.shift_required -= 1,
                ShiftPolicy::ForceClearShift => self.shift_cleared -= 1,
            }
            debug!("key {} up", key);
        }
        self.keys_used -= 1;
        self.changed = true;
        Release::Released
    }

    pub fn holds(&self, key: KeyId) -> bool {
        self.slot_of(key).is_some()
    }

    pub fn keys_used(&self) -> usize {
        self.keys_used
    }

    /// Usage codes in slot order, zero for empty slots.
    pub fn keys(&self) -> [u8; REPORT_SLOTS] {
        let mut out = [0u8; REPORT_SLOTS];
        for (out, slot) in out.iter_mut().zip(self.slots.iter()) {
            if let Some(slot) = slot {
                *out = slot.code.usage();
            }
        }
        out
    }

    /// Some held key needs Shift.
    pub fn shift_required(&self) -> bool {
        self.shift_required > 0
    }

    /// Some held key wants Shift suppressed.
    pub fn shift_cleared(&self) -> bool {
        self.shift_cleared > 0
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    fn slot_of(&self, key: KeyId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s, Some(slot) if slot.key == key))
    }
}

impl Default for ReportBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run `set_key` until the debouncer lets it through.
    fn press(buf: &mut ReportBuffer, deb: &mut Debouncer<16>, key: KeyId, code: Keycode, policy: ShiftPolicy) -> SetKey {
        loop {
            match buf.set_key(key, code, policy, deb) {
                SetKey::Pending => continue,
                other => return other,
            }
        }
    }

    fn release(buf: &mut ReportBuffer, deb: &mut Debouncer<16>, key: KeyId) -> Release {
        loop {
            match buf.check_release(key, deb) {
                Release::Pending => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn press_fills_first_free_slot() {
        let mut buf = ReportBuffer::new();
        let mut deb: Debouncer<16> = Debouncer::new(2);

        assert_eq!(buf.set_key(0, Keycode::N1, ShiftPolicy::None, &mut deb), SetKey::Pending);
        assert!(!buf.changed());
        assert_eq!(buf.set_key(0, Keycode::N1, ShiftPolicy::None, &mut deb), SetKey::Committed);
        assert!(buf.changed());
        assert_eq!(buf.keys(), [0x1E, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn seventh_key_is_rejected_without_disturbing_others() {
        crate::testlog::setup();
        let mut buf = ReportBuffer::new();
        let mut deb: Debouncer<16> = Debouncer::new(1);
        let codes = [Keycode::A, Keycode::B, Keycode::C, Keycode::D, Keycode::E, Keycode::F];
        for (key, code) in codes.iter().enumerate() {
            assert_eq!(press(&mut buf, &mut deb, key as KeyId, *code, ShiftPolicy::None), SetKey::Committed);
        }
        let before = buf.keys();

        assert_eq!(buf.set_key(6, Keycode::G, ShiftPolicy::None, &mut deb), SetKey::Rejected);
        assert_eq!(buf.keys(), before);
        assert_eq!(buf.keys_used(), 6);
        // The rejected key never reached the debouncer.
        assert!(!deb.is_tracking(6));
    }

    #[test]
    fn set_key_on_held_key_is_a_no_op() {
        let mut buf = ReportBuffer::new();
        let mut deb: Debouncer<16> = Debouncer::new(1);
        press(&mut buf, &mut deb, 3, Keycode::Q, ShiftPolicy::None);
        buf.clear_changed();

        assert_eq!(press(&mut buf, &mut deb, 3, Keycode::Q, ShiftPolicy::None), SetKey::AlreadyHeld);
        assert_eq!(buf.keys_used(), 1);
        assert!(!buf.changed());
    }

    #[test]
    fn release_frees_slot_for_reuse() {
        let mut buf = ReportBuffer::new();
        let mut deb: Debouncer<16> = Debouncer::new(2);
        press(&mut buf, &mut deb, 1, Keycode::A, ShiftPolicy::None);
        press(&mut buf, &mut deb, 2, Keycode::B, ShiftPolicy::None);

        assert_eq!(release(&mut buf, &mut deb, 1), Release::Released);
        assert_eq!(buf.keys(), [0, 0x05, 0, 0, 0, 0]);

        press(&mut buf, &mut deb, 3, Keycode::C, ShiftPolicy::None);
        assert_eq!(buf.keys(), [0x06, 0x05, 0, 0, 0, 0]);
        assert_eq!(release(&mut buf, &mut deb, 9), Release::NotHeld);
    }

    #[test]
    fn shift_requirement_is_reference_counted() {
        let mut buf = ReportBuffer::new();
        let mut deb: Debouncer<16> = Debouncer::new(1);
        press(&mut buf, &mut deb, 1, Keycode::N2, ShiftPolicy::Required);
        press(&mut buf, &mut deb, 2, Keycode::N8, ShiftPolicy::Required);
        assert!(buf.shift_required());

        release(&mut buf, &mut deb, 1);
        assert!(buf.shift_required(), "second shifted key still held");
        release(&mut buf, &mut deb, 2);
        assert!(!buf.shift_required());
    }

    #[test]
    fn force_clear_policy_is_tracked_separately() {
        let mut buf = ReportBuffer::new();
        let mut deb: Debouncer<16> = Debouncer::new(1);
        press(&mut buf, &mut deb, 4, Keycode::Escape, ShiftPolicy::ForceClearShift);
        assert!(buf.shift_cleared());
        assert!(!buf.shift_required());
        release(&mut buf, &mut deb, 4);
        assert!(!buf.shift_cleared());
    }

    #[test]
    fn report_bytes_layout() {
        let report = KeyboardReport {
            modifiers: Mods::LEFT_SHIFT.bits(),
            reserved: 0,
            keys: [0x1F, 0, 0, 0, 0, 0],
        };
        assert_eq!(report.to_bytes(), [0x02, 0, 0x1F, 0, 0, 0, 0, 0]);
        assert_eq!(KeyboardReport::from_bytes(&report.to_bytes()), report);
    }
}
