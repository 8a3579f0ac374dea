//! Per-device key tables.
//!
//! A [`DeviceProfile`] is immutable data: the layout table maps every
//! [`KeyId`] of the matrix to a HID usage and a shift policy, and a sparse
//! special-key table routes the few keys with their own behavior to a
//! handler. Supporting another keyboard means writing another profile, never
//! touching the engine.

use crate::error::ProfileError;
use crate::{KeyId, Keycode, MAX_KEYS};

/// How a key interacts with Shift when it is in the report.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShiftPolicy {
    None,
    /// The host character needs Shift; it is added while the key is held.
    Required,
    /// Experimental: Shift is removed from the report while the key is held.
    /// Kept as its own policy; nothing beyond that is promised.
    ForceClearShift,
}

/// One layout-table cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LayoutEntry {
    pub code: Keycode,
    pub policy: ShiftPolicy,
    /// Legend printed on the keycap.
    pub label: &'static str,
}

impl LayoutEntry {
    pub const fn key(code: Keycode, label: &'static str) -> Self {
        Self {
            code,
            policy: ShiftPolicy::None,
            label,
        }
    }

    pub const fn shifted(code: Keycode, label: &'static str) -> Self {
        Self {
            code,
            policy: ShiftPolicy::Required,
            label,
        }
    }

    pub const fn unshifted(code: Keycode, label: &'static str) -> Self {
        Self {
            code,
            policy: ShiftPolicy::ForceClearShift,
            label,
        }
    }

    /// Cell for a key handled entirely by the special-key table.
    pub const fn special(label: &'static str) -> Self {
        Self {
            code: Keycode::None,
            policy: ShiftPolicy::None,
            label,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Side {
    Left,
    Right,
}

/// Level-triggered modifiers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ModifierKind {
    Control,
    Alt,
    Gui,
}

/// Cursor keys that send the reverse direction when shifted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    /// Right, or Left when shifted.
    Horizontal,
    /// Down, or Up when shifted.
    Vertical,
}

/// Device-specific keys that install a fixed code.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CustomKey {
    /// `£`, sent as Shift+3.
    Pound,
    /// Backspace, Insert when shifted.
    InstDel,
    /// `:`, `[` when shifted.
    Colon,
    /// `↑`, sent as `^`.
    PointerUp,
    /// Home, End when shifted.
    ClrHome,
    /// Tab.
    Restore,
}

/// Special-key directory entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Special {
    Shift(Side),
    Modifier(ModifierKind),
    Cursor(Axis),
    Custom(CustomKey),
}

impl Special {
    pub fn tag(&self) -> &'static str {
        match self {
            Special::Shift(Side::Left) => "LShift",
            Special::Shift(Side::Right) => "RShift",
            Special::Modifier(ModifierKind::Control) => "Ctrl",
            Special::Modifier(ModifierKind::Alt) => "Alt",
            Special::Modifier(ModifierKind::Gui) => "Gui",
            Special::Cursor(Axis::Horizontal) => "Crsr\u{2194}",
            Special::Cursor(Axis::Vertical) => "Crsr\u{2195}",
            Special::Custom(CustomKey::Pound) => "Pound",
            Special::Custom(CustomKey::InstDel) => "InstDel",
            Special::Custom(CustomKey::Colon) => "Colon",
            Special::Custom(CustomKey::PointerUp) => "PtrUp",
            Special::Custom(CustomKey::ClrHome) => "ClrHome",
            Special::Custom(CustomKey::Restore) => "Restore",
        }
    }
}

#[derive(Debug)]
pub struct DeviceProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub drive_count: usize,
    pub sense_count: usize,
    /// Indexed by [`KeyId`].
    pub layout: &'static [LayoutEntry],
    pub specials: &'static [(KeyId, Special)],
    /// Report Left and Right Shift as separate modifier bits instead of a
    /// single Left Shift.
    pub discrete_shift: bool,
    /// Enable the shift-combo Alt latch and one-shot Alt pulse.
    pub alt_lock: bool,
}

impl DeviceProfile {
    pub fn key_count(&self) -> usize {
        self.drive_count * self.sense_count
    }

    /// Layout cell for `key`. Panics on a key outside the matrix.
    pub fn entry(&self, key: KeyId) -> &LayoutEntry {
        &self.layout[key as usize]
    }

    pub fn special(&self, key: KeyId) -> Option<Special> {
        self.specials
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, special)| *special)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let key_count = self.key_count();
        if key_count > MAX_KEYS {
            return Err(ProfileError::TooManyKeys {
                key_count,
                max: MAX_KEYS,
            });
        }
        if self.layout.len() != key_count {
            return Err(ProfileError::TableSize {
                expected: key_count,
                actual: self.layout.len(),
            });
        }
        for (i, (key, _)) in self.specials.iter().enumerate() {
            if *key as usize >= key_count {
                return Err(ProfileError::KeyOutOfRange { key: *key, key_count });
            }
            if self.specials[..i].iter().any(|(k, _)| k == key) {
                return Err(ProfileError::DuplicateSpecial { key: *key });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: [LayoutEntry; 4] = [
        LayoutEntry::key(Keycode::N1, "1"),
        LayoutEntry::shifted(Keycode::N2, "@"),
        LayoutEntry::special("SHIFT"),
        LayoutEntry::key(Keycode::A, "A"),
    ];

    fn profile(specials: &'static [(KeyId, Special)]) -> DeviceProfile {
        DeviceProfile {
            name: "test",
            description: "2x2 test matrix",
            drive_count: 2,
            sense_count: 2,
            layout: &LAYOUT,
            specials,
            discrete_shift: false,
            alt_lock: false,
        }
    }

    #[test]
    fn valid_profile_passes() {
        let p = profile(&[(2, Special::Shift(Side::Left))]);
        assert_eq!(p.validate(), Ok(()));
        assert_eq!(p.special(2), Some(Special::Shift(Side::Left)));
        assert_eq!(p.special(3), None);
        assert_eq!(p.entry(1).policy, ShiftPolicy::Required);
    }

    #[test]
    fn rejects_out_of_range_special() {
        let p = profile(&[(4, Special::Cursor(Axis::Vertical))]);
        assert_eq!(
            p.validate(),
            Err(ProfileError::KeyOutOfRange { key: 4, key_count: 4 })
        );
    }

    #[test]
    fn rejects_duplicate_special() {
        let p = profile(&[
            (2, Special::Shift(Side::Left)),
            (2, Special::Shift(Side::Right)),
        ]);
        assert_eq!(p.validate(), Err(ProfileError::DuplicateSpecial { key: 2 }));
    }

    #[test]
    fn rejects_wrong_table_size() {
        let mut p = profile(&[]);
        p.sense_count = 3;
        assert_eq!(
            p.validate(),
            Err(ProfileError::TableSize { expected: 6, actual: 4 })
        );
    }

    #[test]
    #[should_panic]
    fn entry_out_of_range_panics() {
        profile(&[]).entry(4);
    }
}
