//! Keyboard engine shared by the firmware and the host tools.
//!
//! Turns a retro-computer keyswitch matrix into USB HID boot-protocol
//! keyboard reports. One scan cycle is: sweep the matrix, run special keys
//! through their state machines, gate every transition through the
//! debouncer, commit into the 6-slot report buffer, then compose and send at
//! most one report.
//!
//! Device differences live entirely in [`DeviceProfile`] data; the logic is
//! shared. This crate is `no_std` so the AVR firmware can use it directly.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod io;
pub mod keycode;
pub mod matrix;
pub mod modifiers;
pub mod profile;
pub mod profiles;
pub mod report;
mod special;

pub use config::{EngineConfig, Tone};
pub use controller::Controller;
pub use debounce::Debouncer;
pub use error::ProfileError;
pub use io::{Clock, Diagnostics, HidReporter, MatrixIo, NoDiagnostics, Silent, ToneOutput};
pub use keycode::Keycode;
pub use matrix::MatrixScanner;
pub use modifiers::Mods;
pub use profile::{Axis, CustomKey, DeviceProfile, LayoutEntry, ModifierKind, ShiftPolicy, Side, Special};
pub use report::{KeyboardReport, ReportBuffer};

/// Linear index of one matrix intersection: `drive * sense_count + sense`.
pub type KeyId = u8;

/// Largest matrix any profile may describe.
pub const MAX_KEYS: usize = 128;

/// Keys the debouncer can track mid-transition at once. Covers every key of
/// the largest built-in matrix (C64, 72 crossings); beyond that the least
/// recently touched entry is evicted. At 4 bytes per entry this keeps the
/// table at 320 bytes of the ATmega32U4's 2.5 KB SRAM.
pub const DEBOUNCE_SLOTS: usize = 80;

/// Key slots in a boot-protocol report.
pub const REPORT_SLOTS: usize = 6;

/// A set of keys, one bit per [`KeyId`].
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct KeySet(u128);

impl KeySet {
    pub const fn new() -> Self {
        KeySet(0)
    }

    pub fn contains(&self, key: KeyId) -> bool {
        self.0 & Self::bit(key) != 0
    }

    pub fn insert(&mut self, key: KeyId) {
        self.0 |= Self::bit(key);
    }

    pub fn remove(&mut self, key: KeyId) {
        self.0 &= !Self::bit(key);
    }

    pub fn set(&mut self, key: KeyId, present: bool) {
        if present {
            self.insert(key);
        } else {
            self.remove(key);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Keys in the set, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = KeyId> {
        let bits = self.0;
        (0..MAX_KEYS as u8).filter(move |&k| bits & (1u128 << k) != 0)
    }

    fn bit(key: KeyId) -> u128 {
        assert!((key as usize) < MAX_KEYS, "key {} out of range", key);
        1u128 << key
    }
}

#[cfg(test)]
mod testlog {
    /// Route engine logs to the test output. Safe to call from every test.
    pub fn setup() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyset_tracks_membership() {
        let mut set = KeySet::new();
        set.insert(0);
        set.insert(71);
        set.insert(127);
        assert!(set.contains(71));
        assert_eq!(set.len(), 3);
        set.remove(71);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 127]);
    }

    #[test]
    fn debouncer_covers_every_builtin_matrix() {
        for profile in profiles::ALL {
            assert!(
                profile.key_count() <= DEBOUNCE_SLOTS,
                "{} has {} keys",
                profile.name,
                profile.key_count()
            );
        }
    }

    #[test]
    #[should_panic]
    fn keyset_rejects_out_of_range() {
        KeySet::new().insert(128);
    }
}
