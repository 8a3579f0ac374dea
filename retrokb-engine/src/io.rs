//! Seams to the hardware.
//!
//! The engine owns scan ordering and report decisions; everything electrical
//! (pin setup, USB enumeration, timers) belongs to whoever implements these.

use crate::{KeyId, Mods, Tone, REPORT_SLOTS};

/// Access to the drive and sense lines of the key matrix.
pub trait MatrixIo {
    /// Activate (pull low) or release a drive line.
    fn drive_set(&mut self, line: usize, active: bool);
    /// Electrical level of a sense line, `true` = high. Sense lines are
    /// active low: a pressed switch reads low.
    fn sense_read(&mut self, line: usize) -> bool;
    /// Busy-wait for the lines to settle after a drive change.
    fn settle(&mut self, us: u16);
}

/// The USB HID side. At most one `flush` per scan cycle.
pub trait HidReporter {
    fn set_modifiers(&mut self, mods: Mods);
    fn set_keys(&mut self, keys: [u8; REPORT_SLOTS]);
    /// Hand the assembled report to the host. Returns `false` when it was
    /// not accepted (bus not configured, endpoint busy); the engine then
    /// offers the same state again on the next cycle.
    fn flush(&mut self) -> bool;
}

/// Fire-and-forget beeper.
pub trait ToneOutput {
    fn tone(&mut self, tone: Tone);
}

/// Wall-clock milliseconds, free running and allowed to wrap.
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

/// Bring-up hook fed with every closed switch seen during a scan.
pub trait Diagnostics {
    fn observe(&mut self, drive: usize, sense: usize, key: KeyId);
}

/// Diagnostics sink that compiles away.
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    #[inline(always)]
    fn observe(&mut self, _drive: usize, _sense: usize, _key: KeyId) {}
}

/// For boards without a speaker.
pub struct Silent;

impl ToneOutput for Silent {
    #[inline(always)]
    fn tone(&mut self, _tone: Tone) {}
}
