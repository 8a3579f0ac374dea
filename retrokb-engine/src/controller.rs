//! The scan loop body.
//!
//! [`Controller`] owns every piece of mutable keyboard state. Each call to
//! [`Controller::scan_cycle`] sweeps the matrix once, feeds every level change
//! through the special-key handlers or the generic layout path, and sends at
//! most one report, only when something changed.

use log::debug;

use crate::debounce::Debouncer;
use crate::io::{Clock, Diagnostics, HidReporter, MatrixIo, NoDiagnostics, ToneOutput};
use crate::report::{KeyboardReport, Release, ReportBuffer, SetKey};
use crate::special::{self, Edge, Env, ShiftLatch};
use crate::{
    Axis, DeviceProfile, EngineConfig, KeyId, KeySet, Keycode, MatrixScanner, Mods, ProfileError,
    Side, Special, DEBOUNCE_SLOTS, MAX_KEYS,
};

const NO_SPECIAL: u8 = u8::MAX;

/// Modifier state that outlives a single report.
#[derive(Default)]
pub(crate) struct Latches {
    pub left_shift: ShiftLatch,
    pub right_shift: ShiftLatch,
    pub control: bool,
    pub alt: bool,
    pub gui: bool,
    /// Persistent Alt toggled by the shift combo.
    pub alt_lock: bool,
    /// One-shot Right Alt, retracted after the next report.
    pub alt_pulse: bool,
    pub h_cursor: bool,
    pub v_cursor: bool,
    /// Held custom keys that picked their shifted variant.
    pub shift_gates: KeySet,
}

impl Latches {
    pub fn shift(&self, side: Side) -> ShiftLatch {
        match side {
            Side::Left => self.left_shift,
            Side::Right => self.right_shift,
        }
    }

    pub fn shift_mut(&mut self, side: Side) -> &mut ShiftLatch {
        match side {
            Side::Left => &mut self.left_shift,
            Side::Right => &mut self.right_shift,
        }
    }

    pub fn shift_held(&self) -> bool {
        self.left_shift == ShiftLatch::Held || self.right_shift == ShiftLatch::Held
    }

    pub fn cursor_mut(&mut self, axis: Axis) -> &mut bool {
        match axis {
            Axis::Horizontal => &mut self.h_cursor,
            Axis::Vertical => &mut self.v_cursor,
        }
    }

    /// A held key chose its direction or variant from Shift, so Shift itself
    /// must stay out of the report.
    fn shift_suppressed(&self) -> bool {
        self.h_cursor || self.v_cursor || !self.shift_gates.is_empty()
    }
}

/// Everything that changes from cycle to cycle.
pub(crate) struct ControllerState {
    pub report: ReportBuffer,
    pub debounce: Debouncer<DEBOUNCE_SLOTS>,
    /// Debounced level of every key as last committed.
    pub committed: KeySet,
    pub latches: Latches,
    /// Latched part of the modifier mask after the last report.
    pub mods: Mods,
    /// Time of the last alt-lock heartbeat.
    pub last_beat: u32,
}

impl ControllerState {
    fn new(debounce_delay: u8) -> Self {
        Self {
            report: ReportBuffer::new(),
            debounce: Debouncer::new(debounce_delay),
            committed: KeySet::new(),
            latches: Latches::default(),
            mods: Mods::empty(),
            last_beat: 0,
        }
    }

    fn latched_mods(&self, discrete_shift: bool) -> Mods {
        let l = &self.latches;
        let mut mods = Mods::empty();
        mods.set(Mods::LEFT_CONTROL, l.control);
        mods.set(Mods::LEFT_ALT, l.alt || l.alt_lock);
        mods.set(Mods::LEFT_GUI, l.gui);
        if discrete_shift {
            mods.set(Mods::LEFT_SHIFT, l.left_shift == ShiftLatch::Held);
            mods.set(Mods::RIGHT_SHIFT, l.right_shift == ShiftLatch::Held);
        }
        mods
    }

    /// Latched bits plus this report's transient ones.
    fn compose_mods(&self, discrete_shift: bool) -> Mods {
        let l = &self.latches;
        let mut mods = self.latched_mods(discrete_shift);

        if l.shift_suppressed() {
            mods.remove(Mods::SHIFT);
        } else if !discrete_shift && l.shift_held() {
            mods |= Mods::LEFT_SHIFT;
        }
        if self.report.shift_required() {
            mods |= Mods::LEFT_SHIFT;
        }
        if l.alt_pulse {
            mods |= Mods::RIGHT_ALT;
        }
        if self.report.shift_cleared() {
            mods.remove(Mods::SHIFT);
        }
        mods
    }
}

pub struct Controller<'p> {
    profile: &'p DeviceProfile,
    config: EngineConfig,
    scanner: MatrixScanner,
    /// Index into `profile.specials` per key, `NO_SPECIAL` for generic keys.
    directory: [u8; MAX_KEYS],
    state: ControllerState,
}

impl<'p> Controller<'p> {
    pub fn new(profile: &'p DeviceProfile, config: EngineConfig) -> Result<Self, ProfileError> {
        profile.validate()?;

        let mut directory = [NO_SPECIAL; MAX_KEYS];
        for (i, (key, _)) in profile.specials.iter().enumerate() {
            directory[*key as usize] = i as u8;
        }

        Ok(Self {
            profile,
            config,
            scanner: MatrixScanner::new(profile.drive_count, profile.sense_count, config.settle_us),
            directory,
            state: ControllerState::new(config.debounce_delay),
        })
    }

    pub fn profile(&self) -> &'p DeviceProfile {
        self.profile
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scanner(&self) -> &MatrixScanner {
        &self.scanner
    }

    /// Leave every drive line inactive. Call once before the first cycle.
    pub fn init<IO: MatrixIo>(&self, io: &mut IO) {
        self.scanner.release_all(io);
    }

    /// One full pass of the scan loop.
    pub fn scan_cycle<IO, H, T, C>(
        &mut self,
        io: &mut IO,
        hid: &mut H,
        audio: &mut T,
        clock: &mut C,
    ) -> Option<KeyboardReport>
    where
        IO: MatrixIo,
        H: HidReporter,
        T: ToneOutput,
        C: Clock,
    {
        self.scan_cycle_with(io, hid, audio, clock, &mut NoDiagnostics)
    }

    /// [`Self::scan_cycle`] with a diagnostics sink attached to the scanner.
    pub fn scan_cycle_with<IO, H, T, C, D>(
        &mut self,
        io: &mut IO,
        hid: &mut H,
        audio: &mut T,
        clock: &mut C,
        diag: &mut D,
    ) -> Option<KeyboardReport>
    where
        IO: MatrixIo,
        H: HidReporter,
        T: ToneOutput,
        C: Clock,
        D: Diagnostics,
    {
        let pressed = self.scanner.scan(io, diag);
        let now = clock.now_ms();
        self.process(&pressed, audio, now);
        let report = self.compose(hid);
        self.heartbeat(audio, now);
        report
    }

    /// Feed one sweep worth of levels through the handlers.
    pub fn process<T: ToneOutput>(&mut self, pressed: &KeySet, audio: &mut T, now: u32) {
        let mut env = Env {
            alt_lock: self.profile.alt_lock,
            confirm_tone: self.config.confirm_tone,
            now,
            audio,
        };

        for key in 0..self.profile.key_count() as KeyId {
            let down = pressed.contains(key);
            if down == self.state.committed.contains(key) {
                self.state.debounce.settle(key);
                continue;
            }
            let edge = if down { Edge::Press } else { Edge::Release };

            match self.special(key) {
                Some(special) => special::handle(&mut self.state, special, key, edge, &mut env),
                None => self.generic(key, edge),
            }
        }
    }

    /// Send the report if anything changed since the last one. A report the
    /// host did not accept stays pending and is recomposed next cycle.
    pub fn compose<H: HidReporter>(&mut self, hid: &mut H) -> Option<KeyboardReport> {
        if !self.state.report.changed() {
            return None;
        }

        let mods = self.state.compose_mods(self.profile.discrete_shift);
        let keys = self.state.report.keys();
        hid.set_modifiers(mods);
        hid.set_keys(keys);
        if !hid.flush() {
            debug!("report {:02x} {:02x?} not accepted, retrying", mods.bits(), keys);
            return None;
        }
        debug!("report {:02x} {:02x?}", mods.bits(), keys);

        self.state.report.clear_changed();
        self.state.latches.alt_pulse = false;
        self.state.mods = self.state.latched_mods(self.profile.discrete_shift);

        Some(KeyboardReport {
            modifiers: mods.bits(),
            reserved: 0,
            keys,
        })
    }

    fn heartbeat<T: ToneOutput>(&mut self, audio: &mut T, now: u32) {
        if !self.state.latches.alt_lock {
            return;
        }
        if now.wrapping_sub(self.state.last_beat) >= self.config.heartbeat_interval_ms {
            audio.tone(self.config.heartbeat_tone);
            self.state.last_beat = now;
        }
    }

    fn special(&self, key: KeyId) -> Option<Special> {
        match self.directory[key as usize] {
            NO_SPECIAL => None,
            i => Some(self.profile.specials[i as usize].1),
        }
    }

    fn generic(&mut self, key: KeyId, edge: Edge) {
        let profile = self.profile;
        let entry = profile.entry(key);
        // Unwired matrix position.
        if entry.code == Keycode::None {
            return;
        }
        let state = &mut self.state;

        match edge {
            Edge::Press => match state.report.set_key(key, entry.code, entry.policy, &mut state.debounce) {
                SetKey::Committed | SetKey::AlreadyHeld => state.committed.insert(key),
                SetKey::Pending | SetKey::Rejected => {}
            },
            Edge::Release => match state.report.check_release(key, &mut state.debounce) {
                Release::Released | Release::NotHeld => state.committed.remove(key),
                Release::Pending => {}
            },
        }
    }

    /// Latched modifiers as of the last report.
    pub fn modifiers(&self) -> Mods {
        self.state.mods
    }

    pub fn keys_used(&self) -> usize {
        self.state.report.keys_used()
    }

    pub fn is_pressed(&self, key: KeyId) -> bool {
        self.state.committed.contains(key)
    }

    pub fn shift_held(&self) -> bool {
        self.state.latches.shift_held()
    }

    pub fn alt_locked(&self) -> bool {
        self.state.latches.alt_lock
    }

    /// Keys currently mid-debounce.
    pub fn debouncing(&self) -> usize {
        self.state.debounce.pending()
    }
}
