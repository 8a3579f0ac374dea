//! End-to-end scan cycles.
//!
//! Each test drives a real [`Controller`] with an in-memory matrix and
//! records what would have gone out over USB and to the speaker.

use std::collections::HashSet;

use retrokb_engine::profiles::{c64, vic20};
use retrokb_engine::{
    Clock, Controller, DeviceProfile, Diagnostics, EngineConfig, HidReporter, KeyId,
    KeyboardReport, Keycode, LayoutEntry, MatrixIo, Mods, Tone, ToneOutput, REPORT_SLOTS,
};

struct FakeMatrix {
    closed: HashSet<(usize, usize)>,
    active: Option<usize>,
}

impl MatrixIo for FakeMatrix {
    fn drive_set(&mut self, line: usize, active: bool) {
        if active {
            assert!(self.active.is_none(), "two drive lines active");
            self.active = Some(line);
        } else if self.active == Some(line) {
            self.active = None;
        }
    }

    fn sense_read(&mut self, line: usize) -> bool {
        match self.active {
            Some(drive) => !self.closed.contains(&(drive, line)),
            None => true,
        }
    }

    fn settle(&mut self, _us: u16) {}
}

#[derive(Default)]
struct RecordingHid {
    mods: Mods,
    keys: [u8; REPORT_SLOTS],
    sent: Vec<(Mods, [u8; REPORT_SLOTS])>,
    /// Flushes to turn away before accepting again, as a busy endpoint would.
    refuse: usize,
}

impl HidReporter for RecordingHid {
    fn set_modifiers(&mut self, mods: Mods) {
        self.mods = mods;
    }

    fn set_keys(&mut self, keys: [u8; REPORT_SLOTS]) {
        self.keys = keys;
    }

    fn flush(&mut self) -> bool {
        if self.refuse > 0 {
            self.refuse -= 1;
            return false;
        }
        self.sent.push((self.mods, self.keys));
        true
    }
}

#[derive(Default)]
struct Beeper(Vec<Tone>);

impl ToneOutput for Beeper {
    fn tone(&mut self, tone: Tone) {
        self.0.push(tone);
    }
}

#[derive(Default)]
struct FakeClock(u32);

impl Clock for FakeClock {
    fn now_ms(&mut self) -> u32 {
        self.0
    }
}

struct Rig {
    ctl: Controller<'static>,
    io: FakeMatrix,
    hid: RecordingHid,
    beeper: Beeper,
    clock: FakeClock,
}

impl Rig {
    fn new(profile: &'static DeviceProfile) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let ctl = Controller::new(profile, EngineConfig::default()).unwrap();
        let mut io = FakeMatrix {
            closed: HashSet::new(),
            active: None,
        };
        ctl.init(&mut io);
        Rig {
            ctl,
            io,
            hid: RecordingHid::default(),
            beeper: Beeper::default(),
            clock: FakeClock::default(),
        }
    }

    fn position(&self, key: KeyId) -> (usize, usize) {
        self.ctl.scanner().position(key)
    }

    fn press(&mut self, key: KeyId) {
        let pos = self.position(key);
        self.io.closed.insert(pos);
    }

    fn release(&mut self, key: KeyId) {
        let pos = self.position(key);
        self.io.closed.remove(&pos);
    }

    fn cycle(&mut self) -> Option<KeyboardReport> {
        self.clock.0 += 1;
        self.ctl
            .scan_cycle(&mut self.io, &mut self.hid, &mut self.beeper, &mut self.clock)
    }

    /// Run cycles until something is reported, at most `limit`.
    fn settle(&mut self, limit: usize) -> KeyboardReport {
        for _ in 0..limit {
            if let Some(report) = self.cycle() {
                return report;
            }
        }
        panic!("no report within {} cycles", limit);
    }

    /// Press, wait for the report and return it.
    fn tap_down(&mut self, key: KeyId) -> KeyboardReport {
        self.press(key);
        self.settle(4)
    }
}

fn labelled(profile: &DeviceProfile, label: &str) -> KeyId {
    profile
        .layout
        .iter()
        .position(|e| e.label == label)
        .unwrap_or_else(|| panic!("no key labelled {}", label)) as KeyId
}

// One drive line, '1' at drive 0 / sense 0.
static ONE_LAYOUT: [LayoutEntry; 2] = [
    LayoutEntry::key(Keycode::N1, "1"),
    LayoutEntry::key(Keycode::N2, "2"),
];

static ONE_KEY: DeviceProfile = DeviceProfile {
    name: "one",
    description: "1x2 matrix",
    drive_count: 1,
    sense_count: 2,
    layout: &ONE_LAYOUT,
    specials: &[],
    discrete_shift: false,
    alt_lock: false,
};

#[test]
fn single_key_press_and_release() {
    let mut rig = Rig::new(&ONE_KEY);
    rig.press(0);

    assert_eq!(rig.cycle(), None, "first observation is suppressed");
    let report = rig.cycle().expect("admitted on the second cycle");
    assert_eq!(report.modifiers, 0);
    assert_eq!(report.keys, [0x1E, 0, 0, 0, 0, 0]);
    assert_eq!(rig.cycle(), None, "held key does not resend");

    rig.release(0);
    // Debounce is symmetric: releases also commit on the second observation.
    assert_eq!(rig.cycle(), None);
    let report = rig.cycle().expect("release admitted");
    assert_eq!(report.keys, [0; REPORT_SLOTS]);
    assert_eq!(rig.cycle(), None);

    assert_eq!(rig.hid.sent.len(), 2);
}

#[test]
fn refused_release_is_sent_again() {
    let mut rig = Rig::new(&ONE_KEY);
    rig.tap_down(0);

    rig.release(0);
    rig.hid.refuse = 3;
    assert_eq!(rig.cycle(), None);
    for _ in 0..3 {
        assert_eq!(rig.cycle(), None, "endpoint busy");
    }
    let report = rig.cycle().expect("retried once the host accepts");
    assert_eq!(report.keys, [0; REPORT_SLOTS]);
    assert_eq!(rig.cycle(), None);

    assert_eq!(rig.hid.sent.len(), 2);
    assert_eq!(rig.hid.sent[1], (Mods::empty(), [0; REPORT_SLOTS]));
}

#[test]
fn state_before_enumeration_is_delivered_later() {
    let mut rig = Rig::new(&ONE_KEY);
    rig.hid.refuse = usize::MAX;
    rig.press(0);
    for _ in 0..10 {
        assert_eq!(rig.cycle(), None);
    }
    assert!(rig.ctl.is_pressed(0));

    rig.hid.refuse = 0;
    let report = rig.cycle().expect("first report after enumeration");
    assert_eq!(report.keys, [0x1E, 0, 0, 0, 0, 0]);
    assert_eq!(rig.hid.sent.len(), 1);
}

#[test]
fn bounce_never_reaches_the_report() {
    let mut rig = Rig::new(&ONE_KEY);

    for _ in 0..5 {
        rig.press(0);
        assert_eq!(rig.cycle(), None);
        rig.release(0);
        assert_eq!(rig.cycle(), None);
    }
    assert!(rig.hid.sent.is_empty());
    assert_eq!(rig.ctl.debouncing(), 0);

    rig.press(0);
    assert_eq!(rig.cycle(), None, "count restarted");
    assert!(rig.cycle().is_some());
}

#[test]
fn seventh_key_waits_for_a_free_slot() {
    let mut rig = Rig::new(&c64::PROFILE);
    for label in ["W", "A", "Z", "S", "E", "X"] {
        rig.press(labelled(&c64::PROFILE, label));
    }
    let r = labelled(&c64::PROFILE, "R");
    let w = labelled(&c64::PROFILE, "W");
    let report = rig.settle(4);
    assert_eq!(rig.ctl.keys_used(), 6);
    let six = report.keys;
    assert!(six.iter().all(|k| *k != 0));

    rig.press(r);
    for _ in 0..4 {
        assert_eq!(rig.cycle(), None);
    }
    assert!(!rig.ctl.is_pressed(r));

    rig.release(w);
    let report = rig.settle(4);
    assert!(!report.keys.contains(&Keycode::W.usage()));
    let report = rig.settle(4);
    assert!(report.keys.contains(&Keycode::R.usage()));
    assert_eq!(rig.ctl.keys_used(), 6);
}

#[test]
fn c64_shift_required_keys_share_shift() {
    let mut rig = Rig::new(&c64::PROFILE);
    let at = labelled(&c64::PROFILE, "@");
    let star = labelled(&c64::PROFILE, "*");

    let report = rig.tap_down(at);
    assert_eq!(report.mods(), Mods::LEFT_SHIFT);
    assert_eq!(report.keys[0], Keycode::N2.usage());

    rig.tap_down(star);
    rig.release(at);
    let report = rig.settle(4);
    assert_eq!(report.mods(), Mods::LEFT_SHIFT, "'*' still needs shift");
    assert_eq!(report.keys, [0, Keycode::N8.usage(), 0, 0, 0, 0]);

    rig.release(star);
    let report = rig.settle(4);
    assert_eq!(report.mods(), Mods::empty());
}

#[test]
fn c64_cursor_reverses_under_shift() {
    let mut rig = Rig::new(&c64::PROFILE);

    let report = rig.tap_down(c64::LEFT_SHIFT);
    assert_eq!(report.mods(), Mods::LEFT_SHIFT);

    let report = rig.tap_down(c64::CRSR_RIGHT);
    assert_eq!(report.keys[0], Keycode::Left.usage());
    assert_eq!(report.mods(), Mods::empty(), "no literal shift with the reversed cursor");

    let report = rig.tap_down(c64::CRSR_DOWN);
    assert_eq!(report.keys[1], Keycode::Up.usage());

    rig.release(c64::LEFT_SHIFT);
    rig.release(c64::CRSR_RIGHT);
    rig.release(c64::CRSR_DOWN);
    let report = rig.settle(4);
    assert_eq!(report.keys, [0; REPORT_SLOTS]);
    assert_eq!(report.mods(), Mods::empty());

    let report = rig.tap_down(c64::CRSR_DOWN);
    assert_eq!(report.keys[0], Keycode::Down.usage());
}

#[test]
fn c64_custom_keys() {
    let mut rig = Rig::new(&c64::PROFILE);

    let report = rig.tap_down(c64::COLON);
    assert_eq!(report.keys[0], Keycode::Semicolon.usage());
    assert_eq!(report.mods(), Mods::LEFT_SHIFT);
    rig.release(c64::COLON);
    rig.settle(4);

    rig.tap_down(c64::RIGHT_SHIFT);
    let report = rig.tap_down(c64::CLR_HOME);
    assert_eq!(report.keys[0], Keycode::End.usage());
    assert_eq!(report.mods(), Mods::empty());
    rig.release(c64::CLR_HOME);
    let report = rig.settle(4);
    assert_eq!(report.mods(), Mods::LEFT_SHIFT, "shift comes back once CLR/HOME is up");
    rig.release(c64::RIGHT_SHIFT);
    rig.settle(4);

    let report = rig.tap_down(c64::RESTORE);
    assert_eq!(report.keys[0], Keycode::Tab.usage());
    let report = rig.tap_down(c64::POUND);
    assert_eq!(report.keys[1], Keycode::N3.usage());
    assert_eq!(report.mods(), Mods::LEFT_SHIFT);
}

#[test]
fn c64_level_modifiers() {
    let mut rig = Rig::new(&c64::PROFILE);

    let report = rig.tap_down(c64::CONTROL);
    assert_eq!(report.mods(), Mods::LEFT_CONTROL);
    let report = rig.tap_down(c64::RUN_STOP);
    assert_eq!(report.mods(), Mods::LEFT_CONTROL | Mods::LEFT_ALT);
    let report = rig.tap_down(c64::COMMODORE);
    assert_eq!(report.mods(), Mods::LEFT_CONTROL | Mods::LEFT_ALT | Mods::LEFT_GUI);
    assert_eq!(report.keys, [0; REPORT_SLOTS]);

    rig.release(c64::CONTROL);
    let report = rig.settle(4);
    assert_eq!(report.mods(), Mods::LEFT_ALT | Mods::LEFT_GUI);
}

#[test]
fn vic20_reports_discrete_shifts() {
    let mut rig = Rig::new(&vic20::PROFILE);
    let report = rig.tap_down(vic20::RIGHT_SHIFT);
    assert_eq!(report.mods(), Mods::RIGHT_SHIFT);
    assert_eq!(rig.ctl.modifiers(), Mods::RIGHT_SHIFT);
}

#[test]
fn vic20_alt_lock_toggles_with_heartbeat() {
    let mut rig = Rig::new(&vic20::PROFILE);
    let config = EngineConfig::default();

    rig.tap_down(vic20::LEFT_SHIFT);
    let report = rig.tap_down(vic20::RIGHT_SHIFT);
    assert!(rig.ctl.alt_locked());
    assert!(report.mods().contains(Mods::LEFT_ALT));
    assert_eq!(rig.beeper.0, vec![config.confirm_tone]);

    rig.release(vic20::LEFT_SHIFT);
    rig.release(vic20::RIGHT_SHIFT);
    let report = rig.settle(4);
    assert_eq!(report.mods(), Mods::LEFT_ALT, "latch survives releasing both shifts");

    rig.clock.0 += config.heartbeat_interval_ms;
    rig.cycle();
    assert_eq!(rig.beeper.0.last(), Some(&config.heartbeat_tone));
    let beeps = rig.beeper.0.len();
    rig.cycle();
    assert_eq!(rig.beeper.0.len(), beeps, "no beep before the next interval");

    rig.tap_down(vic20::LEFT_SHIFT);
    let report = rig.tap_down(vic20::RIGHT_SHIFT);
    assert!(!rig.ctl.alt_locked());
    assert!(!report.mods().contains(Mods::LEFT_ALT));

    let beeps = rig.beeper.0.len();
    rig.clock.0 += 3 * config.heartbeat_interval_ms;
    rig.cycle();
    assert_eq!(rig.beeper.0.len(), beeps, "heartbeat stopped");
}

#[test]
fn vic20_one_shot_right_alt() {
    let mut rig = Rig::new(&vic20::PROFILE);

    rig.tap_down(vic20::RIGHT_SHIFT);
    let report = rig.tap_down(vic20::LEFT_SHIFT);
    assert!(report.mods().contains(Mods::RIGHT_ALT));
    assert!(!rig.ctl.alt_locked());
    assert_eq!(rig.beeper.0.len(), 1);

    let report = rig.tap_down(labelled(&vic20::PROFILE, "A"));
    assert_eq!(report.keys[0], Keycode::A.usage());
    assert!(!report.mods().contains(Mods::RIGHT_ALT), "pulse lasts one report");
}

#[test]
fn one_shot_alt_survives_a_refused_report() {
    let mut rig = Rig::new(&vic20::PROFILE);
    rig.tap_down(vic20::RIGHT_SHIFT);

    rig.hid.refuse = 1;
    let report = rig.tap_down(vic20::LEFT_SHIFT);
    assert!(report.mods().contains(Mods::RIGHT_ALT));
    let (mods, _) = *rig.hid.sent.last().unwrap();
    assert!(mods.contains(Mods::RIGHT_ALT));
    assert_eq!(rig.beeper.0.len(), 1, "confirm tone plays once");
}

#[test]
fn c64_shift_combo_is_plain_shift() {
    let mut rig = Rig::new(&c64::PROFILE);
    rig.tap_down(c64::LEFT_SHIFT);
    let report = rig.tap_down(c64::RIGHT_SHIFT);
    assert_eq!(report.mods(), Mods::LEFT_SHIFT);
    assert!(!rig.ctl.alt_locked());
    assert!(rig.beeper.0.is_empty());
}

#[derive(Default)]
struct ClosureLog(Vec<(usize, usize, KeyId)>);

impl Diagnostics for ClosureLog {
    fn observe(&mut self, drive: usize, sense: usize, key: KeyId) {
        self.0.push((drive, sense, key));
    }
}

#[test]
fn diagnostics_see_raw_closures() {
    let mut rig = Rig::new(&c64::PROFILE);
    rig.press(c64::RESTORE);

    let mut seen = ClosureLog::default();
    let report = rig.ctl.scan_cycle_with(
        &mut rig.io,
        &mut rig.hid,
        &mut rig.beeper,
        &mut rig.clock,
        &mut seen,
    );
    assert_eq!(report, None, "still debouncing");
    assert_eq!(seen.0, vec![(8, 0, c64::RESTORE)]);
}
