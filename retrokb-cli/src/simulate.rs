//! Scripted replay through the real engine.
//!
//! A script is one command per line:
//!
//! ```text
//! # hold shift, then type '@'
//! press 1 7
//! cycle 2
//! release 1 7
//! wait 50
//! ```
//!
//! `press`/`release` close or open the switch at a drive/sense crossing,
//! `cycle [n]` runs n scan cycles (default 1), and `wait <ms>` keeps
//! scanning for that long. Only transmitted reports and tones are printed.

use anyhow::{bail, Context, Result};
use retrokb_engine::{
    Clock, Controller, DeviceProfile, EngineConfig, HidReporter, KeyboardReport, MatrixIo, Mods,
    Tone, ToneOutput, REPORT_SLOTS,
};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Press { drive: usize, sense: usize },
    Release { drive: usize, sense: usize },
    Cycle(u32),
    Wait(u32),
}

/// A parsed step and the script line it came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Line {
    pub number: usize,
    pub step: Step,
}

pub fn parse_script(text: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let number = idx + 1;
        let code = raw.split_once('#').map_or(raw, |(code, _)| code);
        let mut words = code.split_whitespace();
        let Some(cmd) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        let step = match (cmd, args.as_slice()) {
            ("press", [d, s]) => Step::Press {
                drive: number_arg(number, d)?,
                sense: number_arg(number, s)?,
            },
            ("release", [d, s]) => Step::Release {
                drive: number_arg(number, d)?,
                sense: number_arg(number, s)?,
            },
            ("cycle", []) => Step::Cycle(1),
            ("cycle", [n]) => Step::Cycle(number_arg(number, n)?),
            ("wait", [ms]) => Step::Wait(number_arg(number, ms)?),
            ("press" | "release", _) => bail!("line {}: {} takes <drive> <sense>", number, cmd),
            ("cycle", _) => bail!("line {}: cycle takes at most one count", number),
            ("wait", _) => bail!("line {}: wait takes <ms>", number),
            _ => bail!("line {}: unknown command {:?}", number, cmd),
        };
        lines.push(Line { number, step });
    }

    Ok(lines)
}

fn number_arg<T>(line: usize, word: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    word.parse()
        .with_context(|| format!("line {}: expected a number, got {:?}", line, word))
}

/// Something the host would have observed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    Report { at_ms: u32, report: KeyboardReport },
    Tone { at_ms: u32, tone: Tone },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Report { at_ms, report } => {
                write!(f, "{:>7} ms  report {}", at_ms, crate::describe(report))
            }
            Event::Tone { at_ms, tone } => write!(
                f,
                "{:>7} ms  tone   {} Hz for {} ms",
                at_ms, tone.freq_hz, tone.duration_ms
            ),
        }
    }
}

/// Switches closed by the script. Reads like the real active-low matrix.
struct SimMatrix {
    closed: HashSet<(usize, usize)>,
    active: Option<usize>,
}

impl MatrixIo for SimMatrix {
    fn drive_set(&mut self, line: usize, active: bool) {
        if active {
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

struct Recorder {
    pending: KeyboardReport,
    sent: Vec<KeyboardReport>,
}

impl HidReporter for Recorder {
    fn set_modifiers(&mut self, mods: Mods) {
        self.pending.modifiers = mods.bits();
    }

    fn set_keys(&mut self, keys: [u8; REPORT_SLOTS]) {
        self.pending.keys = keys;
    }

    fn flush(&mut self) -> bool {
        self.sent.push(self.pending);
        true
    }
}

#[derive(Default)]
struct ToneLog(Vec<Tone>);

impl ToneOutput for ToneLog {
    fn tone(&mut self, tone: Tone) {
        self.0.push(tone);
    }
}

struct SimClock(u32);

impl Clock for SimClock {
    fn now_ms(&mut self) -> u32 {
        self.0
    }
}

pub struct Simulator {
    ctl: Controller<'static>,
    matrix: SimMatrix,
    hid: Recorder,
    speaker: ToneLog,
    clock: SimClock,
    cycle_ms: u32,
}

impl Simulator {
    pub fn new(profile: &'static DeviceProfile, config: EngineConfig, cycle_ms: u32) -> Result<Self> {
        let ctl = Controller::new(profile, config)
            .with_context(|| format!("loading profile {}", profile.name))?;
        let mut matrix = SimMatrix {
            closed: HashSet::new(),
            active: None,
        };
        ctl.init(&mut matrix);

        Ok(Self {
            ctl,
            matrix,
            hid: Recorder {
                pending: KeyboardReport::empty(),
                sent: Vec::new(),
            },
            speaker: ToneLog::default(),
            clock: SimClock(0),
            cycle_ms: cycle_ms.max(1),
        })
    }

    pub fn run(&mut self, lines: &[Line]) -> Result<Vec<Event>> {
        let mut events = Vec::new();

        for line in lines {
            match line.step {
                Step::Press { drive, sense } => {
                    self.check(line.number, drive, sense)?;
                    self.matrix.closed.insert((drive, sense));
                }
                Step::Release { drive, sense } => {
                    self.check(line.number, drive, sense)?;
                    self.matrix.closed.remove(&(drive, sense));
                }
                Step::Cycle(n) => {
                    for _ in 0..n {
                        self.cycle(&mut events);
                    }
                }
                Step::Wait(ms) => {
                    for _ in 0..ms.div_ceil(self.cycle_ms) {
                        self.cycle(&mut events);
                    }
                }
            }
        }

        Ok(events)
    }

    fn check(&self, line: usize, drive: usize, sense: usize) -> Result<()> {
        let profile = self.ctl.profile();
        if drive >= profile.drive_count || sense >= profile.sense_count {
            bail!(
                "line {}: no key at drive {} sense {} on a {}x{} matrix",
                line,
                drive,
                sense,
                profile.drive_count,
                profile.sense_count
            );
        }
        Ok(())
    }

    fn cycle(&mut self, events: &mut Vec<Event>) {
        self.clock.0 = self.clock.0.wrapping_add(self.cycle_ms);
        let at_ms = self.clock.0;

        self.ctl
            .scan_cycle(&mut self.matrix, &mut self.hid, &mut self.speaker, &mut self.clock);

        for report in self.hid.sent.drain(..) {
            events.push(Event::Report { at_ms, report });
        }
        for tone in self.speaker.0.drain(..) {
            events.push(Event::Tone { at_ms, tone });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrokb_engine::profiles::{c64, vic20};
    use retrokb_engine::Keycode;

    fn run(profile: &'static DeviceProfile, script: &str) -> Vec<Event> {
        let steps = parse_script(script).unwrap();
        Simulator::new(profile, EngineConfig::new(), 1)
            .unwrap()
            .run(&steps)
            .unwrap()
    }

    #[test]
    fn parses_commands_and_skips_comments() {
        let lines = parse_script("# setup\n\npress 7 0  # the 1 key\ncycle\ncycle 3\nwait 20\nrelease 7 0\n").unwrap();
        let steps: Vec<Step> = lines.iter().map(|l| l.step).collect();
        assert_eq!(
            steps,
            vec![
                Step::Press { drive: 7, sense: 0 },
                Step::Cycle(1),
                Step::Cycle(3),
                Step::Wait(20),
                Step::Release { drive: 7, sense: 0 },
            ]
        );
        assert_eq!(lines[0].number, 3);
    }

    #[test]
    fn parse_errors_name_the_line() {
        let err = parse_script("cycle\npress 1\n").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"), "{}", err);

        let err = parse_script("wait soon").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{}", err);

        let err = parse_script("hold 1 2").unwrap_err();
        assert!(err.to_string().contains("unknown command"), "{}", err);
    }

    #[test]
    fn single_key_reports_press_and_release() {
        let events = run(&c64::PROFILE, "press 7 0\ncycle 3\nrelease 7 0\ncycle 3\n");
        assert_eq!(events.len(), 2);

        let Event::Report { at_ms, report } = events[0] else {
            panic!("expected a report, got {:?}", events[0]);
        };
        assert_eq!(at_ms, 2);
        assert_eq!(report.keys[0], Keycode::N1.usage());

        let Event::Report { report, .. } = events[1] else {
            panic!("expected a report, got {:?}", events[1]);
        };
        assert_eq!(report, KeyboardReport::empty());
    }

    #[test]
    fn alt_lock_beeps_while_latched() {
        // Left shift at drive 1 sense 3, right shift at drive 6 sense 4.
        let events = run(&vic20::PROFILE, "press 1 3\ncycle 2\npress 6 4\ncycle 2\nwait 2000\n");
        let tones: Vec<Tone> = events
            .iter()
            .filter_map(|e| match e {
                Event::Tone { tone, .. } => Some(*tone),
                Event::Report { .. } => None,
            })
            .collect();

        let config = EngineConfig::new();
        assert_eq!(tones, vec![config.confirm_tone, config.heartbeat_tone]);
    }

    #[test]
    fn rejects_keys_outside_the_matrix() {
        let steps = parse_script("press 9 0\n").unwrap();
        let err = Simulator::new(&vic20::PROFILE, EngineConfig::new(), 1)
            .unwrap()
            .run(&steps)
            .unwrap_err();
        assert!(err.to_string().contains("line 1"), "{}", err);
    }

    #[test]
    fn events_print_on_one_line() {
        let event = Event::Tone {
            at_ms: 12,
            tone: Tone {
                freq_hz: 440,
                duration_ms: 20,
            },
        };
        assert_eq!(event.to_string(), "     12 ms  tone   440 Hz for 20 ms");
    }
}
