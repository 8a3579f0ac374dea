//! Piezo beeper on PC6 (OC3A).
//!
//! Timer3 in CTC mode toggles OC3A on every compare match, so the output
//! frequency is 16MHz / (2 * 8 * (OCR3A + 1)). A tone runs until
//! [`Speaker::service`] sees its duration elapse.

use avr_device::atmega32u4::Peripherals;
use retrokb_engine::{Tone, ToneOutput};

/// Timer3 ticks per second at prescaler 8, halved for the toggle.
const HALF_PERIOD_HZ: u32 = 16_000_000 / 8 / 2;

pub struct Speaker<'a> {
    dp: &'a Peripherals,
    /// Length of the running tone, if any.
    playing: Option<u16>,
    started: Option<u32>,
}

impl<'a> Speaker<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        // PC6 output, low.
        dp.PORTC.ddrc.modify(|r, w| unsafe { w.bits(r.bits() | 0x40) });
        dp.PORTC.portc.modify(|r, w| unsafe { w.bits(r.bits() & !0x40) });

        let speaker = Self {
            dp,
            playing: None,
            started: None,
        };
        speaker.stop();
        speaker
    }

    /// Stop the running tone once its duration has elapsed.
    pub fn service(&mut self, now: u32) {
        let Some(duration) = self.playing else {
            return;
        };
        let started = *self.started.get_or_insert(now);
        if now.wrapping_sub(started) >= duration as u32 {
            self.stop();
            self.playing = None;
            self.started = None;
        }
    }

    fn stop(&self) {
        let tc3 = &self.dp.TC3;
        tc3.tccr3a.write(|w| unsafe { w.bits(0) });
        tc3.tccr3b.write(|w| unsafe { w.bits(0) });
        self.dp
            .PORTC
            .portc
            .modify(|r, w| unsafe { w.bits(r.bits() & !0x40) });
    }
}

impl ToneOutput for Speaker<'_> {
    fn tone(&mut self, tone: Tone) {
        if tone.freq_hz == 0 {
            return;
        }
        let top = (HALF_PERIOD_HZ / tone.freq_hz as u32).saturating_sub(1);
        let top = top.min(u16::MAX as u32) as u16;

        let tc3 = &self.dp.TC3;
        tc3.tcnt3.write(|w| unsafe { w.bits(0) });
        tc3.ocr3a.write(|w| unsafe { w.bits(top) });
        // COM3A0: toggle OC3A on match.
        tc3.tccr3a.write(|w| unsafe { w.bits(0x40) });
        // WGM32 (CTC) | CS31 (clk/8).
        tc3.tccr3b.write(|w| unsafe { w.bits(0x08 | 0x02) });

        self.playing = Some(tone.duration_ms);
        self.started = None;
    }
}
