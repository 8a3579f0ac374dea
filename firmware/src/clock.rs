//! Millisecond clock on Timer1.
//!
//! Timer1 free-runs at 16MHz / 1024, one tick every 64us. Nothing is
//! interrupt driven: every `now_ms` call folds the ticks elapsed since the
//! previous call into the running count, so it must be called at least once
//! per 16-bit wrap (about 4.2s). The scan loop calls it every cycle.

use avr_device::atmega32u4::Peripherals;
use retrokb_engine::Clock;

const US_PER_TICK: u32 = 64;

pub struct Millis<'a> {
    dp: &'a Peripherals,
    last: u16,
    frac_us: u32,
    ms: u32,
}

impl<'a> Millis<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        // Normal mode, CS12|CS10 = clk/1024.
        dp.TC1.tccr1a.write(|w| unsafe { w.bits(0) });
        dp.TC1.tccr1b.write(|w| unsafe { w.bits(0x05) });
        dp.TC1.tcnt1.write(|w| unsafe { w.bits(0) });

        Self {
            dp,
            last: 0,
            frac_us: 0,
            ms: 0,
        }
    }
}

impl Clock for Millis<'_> {
    fn now_ms(&mut self) -> u32 {
        let count = self.dp.TC1.tcnt1.read().bits();
        let ticks = count.wrapping_sub(self.last);
        self.last = count;

        self.frac_us += ticks as u32 * US_PER_TICK;
        self.ms = self.ms.wrapping_add(self.frac_us / 1000);
        self.frac_us %= 1000;
        self.ms
    }
}
