//! Keyboard matrix on Teensy GPIO.
//!
//! Pin mapping on Teensy 2.0 (ATmega32U4):
//!   Drive lines (active-low outputs): PF0, PF1, PF4, PF5, PF6, PF7, PB6, PB5,
//!                                     PE6 (C64 RESTORE)
//!   Sense lines (inputs w/ pull-up):  PB0, PB1, PB2, PB3, PD0, PD1, PD2, PD3
//!
//! Inactive drive lines are driven high, so an open switch reads high
//! through the pull-up and a closed switch on the active line reads low.

use avr_device::atmega32u4::Peripherals;
use retrokb_engine::MatrixIo;

#[derive(Clone, Copy)]
enum Port {
    B,
    D,
    E,
    F,
}

/// (port, bit) per drive line.
const DRIVE: [(Port, u8); 9] = [
    (Port::F, 0),
    (Port::F, 1),
    (Port::F, 4),
    (Port::F, 5),
    (Port::F, 6),
    (Port::F, 7),
    (Port::B, 6),
    (Port::B, 5),
    (Port::E, 6),
];

/// (port, bit) per sense line.
const SENSE: [(Port, u8); 8] = [
    (Port::B, 0),
    (Port::B, 1),
    (Port::B, 2),
    (Port::B, 3),
    (Port::D, 0),
    (Port::D, 1),
    (Port::D, 2),
    (Port::D, 3),
];

pub struct GpioMatrix<'a> {
    dp: &'a Peripherals,
}

impl<'a> GpioMatrix<'a> {
    /// Configure drive lines as high outputs and sense lines as pulled-up
    /// inputs.
    pub fn new(dp: &'a Peripherals) -> Self {
        let matrix = Self { dp };
        for (port, bit) in DRIVE {
            matrix.ddr(port, 1 << bit, true);
            matrix.out(port, 1 << bit, true);
        }
        for (port, bit) in SENSE {
            matrix.ddr(port, 1 << bit, false);
            matrix.out(port, 1 << bit, true);
        }
        matrix
    }

    fn ddr(&self, port: Port, mask: u8, output: bool) {
        let apply = |bits: u8| if output { bits | mask } else { bits & !mask };
        match port {
            Port::B => self.dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(apply(r.bits())) }),
            Port::D => self.dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(apply(r.bits())) }),
            Port::E => self.dp.PORTE.ddre.modify(|r, w| unsafe { w.bits(apply(r.bits())) }),
            Port::F => self.dp.PORTF.ddrf.modify(|r, w| unsafe { w.bits(apply(r.bits())) }),
        }
    }

    fn out(&self, port: Port, mask: u8, high: bool) {
        let apply = |bits: u8| if high { bits | mask } else { bits & !mask };
        match port {
            Port::B => self.dp.PORTB.portb.modify(|r, w| unsafe { w.bits(apply(r.bits())) }),
            Port::D => self.dp.PORTD.portd.modify(|r, w| unsafe { w.bits(apply(r.bits())) }),
            Port::E => self.dp.PORTE.porte.modify(|r, w| unsafe { w.bits(apply(r.bits())) }),
            Port::F => self.dp.PORTF.portf.modify(|r, w| unsafe { w.bits(apply(r.bits())) }),
        }
    }

    fn pins(&self, port: Port) -> u8 {
        match port {
            Port::B => self.dp.PORTB.pinb.read().bits(),
            Port::D => self.dp.PORTD.pind.read().bits(),
            Port::E => self.dp.PORTE.pine.read().bits(),
            Port::F => self.dp.PORTF.pinf.read().bits(),
        }
    }
}

impl MatrixIo for GpioMatrix<'_> {
    fn drive_set(&mut self, line: usize, active: bool) {
        if let Some(&(port, bit)) = DRIVE.get(line) {
            self.out(port, 1 << bit, !active);
        }
    }

    fn sense_read(&mut self, line: usize) -> bool {
        match SENSE.get(line) {
            Some(&(port, bit)) => (self.pins(port) >> bit) & 1 != 0,
            None => true,
        }
    }

    fn settle(&mut self, us: u16) {
        // ~1us at 16MHz: 16 cycles / 4 cycles per loop iteration
        for _ in 0..us {
            for _ in 0..4u8 {
                unsafe { core::arch::asm!("nop") };
            }
        }
    }
}
