//! Retro keyboard adapter firmware for ATmega32U4 (Teensy 2.0).
//!
//! Scans a Commodore keyboard matrix on plain GPIO and presents it to the
//! host as a USB boot-protocol keyboard. All keyboard logic lives in
//! `retrokb-engine`; this crate only provides the hardware behind its
//! traits:
//! - `MatrixIo` on ports B, D, E and F
//! - `HidReporter` on the on-chip USB controller
//! - `Clock` from free-running Timer1
//! - `ToneOutput` as a square wave from Timer3 on PC6
//!
//! The keyboard is picked at build time: `--features vic20` for a VIC-20,
//! Commodore 64 otherwise.

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod clock;
mod hid;
mod matrix;
mod tone;

use avr_device::atmega32u4::Peripherals;
use retrokb_engine::{Clock, Controller, EngineConfig};

#[cfg(not(feature = "vic20"))]
use retrokb_engine::profiles::c64::PROFILE;
#[cfg(feature = "vic20")]
use retrokb_engine::profiles::vic20::PROFILE;

use clock::Millis;
use hid::UsbKeyboard;
use matrix::GpioMatrix;
use tone::Speaker;

/// On AVR a panic just parks the CPU.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Clock prescaler 1, 16MHz.
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    let mut io = GpioMatrix::new(&dp);
    let mut usb = UsbKeyboard::new(&dp);
    let mut clock = Millis::new(&dp);
    let mut speaker = Speaker::new(&dp);

    // A profile that fails validation leaves the device idle.
    let Ok(mut keyboard) = Controller::new(&PROFILE, EngineConfig::new()) else {
        loop {}
    };

    keyboard.init(&mut io);
    usb.init();

    loop {
        usb.poll();

        keyboard.scan_cycle(&mut io, &mut usb, &mut speaker, &mut clock);

        let now = clock.now_ms();
        speaker.service(now);

        delay_ms(1);
    }
}

/// Busy-wait delay in milliseconds (approximate, at 16MHz).
fn delay_ms(ms: u16) {
    for _ in 0..ms {
        // 16000 cycles / 4 cycles per loop iteration
        for _ in 0..4000u16 {
            unsafe { core::arch::asm!("nop") };
        }
    }
}
