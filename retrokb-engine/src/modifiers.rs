//! HID modifier byte.

use bitflags::bitflags;

bitflags! {
    /// The boot-report modifier byte (bit 0 = Left Control, bit 7 = Right GUI).
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct Mods: u8 {
        const LEFT_CONTROL = 0b0000_0001;
        const LEFT_SHIFT = 0b0000_0010;
        const LEFT_ALT = 0b0000_0100;
        const LEFT_GUI = 0b0000_1000;
        const RIGHT_CONTROL = 0b0001_0000;
        const RIGHT_SHIFT = 0b0010_0000;
        const RIGHT_ALT = 0b0100_0000;
        const RIGHT_GUI = 0b1000_0000;

        const SHIFT = Self::LEFT_SHIFT.bits() | Self::RIGHT_SHIFT.bits();
    }
}

impl Mods {
    /// Short names of the set bits, for decoding reports on the host.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        const NAMES: [(Mods, &str); 8] = [
            (Mods::LEFT_CONTROL, "LCtrl"),
            (Mods::LEFT_SHIFT, "LShift"),
            (Mods::LEFT_ALT, "LAlt"),
            (Mods::LEFT_GUI, "LGui"),
            (Mods::RIGHT_CONTROL, "RCtrl"),
            (Mods::RIGHT_SHIFT, "RShift"),
            (Mods::RIGHT_ALT, "RAlt"),
            (Mods::RIGHT_GUI, "RGui"),
        ];
        NAMES
            .into_iter()
            .filter(move |(bit, _)| self.contains(*bit))
            .map(|(_, name)| name)
    }
}
