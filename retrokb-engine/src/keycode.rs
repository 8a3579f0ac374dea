//! USB HID keycodes.
//! See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07).
//!
//! Only the usages the supported retro keyboards can produce are listed.
//! Modifier usages (0xE0..=0xE7) never appear in the key slots; they live in
//! [`crate::Mods`].

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Keycode {
    /// Empty report slot.
    None = 0x00,

    // Letters
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    // Numbers
    N1 = 0x1E,
    N2 = 0x1F,
    N3 = 0x20,
    N4 = 0x21,
    N5 = 0x22,
    N6 = 0x23,
    N7 = 0x24,
    N8 = 0x25,
    N9 = 0x26,
    N0 = 0x27,

    // Control keys
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    LBracket = 0x2F,
    RBracket = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Grave = 0x35,
    Comma = 0x36,
    Dot = 0x37,
    Slash = 0x38,

    // Function keys
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,

    // Navigation
    Insert = 0x49,
    Home = 0x4A,
    Delete = 0x4C,
    End = 0x4D,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,
}

impl Keycode {
    /// Every keycode, in usage order. Used to map raw report bytes back.
    const ALL: [Keycode; 69] = [
        Keycode::None,
        Keycode::A,
        Keycode::B,
        Keycode::C,
        Keycode::D,
        Keycode::E,
        Keycode::F,
        Keycode::G,
        Keycode::H,
        Keycode::I,
        Keycode::J,
        Keycode::K,
        Keycode::L,
        Keycode::M,
        Keycode::N,
        Keycode::O,
        Keycode::P,
        Keycode::Q,
        Keycode::R,
        Keycode::S,
        Keycode::T,
        Keycode::U,
        Keycode::V,
        Keycode::W,
        Keycode::X,
        Keycode::Y,
        Keycode::Z,
        Keycode::N1,
        Keycode::N2,
        Keycode::N3,
        Keycode::N4,
        Keycode::N5,
        Keycode::N6,
        Keycode::N7,
        Keycode::N8,
        Keycode::N9,
        Keycode::N0,
        Keycode::Enter,
        Keycode::Escape,
        Keycode::Backspace,
        Keycode::Tab,
        Keycode::Space,
        Keycode::Minus,
        Keycode::Equal,
        Keycode::LBracket,
        Keycode::RBracket,
        Keycode::Backslash,
        Keycode::Semicolon,
        Keycode::Quote,
        Keycode::Grave,
        Keycode::Comma,
        Keycode::Dot,
        Keycode::Slash,
        Keycode::F1,
        Keycode::F2,
        Keycode::F3,
        Keycode::F4,
        Keycode::F5,
        Keycode::F6,
        Keycode::F7,
        Keycode::F8,
        Keycode::Insert,
        Keycode::Home,
        Keycode::Delete,
        Keycode::End,
        Keycode::Right,
        Keycode::Left,
        Keycode::Down,
        Keycode::Up,
    ];

    /// Raw usage ID as sent in a report slot.
    pub const fn usage(self) -> u8 {
        self as u8
    }

    /// Map a raw usage ID back to a keycode, if it is one we know about.
    pub fn from_usage(usage: u8) -> Option<Keycode> {
        Self::ALL.iter().copied().find(|k| k.usage() == usage)
    }

    /// Display name for use in layout dumps and report decoding.
    pub fn display_name(self) -> &'static str {
        match self {
            Keycode::None => "",
            Keycode::A => "A",
            Keycode::B => "B",
            Keycode::C => "C",
            Keycode::D => "D",
            Keycode::E => "E",
            Keycode::F => "F",
            Keycode::G => "G",
            Keycode::H => "H",
            Keycode::I => "I",
            Keycode::J => "J",
            Keycode::K => "K",
            Keycode::L => "L",
            Keycode::M => "M",
            Keycode::N => "N",
            Keycode::O => "O",
            Keycode::P => "P",
            Keycode::Q => "Q",
            Keycode::R => "R",
            Keycode::S => "S",
            Keycode::T => "T",
            Keycode::U => "U",
            Keycode::V => "V",
            Keycode::W => "W",
            Keycode::X => "X",
            Keycode::Y => "Y",
            Keycode::Z => "Z",
            Keycode::N1 => "1",
            Keycode::N2 => "2",
            Keycode::N3 => "3",
            Keycode::N4 => "4",
            Keycode::N5 => "5",
            Keycode::N6 => "6",
            Keycode::N7 => "7",
            Keycode::N8 => "8",
            Keycode::N9 => "9",
            Keycode::N0 => "0",
            Keycode::Enter => "Ent",
            Keycode::Escape => "Esc",
            Keycode::Backspace => "Bksp",
            Keycode::Tab => "Tab",
            Keycode::Space => "Spc",
            Keycode::Minus => "-",
            Keycode::Equal => "=",
            Keycode::LBracket => "[",
            Keycode::RBracket => "]",
            Keycode::Backslash => "\\",
            Keycode::Semicolon => ";",
            Keycode::Quote => "'",
            Keycode::Grave => "`",
            Keycode::Comma => ",",
            Keycode::Dot => ".",
            Keycode::Slash => "/",
            Keycode::F1 => "F1",
            Keycode::F2 => "F2",
            Keycode::F3 => "F3",
            Keycode::F4 => "F4",
            Keycode::F5 => "F5",
            Keycode::F6 => "F6",
            Keycode::F7 => "F7",
            Keycode::F8 => "F8",
            Keycode::Insert => "Ins",
            Keycode::Home => "Home",
            Keycode::Delete => "Del",
            Keycode::End => "End",
            Keycode::Right => "\u{2192}",
            Keycode::Left => "\u{2190}",
            Keycode::Down => "\u{2193}",
            Keycode::Up => "\u{2191}",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_lookup_covers_arrows() {
        assert_eq!(Keycode::from_usage(0x1E), Some(Keycode::N1));
        assert_eq!(Keycode::from_usage(0x50), Some(Keycode::Left));
        assert_eq!(Keycode::from_usage(0x52), Some(Keycode::Up));
        assert_eq!(Keycode::from_usage(0xE0), None);
    }
}
