//! Engine tuning knobs.

/// A square-wave beep.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Tone {
    pub freq_hz: u16,
    pub duration_ms: u16,
}

/// Timing and feedback settings for a [`crate::Controller`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EngineConfig {
    /// Consecutive scan cycles a new level must be seen before it commits.
    pub debounce_delay: u8,
    /// Settling time between driving a line and sampling the sense lines.
    pub settle_us: u16,
    /// Period of the reminder beep while the Alt latch is on.
    pub heartbeat_interval_ms: u32,
    pub heartbeat_tone: Tone,
    /// Beep acknowledging an alt-lock combo.
    pub confirm_tone: Tone,
}

impl EngineConfig {
    pub const fn new() -> Self {
        Self {
            debounce_delay: 2,
            settle_us: 5,
            heartbeat_interval_ms: 2000,
            heartbeat_tone: Tone {
                freq_hz: 440,
                duration_ms: 20,
            },
            confirm_tone: Tone {
                freq_hz: 1760,
                duration_ms: 60,
            },
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
