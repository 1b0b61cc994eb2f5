//! Flow-control requests a voice hands back to the sequencer.

/// Result of dispatching a division on one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteChangeEffect {
    #[default]
    Continue,
    /// End of song (set-speed 0)
    Stop,
    /// Continue at this sequence entry after the current division
    JumpToPattern(u8),
    /// Continue at this division of the next sequence entry
    BreakPattern(u8),
    /// Repeat the current division this many more times
    DelayPattern(u8),
    SetBpm(u8),
    SetTicksPerDivision(u8),
}

impl NoteChangeEffect {
    /// Map a set-speed parameter: 0 stops, up to 32 sets ticks, above sets BPM.
    pub fn from_speed(value: u8) -> Self {
        match value {
            0 => NoteChangeEffect::Stop,
            1..=32 => NoteChangeEffect::SetTicksPerDivision(value),
            _ => NoteChangeEffect::SetBpm(value),
        }
    }
}
