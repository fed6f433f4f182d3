pub mod clock;
pub mod durations;
pub mod driver;
pub mod layout;
pub mod playback;
pub mod score;

/// MIDI note number of a key on the instrument.
pub type Pitch = u8;

/// Index of one LED on the strip, counted from zero.
pub type ChannelIndex = u16;
