//! Reduced-precision RGB color space used for histogram bucketing.
//!
//! Every 8-bit channel is truncated to its top 5 bits, so the whole RGB cube fits in 15 bits
//! (32768 buckets). Unpacked channels stay in 5-bit units; use [`expand`] to get back to the
//! 8-bit range.

/// Number of bits kept from each channel.
pub const CHANNEL_BITS: u32 = 5;

/// Number of distinct quantized colors.
pub const COLOR_COUNT: usize = 1 << (CHANNEL_BITS * 3);

const CHANNEL_MASK: u16 = (1 << CHANNEL_BITS) - 1;

/// A color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    fn shift(self) -> u32 {
        match self {
            Channel::Red => CHANNEL_BITS * 2,
            Channel::Green => CHANNEL_BITS,
            Channel::Blue => 0,
        }
    }
}

/// An RGB color with 5 bits per channel, packed as `0b0RRRRRGGGGGBBBBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuantizedColor(u16);

impl QuantizedColor {
    pub fn pack(r: u8, g: u8, b: u8) -> Self {
        let reduce = |x: u8| (x >> (8 - CHANNEL_BITS)) as u16;
        Self(reduce(r) << Channel::Red.shift() | reduce(g) << Channel::Green.shift() | reduce(b))
    }

    pub fn from_array([r, g, b]: [u8; 3]) -> Self {
        Self::pack(r, g, b)
    }

    /// Returns the color stored in histogram slot `index`.
    pub(crate) fn from_index(index: usize) -> Self {
        debug_assert!(index < COLOR_COUNT);
        Self(index as u16)
    }

    /// The histogram slot of this color.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Extracts one channel in 5-bit units (`0..=31`).
    pub fn channel(self, channel: Channel) -> u8 {
        ((self.0 >> channel.shift()) & CHANNEL_MASK) as u8
    }

    pub fn red(self) -> u8 {
        self.channel(Channel::Red)
    }

    pub fn green(self) -> u8 {
        self.channel(Channel::Green)
    }

    pub fn blue(self) -> u8 {
        self.channel(Channel::Blue)
    }

    /// All three channels in 5-bit units.
    pub fn channels(self) -> [u8; 3] {
        Channel::ALL.map(|channel| self.channel(channel))
    }

    /// The 8-bit color at the bottom-left corner of this bucket, with the low bits filled by
    /// replicating the high bits so that black and white survive the round trip.
    pub fn to_array(self) -> [u8; 3] {
        [expand(self.red()), expand(self.green()), expand(self.blue())]
    }
}

/// Widens a 5-bit channel to 8 bits. `0` maps to `0` and `31` maps to `255`.
pub fn expand(channel: u8) -> u8 {
    debug_assert!(channel as u16 <= CHANNEL_MASK);
    channel << (8 - CHANNEL_BITS) | channel >> (2 * CHANNEL_BITS - 8)
}
