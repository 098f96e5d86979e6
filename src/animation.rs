use std::fmt;

use serde::Serialize;

use crate::Result;

/// One RGBW color, one byte per channel.
///
/// Channels are `u8`, so every representable color packs into a valid wire
/// value. The firmware drives GRBW strips; for plain RGB strips the white
/// channel is simply ignored on the other end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
	pub red:   u8,
	pub green: u8,
	pub blue:  u8,
	pub white: u8,
}

impl Color {
	pub const BLACK: Color = Color::rgb(0, 0, 0);

	pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
		Self {
			red,
			green,
			blue,
			white: 0,
		}
	}

	pub const fn rgbw(red: u8, green: u8, blue: u8, white: u8) -> Self {
		Self {
			red,
			green,
			blue,
			white,
		}
	}

	/// Packs the channels into the firmware's 32-bit color word:
	/// `white << 24 | red << 16 | green << 8 | blue`.
	pub const fn packed(self) -> u32 {
		(self.white as u32) << 24
			| (self.red as u32) << 16
			| (self.green as u32) << 8
			| self.blue as u32
	}
}

impl From<Color> for u32 {
	fn from(color: Color) -> u32 {
		color.packed()
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{:08x}", self.packed())
	}
}

/// Animations implemented by the firmware.
///
/// The firmware indexes its animation table with the raw discriminant, so the
/// numbers are part of the wire contract and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Animation {
	Off     = 0,
	Color   = 1,
	Rainbow = 2,
	Twinkle = 3,
}

/// Full configuration for one LED segment.
///
/// `speed` and `width` are interpreted by the firmware relative to its
/// baseline of 16; both are cast to `uint8_t` on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationConfig {
	pub animation: Animation,
	pub color1:    Color,
	pub color2:    Color,
	pub speed:     u8,
	pub width:     u8,
}

impl AnimationConfig {
	/// Creates a configuration with the firmware defaults: both colors black,
	/// speed and width 16.
	pub fn new(animation: Animation) -> Self {
		Self {
			animation,
			color1: Color::BLACK,
			color2: Color::BLACK,
			speed: 16,
			width: 16,
		}
	}
}

/// The JSON object the firmware parses, one per segment.
#[derive(Serialize)]
struct WireConfig {
	anim:  u8,
	col1:  u32,
	col2:  u32,
	speed: u8,
	width: u8,
}

impl From<&AnimationConfig> for WireConfig {
	fn from(config: &AnimationConfig) -> Self {
		Self {
			anim:  config.animation as u8,
			col1:  config.color1.packed(),
			col2:  config.color2.packed(),
			speed: config.speed,
			width: config.width,
		}
	}
}

/// Serializes a batch as a compact JSON array, one object per segment in
/// input order. Segment order is positional against the firmware's strips.
///
/// The output is a single line; the firmware determines the end of the
/// message by parse completion, not by a terminator.
pub fn encode_batch(batch: &[AnimationConfig]) -> Result<String> {
	let wire: Vec<WireConfig> = batch.iter().map(WireConfig::from).collect();
	Ok(serde_json::to_string(&wire)?)
}
