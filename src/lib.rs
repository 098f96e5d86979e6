//! Configure NeoPixel animation segments via USB serial.
//!
//! The firmware listens on the serial port and renders one animation per LED
//! segment. This crate builds the per-segment [`AnimationConfig`] batch,
//! encodes it as the JSON array the firmware expects, and drives the serial
//! protocol around it: wait for the firmware's boot line, write a single
//! delimiter byte, pause while the device switches into receive mode, then
//! write the payload and read back whatever diagnostics it prints.
//!
//! ```no_run
//! use serial_neopixel::{Animation, AnimationConfig, Color, Config, SerialNeopixel};
//!
//! # fn main() -> serial_neopixel::Result<()> {
//! let mut session = SerialNeopixel::open("/dev/ttyUSB0", Config::default())?;
//!
//! let twinkle = AnimationConfig {
//! 	animation: Animation::Twinkle,
//! 	color1:    Color::rgb(255, 16, 0),
//! 	color2:    Color::rgb(255, 255, 128),
//! 	speed:     1,
//! 	width:     16,
//! };
//! session.apply_config(&[twinkle, twinkle, twinkle])?;
//! # Ok(())
//! # }
//! ```

mod animation;
#[cfg(feature = "tokio")]
pub mod tokio;

use std::{
	io,
	io::{Read, Write},
	thread,
	time::{Duration, Instant},
};

use serialport::SerialPort;
use thiserror::Error;
use tracing::{debug, info};

pub use crate::animation::{encode_batch, Animation, AnimationConfig, Color};

/// Byte written ahead of the payload to announce a configuration message.
pub const CONFIG_DELIMITER: u8 = b' ';

/// Upper bound on the diagnostic response read after sending a batch.
pub const RESPONSE_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Serial(#[from] serialport::Error),
	#[error(transparent)]
	Io(#[from] io::Error),
	#[error(transparent)]
	Encode(#[from] serde_json::Error),
	#[error("device did not signal readiness within {0:?}")]
	HandshakeTimeout(Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Serial link configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
	pub baud_rate:         u32,
	/// Timeout for a single read attempt on the port.
	pub read_timeout:      Duration,
	/// Pause between the delimiter byte and the payload. The firmware needs
	/// this long to switch from rendering to receiving; shortening it loses
	/// the start of the payload.
	pub settle_delay:      Duration,
	/// Upper bound on waiting for the firmware's boot line.
	pub handshake_timeout: Duration,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			baud_rate:         115_200,
			read_timeout:      Duration::from_millis(100),
			settle_delay:      Duration::from_millis(200),
			handshake_timeout: Duration::from_secs(10),
		}
	}
}

/// A session with the LED controller, one per serial device.
///
/// Generic over the transport so tests can substitute an in-memory port;
/// normal use goes through [`SerialNeopixel::open`].
pub struct SerialNeopixel<P = Box<dyn SerialPort>> {
	config: Config,
	port:   P,
}

impl SerialNeopixel {
	/// Opens the serial device and waits for the firmware's readiness line.
	pub fn open(serial_device: &str, config: Config) -> Result<Self> {
		let builder =
			serialport::new(serial_device, config.baud_rate).timeout(config.read_timeout);
		let port = builder.open()?;

		Self::from_port(port, config)
	}
}

impl<P: Read + Write> SerialNeopixel<P> {
	/// Wraps an already-open port and performs the readiness handshake.
	///
	/// The port's own read timeout bounds each read attempt; the handshake as
	/// a whole is bounded by [`Config::handshake_timeout`].
	pub fn from_port(port: P, config: Config) -> Result<Self> {
		let mut session = Self { config, port };
		session.wait_for_ready()?;

		Ok(session)
	}

	/// Sends one configuration per segment and returns the raw response.
	///
	/// Segment order in `batch` is positional against the firmware's strips.
	/// The response is whatever the firmware printed within one read timeout,
	/// up to [`RESPONSE_LEN`] bytes; it is diagnostic output, not an ack.
	pub fn apply_config(&mut self, batch: &[AnimationConfig]) -> Result<Vec<u8>> {
		let payload = encode_batch(batch)?;
		debug!(%payload, "sending configuration");

		self.port.write_all(&[CONFIG_DELIMITER])?;
		thread::sleep(self.config.settle_delay);
		self.port.write_all(payload.as_bytes())?;

		let mut buffer = [0u8; RESPONSE_LEN];
		let read_bytes = match self.port.read(&mut buffer) {
			Ok(n) => n,
			Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
			Err(e) => return Err(e.into()),
		};

		debug!(
			response = %String::from_utf8_lossy(&buffer[..read_bytes]),
			"device responded"
		);

		Ok(buffer[..read_bytes].to_vec())
	}

	/// Blocks until the firmware emits a non-empty line, its signal that the
	/// serial connection is up and it is listening for configurations.
	fn wait_for_ready(&mut self) -> Result<()> {
		let mut buffer = [0u8; 64];
		let mut seen_content = false;
		let deadline = Instant::now() + self.config.handshake_timeout;

		info!("waiting for device to signal readiness");

		loop {
			match self.port.read(&mut buffer) {
				// a closed port never becomes ready
				Ok(0) => {
					return Err(io::Error::new(
						io::ErrorKind::UnexpectedEof,
						"serial port closed during handshake",
					)
					.into());
				}
				Ok(read_bytes) => {
					for &byte in &buffer[..read_bytes] {
						match byte {
							b'\n' if seen_content => {
								info!("device ready");
								return Ok(());
							}
							b'\n' | b'\r' => {}
							_ => seen_content = true,
						}
					}
				}
				Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
				Err(e) => return Err(e.into()),
			}

			if Instant::now() >= deadline {
				return Err(Error::HandshakeTimeout(self.config.handshake_timeout));
			}
		}
	}
}
