//! Async variant of the session, built on `tokio-serial`.

use std::io;

use tokio::{
	io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
	time,
};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::{
	encode_batch,
	AnimationConfig,
	Config,
	Error,
	Result,
	CONFIG_DELIMITER,
	RESPONSE_LEN,
};

/// A session with the LED controller, one per serial device.
///
/// Same protocol as the blocking [`SerialNeopixel`](crate::SerialNeopixel);
/// the settle delay and the timeout bounds run on the tokio clock instead of
/// blocking the thread.
pub struct SerialNeopixel<P = SerialStream> {
	config: Config,
	port:   P,
}

impl SerialNeopixel {
	/// Opens the serial device and waits for the firmware's readiness line.
	pub async fn open(serial_device: &str, config: Config) -> Result<Self> {
		let builder = tokio_serial::new(serial_device, config.baud_rate);
		let port = builder.open_native_async()?;

		Self::from_port(port, config).await
	}
}

impl<P: AsyncRead + AsyncWrite + Unpin> SerialNeopixel<P> {
	/// Wraps an already-open port and performs the readiness handshake.
	pub async fn from_port(port: P, config: Config) -> Result<Self> {
		let mut session = Self { config, port };
		session.wait_for_ready().await?;

		Ok(session)
	}

	/// Sends one configuration per segment and returns the raw response.
	pub async fn apply_config(&mut self, batch: &[AnimationConfig]) -> Result<Vec<u8>> {
		let payload = encode_batch(batch)?;
		debug!(%payload, "sending configuration");

		self.port.write_all(&[CONFIG_DELIMITER]).await?;
		time::sleep(self.config.settle_delay).await;
		self.port.write_all(payload.as_bytes()).await?;

		let mut buffer = [0u8; RESPONSE_LEN];
		let read_bytes =
			match time::timeout(self.config.read_timeout, self.port.read(&mut buffer)).await {
				Ok(read) => read?,
				Err(_) => 0,
			};

		debug!(
			response = %String::from_utf8_lossy(&buffer[..read_bytes]),
			"device responded"
		);

		Ok(buffer[..read_bytes].to_vec())
	}

	async fn wait_for_ready(&mut self) -> Result<()> {
		info!("waiting for device to signal readiness");

		time::timeout(self.config.handshake_timeout, self.read_readiness_line())
			.await
			.map_err(|_| Error::HandshakeTimeout(self.config.handshake_timeout))?
	}

	/// Reads until the firmware emits a non-empty line; blank lines and
	/// stray line endings before it are skipped.
	async fn read_readiness_line(&mut self) -> Result<()> {
		let mut buffer = [0u8; 64];
		let mut seen_content = false;

		loop {
			let read_bytes = self.port.read(&mut buffer).await?;
			// a closed port never becomes ready
			if read_bytes == 0 {
				return Err(io::Error::new(
					io::ErrorKind::UnexpectedEof,
					"serial port closed during handshake",
				)
				.into());
			}

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
	}
}
