#![cfg(feature = "tokio")]

use std::time::Duration;

use serial_neopixel::{encode_batch, tokio::SerialNeopixel, Animation, AnimationConfig, Config, Error};
use tokio::{
	io::{duplex, AsyncReadExt, AsyncWriteExt},
	time::Instant,
};

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

// paused clock: the settle sleep advances virtual time, so the gap between
// the delimiter and the payload is measured without real-time flakiness
#[tokio::test(start_paused = true)]
async fn applies_config_over_duplex_transport() {
	init_tracing();

	let (host, mut device) = duplex(1024);

	let config = Config {
		settle_delay: Duration::from_millis(50),
		..Config::default()
	};

	device.write_all(b"Initialized\r\n").await.unwrap();
	let mut session = SerialNeopixel::from_port(host, config).await.unwrap();

	let batch = [AnimationConfig::new(Animation::Rainbow); 2];
	let expected_payload = encode_batch(&batch).unwrap();

	let device_side = async {
		let mut delimiter = [0u8; 1];
		device.read_exact(&mut delimiter).await.unwrap();
		assert_eq!(delimiter, [b' ']);
		let delimiter_at = Instant::now();

		let mut payload = vec![0u8; expected_payload.len()];
		device.read_exact(&mut payload).await.unwrap();
		assert_eq!(payload, expected_payload.as_bytes());
		assert!(delimiter_at.elapsed() >= Duration::from_millis(50));

		device.write_all(b"Got new configuration\r\n").await.unwrap();
	};

	let (response, ()) = tokio::join!(
		async { session.apply_config(&batch).await.unwrap() },
		device_side,
	);
	assert_eq!(response, b"Got new configuration\r\n");
}

#[tokio::test]
async fn handshake_times_out_on_silent_device() {
	init_tracing();

	// keep the far end open so reads pend instead of hitting EOF
	let (host, _device) = duplex(64);

	let config = Config {
		handshake_timeout: Duration::from_millis(100),
		..Config::default()
	};

	let result = SerialNeopixel::from_port(host, config).await;
	assert!(matches!(result, Err(Error::HandshakeTimeout(_))));
}

#[tokio::test]
async fn handshake_fails_on_closed_port() {
	init_tracing();

	let (host, device) = duplex(64);
	drop(device);

	let result = SerialNeopixel::from_port(host, Config::default()).await;
	assert!(matches!(result, Err(Error::Io(_))));
}
