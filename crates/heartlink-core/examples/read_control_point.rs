//! Example: Reading the Heart Rate Control Point
//!
//! Connects to the first heart rate sensor in range (or the one named on
//! the command line), reads the control point, writes a heart rate and
//! reads it back.
//!
//! Run with: `cargo run --example read_control_point -- [DEVICE]`

use std::env;

use heartlink_core::{
    BtleplugHost, ConnectionHandle, HeartRate, RequestOptions, UiState, actions,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let options = RequestOptions::new().maybe_identifier(env::args().nth(1));
    let host = BtleplugHost::new().await?;
    let mut handle = ConnectionHandle::new();
    let mut state = UiState::default();

    let reading = actions::connect(&mut handle, &host, &mut state, &options).await?;
    if let Some(label) = handle.device_label(&host) {
        println!("Device:        {}", label);
    }
    println!("Control point: {} (raw {})", reading.value, heartlink_core::hex_dump(&reading.raw));

    let bpm = HeartRate::new(72)?;
    actions::set_heart_rate(&mut handle, &host, &mut state, &options, bpm).await?;
    println!("{}", state.status());

    handle.disconnect(&host).await;
    Ok(())
}
