//! Example: Scanning for Heart Rate Sensors
//!
//! This example scans for peripherals advertising the Heart Rate service
//! (0x180D) and prints them strongest signal first.
//!
//! Run with: `cargo run --example scan_devices`

use heartlink_core::scan::{self, ScanOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Scanning for heart rate sensors...");
    println!();

    let options = ScanOptions::default().duration_secs(10);
    let devices = scan::scan_with_options(options).await?;

    if devices.is_empty() {
        println!("No heart rate sensors found.");
        println!();
        println!("Make sure:");
        println!("  - The strap or watch is awake and broadcasting");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - No other app is holding the connection");
        return Ok(());
    }

    println!("Found {} device(s):", devices.len());
    println!();
    for device in &devices {
        let name = device.name.as_deref().unwrap_or("Unknown");
        let rssi = device
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "n/a".to_string());
        println!("  {:<24} {:<40} {}", name, device.identifier, rssi);
    }

    Ok(())
}
