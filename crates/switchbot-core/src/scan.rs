//! Device discovery and scanning.
//!
//! This module finds SwitchBot Bots in range using Bluetooth Low Energy.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::util::{address_matches, create_identifier, format_peripheral_id};
use crate::uuid::{BOT_LOCAL_NAME, SWITCHBOT_SERVICE};

/// Information about a discovered Bot.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredBot {
    /// Advertised local name, normally `WoHand`.
    pub name: Option<String>,
    /// The BLE address as a string (zeros on macOS, use `identifier` instead).
    pub address: String,
    /// A connection identifier (peripheral ID on macOS, address elsewhere).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// The peripheral ID for connecting.
    #[serde(skip)]
    pub id: PeripheralId,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only return devices that look like Bots.
    pub filter_bots_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            filter_bots_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    #[must_use]
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Set whether to filter for Bots only.
    #[must_use]
    pub fn filter_bots_only(mut self, filter: bool) -> Self {
        self.filter_bots_only = filter;
        self
    }

    /// Report every BLE device, not just Bots.
    #[must_use]
    pub fn all_devices(self) -> Self {
        self.filter_bots_only(false)
    }

    /// Lengths of the scans [`find_device`] runs, growing 1:2:3.
    ///
    /// Together they fill `duration`, with each scan at least
    /// [`MIN_SCAN_ATTEMPT`] long.
    pub fn attempt_durations(&self) -> [Duration; FIND_ATTEMPTS as usize] {
        let unit = (self.duration / 6).max(MIN_SCAN_ATTEMPT);
        [unit, unit * 2, unit * 3]
    }
}

/// Scans [`find_device`] runs before giving up.
const FIND_ATTEMPTS: u32 = 3;

/// Shortest scan [`find_device`] will run.
pub const MIN_SCAN_ATTEMPT: Duration = Duration::from_millis(500);

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan for Bots in range with default options.
///
/// An empty list means nothing was found before the scan window closed.
///
/// # Errors
///
/// Returns an error if no Bluetooth adapter is available or the scan could
/// not be started or stopped.
pub async fn scan_for_bots() -> Result<Vec<DiscoveredBot>> {
    scan_with_options(ScanOptions::default()).await
}

/// Scan for devices with custom options.
#[tracing::instrument(level = "info", skip_all, fields(duration = ?options.duration))]
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredBot>> {
    let adapter = get_adapter().await?;
    scan_with_adapter(&adapter, options).await
}

/// Scan for devices using a specific adapter.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredBot>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    let mut discovered = Vec::new();

    for peripheral in peripherals {
        match process_peripheral(&peripheral, options.filter_bots_only).await {
            Ok(Some(bot)) => {
                info!("Found Bot: {}", bot.identifier);
                discovered.push(bot);
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
            }
        }
    }

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

async fn process_peripheral(
    peripheral: &Peripheral,
    filter_bots_only: bool,
) -> Result<Option<DiscoveredBot>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    if filter_bots_only && !is_bot(&properties) {
        return Ok(None);
    }

    let id = peripheral.id();
    let address = properties.address.to_string();
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredBot {
        name: properties.local_name,
        address,
        identifier,
        rssi: properties.rssi,
        id,
    }))
}

/// Whether advertised properties belong to a Bot.
fn is_bot(properties: &PeripheralProperties) -> bool {
    advertises_bot(
        properties.local_name.as_deref(),
        properties
            .services
            .iter()
            .chain(properties.service_data.keys()),
    )
}

fn advertises_bot<'a>(
    local_name: Option<&str>,
    mut services: impl Iterator<Item = &'a Uuid>,
) -> bool {
    services.any(|uuid| *uuid == SWITCHBOT_SERVICE) || local_name == Some(BOT_LOCAL_NAME)
}

/// Find a Bot by address (or platform identifier) with custom options.
///
/// Checks peripherals the adapter already knows about first, then performs
/// up to 3 scans of increasing length that together last about
/// `options.duration`.
#[tracing::instrument(level = "info", skip(options))]
pub async fn find_device(
    identifier: &str,
    options: &ScanOptions,
) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter().await?;

    if let Some(peripheral) = find_peripheral_by_identifier(&adapter, identifier).await? {
        info!("Found device in cache (no scan needed)");
        return Ok((adapter, peripheral));
    }

    let max_attempts = FIND_ATTEMPTS;
    for (attempt, scan_duration) in (1..=max_attempts).zip(options.attempt_durations()) {
        info!(
            "Scan attempt {}/{} ({:.1}s)...",
            attempt,
            max_attempts,
            scan_duration.as_secs_f32()
        );

        adapter.start_scan(ScanFilter::default()).await?;
        sleep(scan_duration).await;
        adapter.stop_scan().await?;

        if let Some(peripheral) = find_peripheral_by_identifier(&adapter, identifier).await? {
            info!("Found device on attempt {}", attempt);
            return Ok((adapter, peripheral));
        }

        if attempt < max_attempts {
            warn!("Device not found, retrying...");
        }
    }

    warn!(
        "Device not found after {} attempts: {}",
        max_attempts, identifier
    );
    Err(Error::device_not_found(identifier))
}

/// Search through known peripherals for one matching the identifier.
async fn find_peripheral_by_identifier(
    adapter: &Adapter,
    identifier: &str,
) -> Result<Option<Peripheral>> {
    let identifier_lower = identifier.to_lowercase();
    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        if let Ok(Some(props)) = peripheral.properties().await {
            let address = props.address.to_string();

            if address_matches(&address, &identifier_lower) {
                debug!("Matched by address: {}", address);
                return Ok(Some(peripheral));
            }

            // macOS hides addresses behind a CoreBluetooth UUID
            let peripheral_id = format_peripheral_id(&peripheral.id()).to_lowercase();
            if peripheral_id == identifier_lower {
                debug!("Matched by peripheral ID: {}", peripheral_id);
                return Ok(Some(peripheral));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_options_builder() {
        let options = ScanOptions::new().duration_secs(10).all_devices();
        assert_eq!(options.duration, Duration::from_secs(10));
        assert!(!options.filter_bots_only);
    }

    #[test]
    fn test_scan_options_default() {
        let options = ScanOptions::default();
        assert_eq!(options.duration, Duration::from_secs(5));
        assert!(options.filter_bots_only);
    }

    #[test]
    fn test_attempt_durations_fill_scan_window() {
        let options = ScanOptions::new().duration_secs(12);
        assert_eq!(
            options.attempt_durations(),
            [
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(6)
            ]
        );

        let total: Duration = ScanOptions::new()
            .duration_secs(10)
            .attempt_durations()
            .iter()
            .sum();
        assert!(total <= Duration::from_secs(10));
    }

    #[test]
    fn test_attempt_durations_floor() {
        let options = ScanOptions::new().duration(Duration::from_millis(600));
        assert_eq!(options.attempt_durations()[0], MIN_SCAN_ATTEMPT);
    }

    #[test]
    fn test_advertises_bot_by_name() {
        assert!(advertises_bot(Some("WoHand"), std::iter::empty()));
        assert!(!advertises_bot(Some("WoCurtain"), std::iter::empty()));
        assert!(!advertises_bot(None, std::iter::empty()));
    }

    #[test]
    fn test_advertises_bot_by_service() {
        assert!(advertises_bot(None, [SWITCHBOT_SERVICE].iter()));
        assert!(!advertises_bot(None, [crate::uuid::NOTIFY].iter()));
    }
}
