//! BLE transport to a SwitchBot Bot.
//!
//! This module provides the btleplug-backed [`Transport`] and the
//! connection entry points for [`Session`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use bytes::Bytes;
use futures::StreamExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scan::{ScanOptions, find_device};
use crate::session::Session;
use crate::traits::{NotificationStream, Transport};
use crate::util::{create_identifier, format_peripheral_id};
use crate::uuid::{COMMAND, NOTIFY};

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for the Bot's reply to a command.
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for BLE connection timeouts.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use switchbot_core::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .response_timeout(Some(Duration::from_secs(3)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Overall deadline for finding, connecting to and discovering the Bot.
    pub connection_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Timeout for a single command write.
    pub write_timeout: Duration,
    /// Deadline for each reply; `None` waits forever.
    pub response_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config for fast, reliable environments.
    ///
    /// Uses shorter timeouts for quicker failure detection
    /// when the Bot is nearby with a strong signal.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(8),
            discovery_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            response_timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the reply deadline.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Scan settings for finding the Bot within `connection_timeout`.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::default()
            .duration(self.connection_timeout)
            .all_devices()
    }

    /// Reject zero timeouts, which would fail every operation.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("connection_timeout", Some(self.connection_timeout)),
            ("discovery_timeout", Some(self.discovery_timeout)),
            ("write_timeout", Some(self.write_timeout)),
            ("response_timeout", self.response_timeout),
        ];
        for (name, value) in fields {
            if value == Some(Duration::ZERO) {
                return Err(Error::invalid_config(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}

/// A btleplug connection to one Bot.
///
/// # Cleanup
///
/// Call [`Transport::disconnect`] (or [`Session::disconnect`]) before
/// dropping. A transport dropped while connected logs a warning and
/// disconnects in the background.
pub struct BleTransport {
    /// Kept alive for the lifetime of the peripheral connection.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    name: Option<String>,
    address: String,
    command: Characteristic,
    service_count: usize,
    disconnected: AtomicBool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl BleTransport {
    /// Find and connect to a Bot by address with full configuration.
    ///
    /// `connection_timeout` bounds the whole sequence: scanning, connecting
    /// and service discovery.
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect_with_config(identifier: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let deadline = config.connection_timeout;
        let options = config.scan_options();
        timeout(deadline, async {
            let (adapter, peripheral) = find_device(identifier, &options).await?;
            Self::from_peripheral_with_config(adapter, peripheral, config).await
        })
        .await
        .map_err(|_| Error::timeout("connect to device", deadline))?
    }

    /// Connect to an already-discovered peripheral.
    #[tracing::instrument(level = "info", skip_all, fields(connect_timeout = ?config.connection_timeout))]
    pub async fn from_peripheral_with_config(
        adapter: Adapter,
        peripheral: Peripheral,
        config: ConnectionConfig,
    ) -> Result<Self> {
        info!("Connecting to device...");
        timeout(config.connection_timeout, peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", config.connection_timeout))??;
        info!("Connected!");

        info!("Discovering services...");
        timeout(config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", config.discovery_timeout))??;

        let service_count = peripheral.services().len();
        debug!("Found {} services", service_count);

        let command = find_characteristic(&peripheral, COMMAND, service_count)?;

        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));

        Ok(Self {
            adapter,
            peripheral,
            name,
            address,
            command,
            service_count,
            disconnected: AtomicBool::new(false),
            config,
        })
    }

}

fn find_characteristic(
    peripheral: &Peripheral,
    uuid: Uuid,
    service_count: usize,
) -> Result<Characteristic> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), service_count))
}

#[async_trait]
impl Transport for BleTransport {
    async fn write(&self, data: &[u8]) -> Result<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        timeout(
            self.config.write_timeout,
            self.peripheral
                .write(&self.command, data, WriteType::WithoutResponse),
        )
        .await
        .map_err(|_| Error::timeout("write command", self.config.write_timeout))??;
        Ok(())
    }

    async fn subscribe(&self) -> Result<NotificationStream> {
        let notify = find_characteristic(&self.peripheral, NOTIFY, self.service_count)?;

        timeout(self.config.write_timeout, self.peripheral.subscribe(&notify))
            .await
            .map_err(|_| Error::timeout("subscribe to notifications", self.config.write_timeout))??;

        let stream = self.peripheral.notifications().await?;
        let payloads = stream.filter_map(|notification| async move {
            (notification.uuid == NOTIFY).then(|| Bytes::from(notification.value))
        });
        Ok(Box::pin(payloads))
    }

    #[tracing::instrument(level = "info", skip(self), fields(address = %self.address))]
    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.disconnected.store(true, Ordering::SeqCst);
        self.peripheral.disconnect().await?;
        Ok(())
    }

    fn address(&self) -> &str {
        &self.address
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }

        warn!(
            device_address = %self.address,
            "Transport dropped without calling disconnect() - performing best-effort cleanup"
        );

        let peripheral = self.peripheral.clone();
        let address = self.address.clone();

        // The runtime may already be shutting down
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = peripheral.disconnect().await {
                    debug!(device_address = %address, error = %e, "Best-effort disconnect failed");
                } else {
                    debug!(device_address = %address, "Best-effort disconnect completed");
                }
            });
        }
    }
}

impl Session<BleTransport> {
    /// Connect to a Bot by address using default timeouts.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use switchbot_core::Session;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut session = Session::connect("aa:bb:cc:dd:ee:ff").await?;
    ///     println!("{}", session.get_info().await?);
    ///     session.disconnect().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(identifier: &str) -> Result<Self> {
        Self::connect_with_config(identifier, ConnectionConfig::default()).await
    }

    /// Connect to a Bot with full configuration.
    pub async fn connect_with_config(identifier: &str, config: ConnectionConfig) -> Result<Self> {
        let response_timeout = config.response_timeout;
        let transport = BleTransport::connect_with_config(identifier, config).await?;
        Ok(Session::new(transport).with_response_timeout(response_timeout))
    }
}
