//! Core BLE library for SwitchBot Bot actuators.
//!
//! This crate speaks the Bot's GATT protocol: it encodes commands, sends them
//! over the command characteristic, and pairs each write with the reply the
//! Bot pushes back on the notify characteristic.
//!
//! # Features
//!
//! - **Device discovery**: Scan for nearby Bots via BLE
//! - **Arm control**: Press, on, off, up and down, with or without waiting
//! - **Password support**: CRC32 auth tags for password-protected Bots
//! - **Device info**: Battery, firmware, mode and timer count
//! - **Timers**: Read scheduled press/on/off slots
//! - **Retry helpers**: Configurable backoff around whole operations
//! - **Mock transport**: Drive a [`Session`] without hardware
//!
//! # Layers
//!
//! | Layer | Role |
//! |-------|------|
//! | [`Command`] | Byte-exact frame encoding |
//! | [`ResponseCorrelator`] | One outstanding request, reply matching, timeouts |
//! | [`Session`] | Password handling and typed operations |
//! | [`Transport`] | The BLE link ([`BleTransport`] or [`MockTransport`]) |
//!
//! # Platform Differences
//!
//! On macOS, CoreBluetooth hides MAC addresses; devices are identified by a
//! per-host UUID instead. Linux and Windows use the Bluetooth address
//! (e.g., `AA:BB:CC:DD:EE:FF`). [`DiscoveredBot::identifier`] holds whichever
//! applies.
//!
//! # Quick Start
//!
//! ```no_run
//! use switchbot_core::{Session, scan};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Scan for Bots
//!     let bots = scan::scan_for_bots().await?;
//!     println!("Found {} bots", bots.len());
//!
//!     // Connect and press
//!     let mut session = Session::connect("AA:BB:CC:DD:EE:FF").await?;
//!     session.press(true).await?;
//!
//!     // Read device info
//!     let info = session.get_info().await?;
//!     println!("Battery: {}%", info.battery_percent);
//!
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod commands;
pub mod correlator;
pub mod device;
pub mod error;
pub mod mock;
pub mod retry;
pub mod scan;
pub mod session;
pub mod traits;
pub mod util;

// Re-export types and uuid modules from switchbot-types
pub use switchbot_types::types;
pub use switchbot_types::uuid;

// Core exports
pub use auth::{AUTH_TAG_LEN, AuthTag};
pub use commands::{BotAction, Command, timer_slot_address};
pub use correlator::{CorrelatorState, ResponseCorrelator};
pub use device::{BleTransport, ConnectionConfig};
pub use error::{DeviceNotFoundReason, Error, Result};
pub use mock::{MockTransport, Responder};
pub use retry::{RetryConfig, is_retryable, with_retry};
pub use scan::{DiscoveredBot, ScanOptions, find_device, get_adapter, scan_for_bots};
pub use session::Session;
pub use traits::{NotificationStream, Transport};
pub use util::{create_identifier, format_peripheral_id, normalize_address};

// Re-export from switchbot-types
pub use switchbot_types::uuid as uuids;
pub use switchbot_types::{
    BotInfo, ParseError, RawResponse, STATUS_OK, StateMode, TimerAction, TimerSlot, Weekday,
    Weekdays,
};
