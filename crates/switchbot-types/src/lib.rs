//! Platform-agnostic types for SwitchBot Bot devices.
//!
//! This crate provides the response types and pure decoders shared by the
//! BLE layer (switchbot-core) and any other frontend.
//!
//! # Features
//!
//! - Device-info and timer-slot response decoders
//! - Weekday repeat-mask handling
//! - UUID constants for BLE characteristics
//! - Error types for payload decoding
//!
//! # Example
//!
//! ```
//! use switchbot_types::{BotInfo, StateMode};
//!
//! let raw = [1, 79, 45, 100, 0, 0, 0, 152, 3, 0, 3, 72, 0];
//! let info = BotInfo::from_bytes(&raw).unwrap();
//! assert_eq!(info.battery_percent, 79);
//! assert_eq!(info.state_mode, StateMode::Press);
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{
    BotInfo, MIN_INFO_RESPONSE_BYTES, MIN_TIMER_RESPONSE_BYTES, RawResponse, STATUS_OK, StateMode,
    TimerAction, TimerSlot, Weekday, Weekdays,
};
pub use uuid as uuids;
