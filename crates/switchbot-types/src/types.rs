//! Core types for SwitchBot Bot responses.

use core::fmt;

use bytes::Bytes;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ParseError, ParseResult};

/// Status byte the Bot puts at offset 0 of a successful response.
pub const STATUS_OK: u8 = 0x01;

/// Minimum number of bytes required to decode a [`BotInfo`].
pub const MIN_INFO_RESPONSE_BYTES: usize = 11;

/// Minimum number of bytes required to decode a [`TimerSlot`].
pub const MIN_TIMER_RESPONSE_BYTES: usize = 8;

/// A notification payload delivered by the Bot after a command.
///
/// Offset 0 is the status flag: [`STATUS_OK`] means success, anything else
/// (including an empty payload) means the Bot rejected the command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawResponse(Bytes);

impl RawResponse {
    /// Wrap a payload received from the notify characteristic.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Synthetic response returned when the caller did not wait for the Bot.
    pub fn accepted() -> Self {
        Self(Bytes::from_static(&[STATUS_OK]))
    }

    /// The status byte, or `None` for an empty payload.
    #[must_use]
    pub fn status(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Whether the status byte signals success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status() == Some(STATUS_OK)
    }

    /// The full payload, status byte included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the response and return the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for RawResponse {
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl From<Vec<u8>> for RawResponse {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<&[u8]> for RawResponse {
    fn from(data: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(data))
    }
}

impl AsRef<[u8]> for RawResponse {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for RawResponse {
    /// Formats the payload as space-separated hex (`01 4f 2d`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// How the Bot's arm behaves when triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StateMode {
    /// Arm presses and returns (momentary).
    Press,
    /// Arm latches on/off (switch mode).
    OnOff,
}

impl fmt::Display for StateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateMode::Press => write!(f, "press"),
            StateMode::OnOff => write!(f, "on/off"),
        }
    }
}

/// Settings and status reported by a Bot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BotInfo {
    /// Battery level percentage (0-100).
    pub battery_percent: u8,
    /// Firmware version with one fractional digit (e.g. 4.5).
    pub firmware_version: f32,
    /// Number of timer slots configured on the Bot.
    pub timer_count: u8,
    /// Press or on/off mode.
    pub state_mode: StateMode,
    /// Whether the arm direction is inverted.
    pub inverse: bool,
    /// How long the arm holds in the pressed position, in seconds.
    pub hold_seconds: u8,
}

impl BotInfo {
    /// Decode a `BotInfo` from a get-info response.
    ///
    /// The byte format is:
    /// - byte 0: status flag
    /// - byte 1: battery percent
    /// - byte 2: firmware version × 10
    /// - byte 8: timer count
    /// - byte 9: flags (bit 4 = on/off mode, bit 0 = inverse)
    /// - byte 10: hold seconds
    ///
    /// The Bot sends 13 bytes; trailing bytes beyond offset 10 are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] if `data` contains fewer than
    /// [`MIN_INFO_RESPONSE_BYTES`] (11) bytes.
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        if data.len() < MIN_INFO_RESPONSE_BYTES {
            return Err(ParseError::InsufficientBytes {
                expected: MIN_INFO_RESPONSE_BYTES,
                actual: data.len(),
            });
        }

        let flags = data[9];
        let state_mode = if flags & 0x10 != 0 {
            StateMode::OnOff
        } else {
            StateMode::Press
        };

        Ok(BotInfo {
            battery_percent: data[1],
            firmware_version: f32::from(data[2]) / 10.0,
            timer_count: data[8],
            state_mode,
            inverse: flags & 0x01 != 0,
            hold_seconds: data[10],
        })
    }
}

impl fmt::Display for BotInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Battery: {}, Firmware: {:.1}, TimerCount: {}, StateMode: {}, Inverse: {}, HoldSec: {}",
            self.battery_percent,
            self.firmware_version,
            self.timer_count,
            self.state_mode,
            self.inverse,
            self.hold_seconds
        )
    }
}

/// Action a timer slot performs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimerAction {
    /// Momentary press.
    Press,
    /// Switch on.
    On,
    /// Switch off.
    Off,
    /// A nibble value this crate does not know about.
    Other(u8),
}

impl From<u8> for TimerAction {
    /// Convert the low nibble of the action byte.
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => TimerAction::Press,
            1 => TimerAction::On,
            2 => TimerAction::Off,
            other => TimerAction::Other(other),
        }
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerAction::Press => write!(f, "press"),
            TimerAction::On => write!(f, "on"),
            TimerAction::Off => write!(f, "off"),
            TimerAction::Other(n) => write!(f, "action({})", n),
        }
    }
}

/// Day of the week, ordered Sunday first as the Bot's app shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// All weekdays, Sunday first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Bit position of this day in the Bot's repeat mask.
    ///
    /// Monday is bit 0 through Saturday at bit 5; Sunday is bit 6.
    #[must_use]
    pub const fn mask_bit(self) -> u8 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
            Weekday::Sunday => 6,
        }
    }

    /// Three-letter English abbreviation.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sun",
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// The set of weekdays a timer repeats on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Weekdays(u8);

impl Weekdays {
    const MASK: u8 = 0x7F;

    /// An empty set (one-shot timer).
    pub const fn none() -> Self {
        Self(0)
    }

    /// Build the set from a repeat mask byte. Bit 7 is not a day and is dropped.
    pub const fn from_mask(mask: u8) -> Self {
        Self(mask & Self::MASK)
    }

    /// The repeat mask in the Bot's bit layout.
    #[must_use]
    pub const fn mask(self) -> u8 {
        self.0
    }

    /// Whether `day` is in the set.
    #[must_use]
    pub const fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.mask_bit()) != 0
    }

    /// Add `day` to the set.
    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.mask_bit();
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the days in the set, Sunday first.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        Weekday::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    /// The set as seven flags, Sunday through Saturday.
    #[must_use]
    pub fn to_array(self) -> [bool; 7] {
        Weekday::ALL.map(|d| self.contains(d))
    }
}

impl FromIterator<Weekday> for Weekdays {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut days = Weekdays::none();
        for day in iter {
            days.insert(day);
        }
        days
    }
}

impl fmt::Display for Weekdays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("once");
        }
        for (i, day) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(day.short_name())?;
        }
        Ok(())
    }
}

// Serialized as a list of day names rather than the raw mask.
#[cfg(feature = "serde")]
impl Serialize for Weekdays {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Weekdays {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let days = Vec::<Weekday>::deserialize(deserializer)?;
        Ok(days.into_iter().collect())
    }
}

/// A configured timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimerSlot {
    /// Whether the timer is armed.
    pub enabled: bool,
    /// Days the timer repeats on; empty for a one-shot timer.
    pub weekdays: Weekdays,
    /// Hour of day (0-23).
    pub hour: u8,
    /// Minute of hour (0-59).
    pub minutes: u8,
    /// What the Bot does when the timer fires.
    pub action: TimerAction,
}

impl TimerSlot {
    /// Decode a timer slot from a get-timer response.
    ///
    /// The byte format is:
    /// - byte 0: status flag
    /// - byte 3: repeat mask when enabled, `0` when disabled
    /// - byte 4: hour
    /// - byte 5: minutes
    /// - byte 6: high nibble of the repeat mask when disabled
    /// - byte 7: low nibble = action, high nibble = low nibble of the
    ///   repeat mask when disabled
    ///
    /// Returns `Ok(None)` for an empty slot (disabled and 00:00).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] if `data` contains fewer than
    /// [`MIN_TIMER_RESPONSE_BYTES`] (8) bytes.
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn from_bytes(data: &[u8]) -> ParseResult<Option<Self>> {
        if data.len() < MIN_TIMER_RESPONSE_BYTES {
            return Err(ParseError::InsufficientBytes {
                expected: MIN_TIMER_RESPONSE_BYTES,
                actual: data.len(),
            });
        }

        let enabled = data[3] != 0;
        let hour = data[4];
        let minutes = data[5];
        let action = TimerAction::from(data[7]);

        // Empty slot; must be detected before the mask is decoded
        if !enabled && hour == 0 && minutes == 0 {
            return Ok(None);
        }

        let mask = if enabled {
            data[3]
        } else {
            // Disabled slots split the mask across the high nibbles of 6 and 7
            (data[6] & 0xF0) | ((data[7] & 0xF0) >> 4)
        };

        Ok(Some(TimerSlot {
            enabled,
            weekdays: Weekdays::from_mask(mask),
            hour,
            minutes,
            action,
        }))
    }

    /// Whether this is a one-shot timer (no repeat days).
    #[must_use]
    pub fn is_once(&self) -> bool {
        self.weekdays.is_empty()
    }
}

impl fmt::Display for TimerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02} {} {}",
            self.hour, self.minutes, self.action, self.weekdays
        )?;
        if !self.enabled {
            f.write_str(" (disabled)")?;
        }
        Ok(())
    }
}
