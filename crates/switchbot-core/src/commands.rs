//! BLE command encoding for SwitchBot Bots.
//!
//! Every command starts with [`COMMAND_PREFIX`] followed by an opcode. When
//! the session carries an [`AuthTag`], the opcode gains the
//! [`ENCRYPTED_FLAG`] bit and the tag follows it:
//!
//! | Command | Plain | Encrypted |
//! |---------|-------|-----------|
//! | Press | `57 01` | `57 11 <tag>` |
//! | On | `57 01 01` | `57 11 <tag> 01` |
//! | Off | `57 01 02` | `57 11 <tag> 02` |
//! | Up | `57 01 04` | `57 11 <tag> 04` |
//! | Down | `57 01 03` | `57 11 <tag> 03` |
//! | Get info | `57 02` | `57 12 <tag>` |
//! | Get timer *i* | `57 08 <i*16+3>` | `57 18 <tag> <i*16+3>` |

use std::fmt;

use crate::auth::{AUTH_TAG_LEN, AuthTag};

/// First byte of every command.
pub const COMMAND_PREFIX: u8 = 0x57;

/// Opcode for arm actions (press, on, off, up, down).
pub const OP_ACTION: u8 = 0x01;

/// Opcode for the device-info query.
pub const OP_GET_INFO: u8 = 0x02;

/// Opcode for the timer-slot query.
pub const OP_GET_TIMER: u8 = 0x08;

/// Bit OR-ed into the opcode when an auth tag follows.
pub const ENCRYPTED_FLAG: u8 = 0x10;

/// Physical action performed by the Bot's arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotAction {
    /// Press and release.
    Press,
    /// Switch on.
    On,
    /// Switch off.
    Off,
    /// Retract the arm.
    Up,
    /// Extend the arm.
    Down,
}

impl BotAction {
    /// All actions, in the order the CLI lists them.
    pub const ALL: [BotAction; 5] = [
        BotAction::Press,
        BotAction::On,
        BotAction::Off,
        BotAction::Up,
        BotAction::Down,
    ];

    /// Trailing argument byte, `None` for a plain press.
    const fn argument(self) -> Option<u8> {
        match self {
            BotAction::Press => None,
            BotAction::On => Some(0x01),
            BotAction::Off => Some(0x02),
            BotAction::Down => Some(0x03),
            BotAction::Up => Some(0x04),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BotAction::Press => "press",
            BotAction::On => "on",
            BotAction::Off => "off",
            BotAction::Up => "up",
            BotAction::Down => "down",
        }
    }
}

impl fmt::Display for BotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command that can be sent to a Bot.
///
/// Commands are built fresh per call and encoding never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Move the arm.
    Action(BotAction),
    /// Query battery, firmware and settings.
    GetInfo,
    /// Query one timer slot (0-based).
    GetTimer(u8),
}

impl Command {
    /// The unauthenticated opcode.
    #[must_use]
    pub const fn base_opcode(&self) -> u8 {
        match self {
            Command::Action(_) => OP_ACTION,
            Command::GetInfo => OP_GET_INFO,
            Command::GetTimer(_) => OP_GET_TIMER,
        }
    }

    /// Trailing payload byte, if the command has one.
    #[must_use]
    pub const fn argument(&self) -> Option<u8> {
        match self {
            Command::Action(action) => action.argument(),
            Command::GetInfo => None,
            Command::GetTimer(slot) => Some(timer_slot_address(*slot)),
        }
    }

    /// Encode the command, using the encrypted variant when `auth` is set.
    ///
    /// # Example
    ///
    /// ```
    /// use switchbot_core::{AuthTag, BotAction, Command};
    ///
    /// let on = Command::Action(BotAction::On);
    /// assert_eq!(on.encode(None), vec![0x57, 0x01, 0x01]);
    ///
    /// let tag = AuthTag::derive("password");
    /// assert_eq!(
    ///     on.encode(Some(&tag)),
    ///     vec![0x57, 0x11, 0x35, 0xc2, 0x46, 0xd5, 0x01]
    /// );
    /// ```
    #[must_use]
    pub fn encode(&self, auth: Option<&AuthTag>) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3 + AUTH_TAG_LEN);
        bytes.push(COMMAND_PREFIX);

        match auth {
            Some(tag) => {
                bytes.push(self.base_opcode() | ENCRYPTED_FLAG);
                bytes.extend_from_slice(tag.as_bytes());
            }
            None => bytes.push(self.base_opcode()),
        }

        if let Some(arg) = self.argument() {
            bytes.push(arg);
        }
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Action(action) => write!(f, "{}", action),
            Command::GetInfo => write!(f, "get-info"),
            Command::GetTimer(slot) => write!(f, "get-timer[{}]", slot),
        }
    }
}

impl From<BotAction> for Command {
    fn from(action: BotAction) -> Self {
        Command::Action(action)
    }
}

/// Memory-page address of timer slot `slot`: `slot * 16 + 3`.
///
/// Wraps for slots past 15; a Bot has far fewer.
#[must_use]
pub const fn timer_slot_address(slot: u8) -> u8 {
    slot.wrapping_mul(16).wrapping_add(3)
}
