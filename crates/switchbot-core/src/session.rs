//! High-level operations on a connected Bot.
//!
//! A [`Session`] is the protocol handle for one device: it owns the
//! transport (through a [`ResponseCorrelator`]), the optional password tag,
//! and the subscription state. It is created once per connection and
//! dropped on disconnect.

use std::time::Duration;

use tracing::debug;

use switchbot_types::{BotInfo, RawResponse, TimerSlot};

use crate::auth::AuthTag;
use crate::commands::{BotAction, Command};
use crate::correlator::{CorrelatorState, ResponseCorrelator};
use crate::error::Result;
use crate::traits::Transport;
use crate::util::normalize_address;

/// Protocol session bound to one connected Bot.
///
/// Only one command can be outstanding at a time. All command methods take
/// `&mut self`; wrap the session in a `tokio::sync::Mutex` to share it.
///
/// # Example
///
/// ```no_run
/// use switchbot_core::Session;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut session = Session::connect("AA:BB:CC:DD:EE:FF").await?;
///     session.set_password("hunter2");
///     session.press(true).await?;
///
///     let info = session.get_info().await?;
///     println!("{}", info);
///
///     session.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Session<T: Transport> {
    address: String,
    auth_tag: Option<AuthTag>,
    correlator: ResponseCorrelator<T>,
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("authenticated", &self.auth_tag.is_some())
            .field("state", &self.correlator.state())
            .finish()
    }
}

impl<T: Transport> Session<T> {
    /// Wrap a connected transport. Replies are awaited without a deadline.
    pub fn new(transport: T) -> Self {
        Self {
            address: normalize_address(transport.address()),
            auth_tag: None,
            correlator: ResponseCorrelator::new(transport),
        }
    }

    /// Fail waits that take longer than `limit` (`None` waits forever).
    ///
    /// A timed-out session is contaminated; see [`Session::drain_stale`].
    #[must_use]
    pub fn with_response_timeout(mut self, limit: Option<Duration>) -> Self {
        self.correlator = self.correlator.with_response_timeout(limit);
        self
    }

    /// Device address, lowercased.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        self.correlator.transport()
    }

    /// Correlator state.
    pub fn state(&self) -> CorrelatorState {
        self.correlator.state()
    }

    /// Whether notifications are attached.
    pub fn is_subscribed(&self) -> bool {
        self.correlator.state().is_subscribed()
    }

    /// Use the encrypted command variants with a tag derived from `password`.
    pub fn set_password(&mut self, password: &str) {
        self.auth_tag = Some(AuthTag::derive(password));
    }

    /// Go back to the plain command variants.
    pub fn clear_password(&mut self) {
        self.auth_tag = None;
    }

    /// Whether commands carry an auth tag.
    pub fn has_password(&self) -> bool {
        self.auth_tag.is_some()
    }

    /// Encode and send `command`, waiting for the reply if `wait`.
    pub async fn execute(&mut self, command: Command, wait: bool) -> Result<RawResponse> {
        debug!(%command, wait, authenticated = self.auth_tag.is_some(), "Executing command");
        let frame = command.encode(self.auth_tag.as_ref());
        self.correlator.execute(&frame, wait).await
    }

    /// Move the arm. With `wait` unset the Bot's verdict is not observed.
    pub async fn perform(&mut self, action: BotAction, wait: bool) -> Result<()> {
        self.execute(Command::Action(action), wait).await?;
        Ok(())
    }

    /// Press and release.
    pub async fn press(&mut self, wait: bool) -> Result<()> {
        self.perform(BotAction::Press, wait).await
    }

    /// Switch on (on/off mode).
    pub async fn turn_on(&mut self, wait: bool) -> Result<()> {
        self.perform(BotAction::On, wait).await
    }

    /// Switch off (on/off mode).
    pub async fn turn_off(&mut self, wait: bool) -> Result<()> {
        self.perform(BotAction::Off, wait).await
    }

    /// Retract the arm.
    pub async fn up(&mut self, wait: bool) -> Result<()> {
        self.perform(BotAction::Up, wait).await
    }

    /// Extend the arm.
    pub async fn down(&mut self, wait: bool) -> Result<()> {
        self.perform(BotAction::Down, wait).await
    }

    /// Read battery, firmware and settings.
    pub async fn get_info(&mut self) -> Result<BotInfo> {
        let response = self.execute(Command::GetInfo, true).await?;
        Ok(BotInfo::from_bytes(response.as_bytes())?)
    }

    /// Read one timer slot. `None` means the slot is empty.
    pub async fn get_timer(&mut self, slot: u8) -> Result<Option<TimerSlot>> {
        let response = self.execute(Command::GetTimer(slot), true).await?;
        Ok(TimerSlot::from_bytes(response.as_bytes())?)
    }

    /// Read slots `0..count`, one exchange at a time.
    ///
    /// The first failure aborts the batch.
    pub async fn get_timers(&mut self, count: u8) -> Result<Vec<Option<TimerSlot>>> {
        let mut timers = Vec::with_capacity(usize::from(count));
        for slot in 0..count {
            timers.push(self.get_timer(slot).await?);
        }
        Ok(timers)
    }

    /// Read as many slots as the Bot reports in its info.
    pub async fn get_all_timers(&mut self) -> Result<Vec<Option<TimerSlot>>> {
        let info = self.get_info().await?;
        self.get_timers(info.timer_count).await
    }

    /// Discard stale notifications left by an abandoned wait.
    ///
    /// Returns the number of payloads dropped.
    pub async fn drain_stale(&mut self) -> usize {
        self.correlator.drain_stale().await
    }

    /// Disconnect from the Bot.
    #[tracing::instrument(level = "info", skip(self), fields(address = %self.address))]
    pub async fn disconnect(&mut self) -> Result<()> {
        self.correlator.disconnect().await
    }
}
