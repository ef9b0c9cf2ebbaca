//! Trait abstractions for the BLE link to a Bot.
//!
//! This module provides the [`Transport`] trait that abstracts over the real
//! btleplug connection and the mock transport used in tests.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::Result;

/// Notification payloads from the Bot, in arrival order.
///
/// The stream ends when the connection goes away.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// A connected link to a single Bot.
///
/// # Example
///
/// ```no_run
/// use switchbot_core::{Session, Transport};
///
/// async fn press<T: Transport>(transport: T) -> switchbot_core::Result<()> {
///     let mut session = Session::new(transport);
///     session.press(true).await?;
///     session.disconnect().await
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write to the command characteristic without response.
    async fn write(&self, data: &[u8]) -> Result<()>;

    /// Attach to the notify characteristic.
    ///
    /// Each call returns a new stream; callers subscribe once per session.
    async fn subscribe(&self) -> Result<NotificationStream>;

    /// Tear down the link.
    async fn disconnect(&self) -> Result<()>;

    /// Device address or platform identifier.
    fn address(&self) -> &str;
}
