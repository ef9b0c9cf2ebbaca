//! Mock transport implementation for testing.
//!
//! This module provides a [`MockTransport`] that stands in for a BLE link so
//! sessions can be exercised without hardware.
//!
//! # Features
//!
//! - **Scripted replies**: queue notifications to be sent after the next writes
//! - **Responders**: answer each written frame with a closure, like a real Bot
//! - **Failure injection**: fail writes or subscriptions, permanently or N times
//! - **Latency simulation**: delay writes to exercise timeouts
//! - **Write log**: inspect every frame that was written
//!
//! Clones share state, so a test can keep a handle while a session owns
//! another.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::traits::{NotificationStream, Transport};
use crate::uuid::{COMMAND, NOTIFY};

/// Closure that produces the Bot's reply to a written frame.
pub type Responder = Arc<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

/// A mock BLE link for testing.
///
/// # Example
///
/// ```
/// use switchbot_core::{MockTransport, Session};
///
/// #[tokio::main]
/// async fn main() {
///     let transport = MockTransport::new();
///     transport.queue_reply(vec![1, 79, 45, 0, 0, 0, 0, 0, 3, 0, 3, 0, 0]).await;
///
///     let mut session = Session::new(transport.clone());
///     let info = session.get_info().await.unwrap();
///     assert_eq!(info.battery_percent, 79);
///     assert_eq!(transport.writes().await, vec![vec![0x57, 0x02]]);
/// }
/// ```
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

struct Inner {
    address: String,
    connected: AtomicBool,
    writes: Mutex<Vec<Vec<u8>>>,
    replies: Mutex<VecDeque<Vec<u8>>>,
    responder: Mutex<Option<Responder>>,
    notifier: Mutex<Option<UnboundedSender<Bytes>>>,
    subscribe_count: AtomicU32,
    fail_writes: AtomicBool,
    fail_subscribe: AtomicBool,
    /// Number of writes to fail before succeeding.
    remaining_write_failures: AtomicU32,
    /// Simulated write latency in milliseconds (0 = no delay).
    write_latency_ms: AtomicU64,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("address", &self.inner.address)
            .field("connected", &self.inner.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a connected mock with a random address.
    pub fn new() -> Self {
        let address = format!("mock-{:06x}", rand::random::<u32>() % 0xFFFFFF);
        Self::with_address(&address)
    }

    /// Create a connected mock with a fixed address.
    pub fn with_address(address: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                address: address.to_string(),
                connected: AtomicBool::new(true),
                writes: Mutex::new(Vec::new()),
                replies: Mutex::new(VecDeque::new()),
                responder: Mutex::new(None),
                notifier: Mutex::new(None),
                subscribe_count: AtomicU32::new(0),
                fail_writes: AtomicBool::new(false),
                fail_subscribe: AtomicBool::new(false),
                remaining_write_failures: AtomicU32::new(0),
                write_latency_ms: AtomicU64::new(0),
            }),
        }
    }

    // --- Test control methods ---

    /// Queue a reply, sent as a notification after the next write made
    /// while subscribed. Queued replies take precedence over the responder.
    pub async fn queue_reply(&self, payload: impl Into<Vec<u8>>) {
        self.inner.replies.lock().await.push_back(payload.into());
    }

    /// Answer every write made while subscribed with `responder`.
    pub async fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        *self.inner.responder.lock().await = Some(Arc::new(responder));
    }

    /// Push a notification right now, unrelated to any write.
    pub async fn notify(&self, payload: impl Into<Vec<u8>>) {
        if let Some(tx) = self.inner.notifier.lock().await.as_ref() {
            let _ = tx.unbounded_send(Bytes::from(payload.into()));
        }
    }

    /// End the notification stream, as if the link dropped.
    pub async fn close_notifications(&self) {
        self.inner.notifier.lock().await.take();
    }

    /// Make every write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Make the next `count` writes fail, then succeed.
    pub fn fail_next_writes(&self, count: u32) {
        self.inner
            .remaining_write_failures
            .store(count, Ordering::Relaxed);
    }

    /// Make subscribe calls fail.
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.inner.fail_subscribe.store(fail, Ordering::Relaxed);
    }

    /// Delay each write by `latency`.
    pub fn set_write_latency(&self, latency: Duration) {
        self.inner
            .write_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Every frame written so far, in order.
    pub async fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.writes.lock().await.clone()
    }

    /// Number of subscribe calls made.
    pub fn subscribe_count(&self) -> u32 {
        self.inner.subscribe_count.load(Ordering::Relaxed)
    }

    /// Whether `disconnect` has not been called.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Relaxed)
    }

    fn check_connected(&self) -> Result<()> {
        if self.inner.connected.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    async fn reply_for(&self, frame: &[u8]) -> Option<Vec<u8>> {
        if let Some(reply) = self.inner.replies.lock().await.pop_front() {
            return Some(reply);
        }
        let responder = self.inner.responder.lock().await.clone();
        responder.and_then(|respond| respond(frame))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&self, data: &[u8]) -> Result<()> {
        self.check_connected()?;

        let latency = self.inner.write_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.inner.remaining_write_failures.load(Ordering::Relaxed) > 0 {
            self.inner
                .remaining_write_failures
                .fetch_sub(1, Ordering::Relaxed);
            return Err(Error::write_failed(COMMAND.to_string(), "mock write failure"));
        }
        if self.inner.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::write_failed(COMMAND.to_string(), "mock write failure"));
        }

        self.inner.writes.lock().await.push(data.to_vec());

        // The Bot only notifies subscribers
        let notifier = self.inner.notifier.lock().await.clone();
        if let Some(tx) = notifier
            && let Some(reply) = self.reply_for(data).await
        {
            let _ = tx.unbounded_send(Bytes::from(reply));
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<NotificationStream> {
        self.check_connected()?;
        self.inner.subscribe_count.fetch_add(1, Ordering::Relaxed);

        if self.inner.fail_subscribe.load(Ordering::Relaxed) {
            return Err(Error::subscription_failed(
                NOTIFY.to_string(),
                "mock subscribe failure",
            ));
        }

        let (tx, rx) = unbounded();
        *self.inner.notifier.lock().await = Some(tx);
        Ok(Box::pin(rx))
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.connected.store(false, Ordering::Relaxed);
        self.inner.notifier.lock().await.take();
        Ok(())
    }

    fn address(&self) -> &str {
        &self.inner.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_write_is_logged() {
        let transport = MockTransport::with_address("aa:bb:cc:dd:ee:ff");
        transport.write(&[0x57, 0x01]).await.unwrap();

        assert_eq!(transport.address(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(transport.writes().await, vec![vec![0x57, 0x01]]);
    }

    #[tokio::test]
    async fn test_reply_needs_subscription() {
        let transport = MockTransport::new();
        transport.queue_reply(vec![1]).await;

        // Not subscribed: the queued reply stays queued
        transport.write(&[0x57, 0x01]).await.unwrap();

        let mut stream = transport.subscribe().await.unwrap();
        transport.write(&[0x57, 0x01]).await.unwrap();
        assert_eq!(&stream.next().await.unwrap()[..], &[1]);
    }

    #[tokio::test]
    async fn test_responder() {
        let transport = MockTransport::new();
        transport
            .set_responder(|frame| Some(vec![1, frame.len() as u8]))
            .await;

        let mut stream = transport.subscribe().await.unwrap();
        transport.write(&[0x57, 0x02]).await.unwrap();
        assert_eq!(&stream.next().await.unwrap()[..], &[1, 2]);
    }

    #[tokio::test]
    async fn test_transient_write_failures() {
        let transport = MockTransport::new();
        transport.fail_next_writes(2);

        assert!(transport.write(&[0x57]).await.is_err());
        assert!(transport.write(&[0x57]).await.is_err());
        assert!(transport.write(&[0x57]).await.is_ok());
        assert_eq!(transport.writes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_ends_stream() {
        let transport = MockTransport::new();
        let mut stream = transport.subscribe().await.unwrap();

        transport.disconnect().await.unwrap();

        assert!(stream.next().await.is_none());
        assert!(matches!(
            transport.write(&[0x57]).await,
            Err(Error::NotConnected)
        ));
    }
}
