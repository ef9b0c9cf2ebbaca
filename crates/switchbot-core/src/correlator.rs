//! Request/response pairing over the Bot's notification stream.
//!
//! The wire protocol carries no request IDs: the Bot answers each command
//! with one notification, so replies are matched purely by arrival order.
//! [`ResponseCorrelator`] enforces a single outstanding request. `execute`
//! takes `&mut self`, so overlapping requests on one correlator do not
//! compile; callers sharing a session across tasks must wrap it in a mutex.
//!
//! Notifications are moved from the transport stream into a single-slot
//! channel by a forwarding task. The task's push waits until the previous
//! payload has been consumed.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use switchbot_types::RawResponse;

use crate::error::{Error, Result};
use crate::traits::{NotificationStream, Transport};
use crate::uuid::{COMMAND, NOTIFY};

/// Where the correlator is in its request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrelatorState {
    /// Not attached to the notify characteristic yet.
    Idle,
    /// A subscribe call is in flight.
    AwaitingSubscription,
    /// Attached and ready for the next command.
    Subscribed,
    /// A command was written and its reply has not arrived.
    AwaitingResponse,
    /// A wait was abandoned; a late reply may still be queued.
    Contaminated,
}

impl CorrelatorState {
    /// Whether the notification stream is attached.
    pub fn is_subscribed(self) -> bool {
        matches!(
            self,
            CorrelatorState::Subscribed
                | CorrelatorState::AwaitingResponse
                | CorrelatorState::Contaminated
        )
    }
}

/// Pairs each written command with the next notification from the Bot.
pub struct ResponseCorrelator<T: Transport> {
    transport: T,
    state: CorrelatorState,
    responses: Option<mpsc::Receiver<Bytes>>,
    forwarder: Option<JoinHandle<()>>,
    response_timeout: Option<Duration>,
}

impl<T: Transport> std::fmt::Debug for ResponseCorrelator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCorrelator")
            .field("address", &self.transport.address())
            .field("state", &self.state)
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ResponseCorrelator<T> {
    /// Create a correlator that waits for replies indefinitely.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: CorrelatorState::Idle,
            responses: None,
            forwarder: None,
            response_timeout: None,
        }
    }

    /// Set the deadline for each reply. `None` waits forever.
    #[must_use]
    pub fn with_response_timeout(mut self, limit: Option<Duration>) -> Self {
        self.response_timeout = limit;
        self
    }

    /// Current state.
    pub fn state(&self) -> CorrelatorState {
        self.state
    }

    /// The reply deadline, if any.
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Attach to the notify characteristic if not already attached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubscriptionFailed`] if the transport cannot subscribe.
    pub async fn ensure_subscribed(&mut self) -> Result<()> {
        if self.state != CorrelatorState::Idle {
            return Ok(());
        }

        self.state = CorrelatorState::AwaitingSubscription;
        let stream = match self.transport.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                self.state = CorrelatorState::Idle;
                return Err(subscription_error(e));
            }
        };

        let (tx, rx) = mpsc::channel(1);
        self.forwarder = Some(tokio::spawn(forward_notifications(stream, tx)));
        self.responses = Some(rx);
        self.state = CorrelatorState::Subscribed;
        debug!(address = %self.transport.address(), "Subscribed to notifications");
        Ok(())
    }

    /// Write `frame` and, if `expect_response`, wait for the Bot's reply.
    ///
    /// Without `expect_response` the call returns a synthetic accepted
    /// response as soon as the write completes and never touches queued
    /// notifications.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionContaminated`] if an earlier wait was abandoned
    /// - [`Error::SubscriptionFailed`] if attaching to notifications fails
    /// - [`Error::WriteFailed`] if the transport write fails
    /// - [`Error::CommandRejected`] if the reply's status byte is not `1`
    /// - [`Error::Timeout`] if the response deadline expires
    /// - [`Error::NotificationStreamClosed`] if the stream ends first
    pub async fn execute(&mut self, frame: &[u8], expect_response: bool) -> Result<RawResponse> {
        match self.state {
            CorrelatorState::Contaminated => return Err(Error::SessionContaminated),
            // A previous execute was dropped mid-exchange; its reply is unaccounted for
            CorrelatorState::AwaitingResponse => {
                warn!("Previous request was cancelled while awaiting its response");
                self.state = CorrelatorState::Contaminated;
                return Err(Error::SessionContaminated);
            }
            _ => {}
        }

        if expect_response {
            self.ensure_subscribed().await?;
            // The reply can land before the write call returns
            self.state = CorrelatorState::AwaitingResponse;
        }

        trace!(len = frame.len(), expect_response, "Writing command");
        if let Err(e) = self.transport.write(frame).await {
            if expect_response {
                self.state = CorrelatorState::Subscribed;
            }
            return Err(write_error(e));
        }

        if !expect_response {
            return Ok(RawResponse::accepted());
        }

        let response = self.wait_for_response().await?;
        self.state = CorrelatorState::Subscribed;

        debug!(status = ?response.status(), len = response.len(), "Received response");
        if response.is_success() {
            Ok(response)
        } else {
            Err(Error::command_rejected(response))
        }
    }

    async fn wait_for_response(&mut self) -> Result<RawResponse> {
        let Some(rx) = self.responses.as_mut() else {
            self.state = CorrelatorState::Idle;
            return Err(Error::NotificationStreamClosed);
        };

        let received = match self.response_timeout {
            Some(limit) => match timeout(limit, rx.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(timeout = ?limit, "No response from device, session contaminated");
                    self.state = CorrelatorState::Contaminated;
                    return Err(Error::timeout("wait for response", limit));
                }
            },
            None => rx.recv().await,
        };

        match received {
            Some(payload) => Ok(RawResponse::from(payload)),
            None => {
                self.responses = None;
                self.state = CorrelatorState::Idle;
                Err(Error::NotificationStreamClosed)
            }
        }
    }

    /// Discard every queued notification and clear contamination.
    ///
    /// Returns the number of payloads dropped.
    pub async fn drain_stale(&mut self) -> usize {
        let mut drained = 0;
        let mut closed = false;

        if let Some(rx) = self.responses.as_mut() {
            let mut yielded = false;
            loop {
                match rx.try_recv() {
                    Ok(_) => {
                        drained += 1;
                        yielded = false;
                    }
                    // Let a push blocked on the full slot land before giving up
                    Err(TryRecvError::Empty) if !yielded => {
                        tokio::task::yield_now().await;
                        yielded = true;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        closed = true;
                        break;
                    }
                }
            }
        }

        if closed {
            self.responses = None;
        }
        self.state = if self.responses.is_some() {
            CorrelatorState::Subscribed
        } else {
            CorrelatorState::Idle
        };

        if drained > 0 {
            debug!(drained, "Discarded stale notifications");
        }
        drained
    }

    /// Stop forwarding notifications and disconnect the transport.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.detach();
        self.transport.disconnect().await
    }

    fn detach(&mut self) {
        if let Some(handle) = self.forwarder.take() {
            handle.abort();
        }
        self.responses = None;
        self.state = CorrelatorState::Idle;
    }
}

impl<T: Transport> Drop for ResponseCorrelator<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.forwarder.take() {
            handle.abort();
        }
    }
}

async fn forward_notifications(mut stream: NotificationStream, tx: mpsc::Sender<Bytes>) {
    while let Some(payload) = stream.next().await {
        trace!(len = payload.len(), "Notification received");
        if tx.send(payload).await.is_err() {
            return;
        }
    }
    debug!("Notification stream ended");
}

fn subscription_error(err: Error) -> Error {
    match err {
        Error::SubscriptionFailed { .. } => err,
        other => Error::subscription_failed(NOTIFY.to_string(), other.to_string()),
    }
}

fn write_error(err: Error) -> Error {
    match err {
        Error::WriteFailed { .. } => err,
        other => Error::write_failed(COMMAND.to_string(), other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[tokio::test]
    async fn test_starts_idle() {
        let correlator = ResponseCorrelator::new(MockTransport::new());
        assert_eq!(correlator.state(), CorrelatorState::Idle);
        assert!(!correlator.state().is_subscribed());
    }

    #[tokio::test]
    async fn test_no_wait_skips_subscription() {
        let transport = MockTransport::new();
        let mut correlator = ResponseCorrelator::new(transport.clone());

        let response = correlator.execute(&[0x57, 0x01], false).await.unwrap();

        assert!(response.is_success());
        assert_eq!(correlator.state(), CorrelatorState::Idle);
        assert_eq!(transport.subscribe_count(), 0);
        assert_eq!(transport.writes().await, vec![vec![0x57, 0x01]]);
    }

    #[tokio::test]
    async fn test_wait_subscribes_once() {
        let transport = MockTransport::new();
        transport.queue_reply(vec![1]).await;
        transport.queue_reply(vec![1]).await;
        let mut correlator = ResponseCorrelator::new(transport.clone());

        correlator.execute(&[0x57, 0x01], true).await.unwrap();
        correlator.execute(&[0x57, 0x01], true).await.unwrap();

        assert_eq!(transport.subscribe_count(), 1);
        assert_eq!(correlator.state(), CorrelatorState::Subscribed);
    }

    #[tokio::test]
    async fn test_rejection_keeps_payload() {
        let transport = MockTransport::new();
        transport.queue_reply(vec![5, 0, 9]).await;
        let mut correlator = ResponseCorrelator::new(transport);

        let err = correlator.execute(&[0x57, 0x02], true).await.unwrap_err();

        match err {
            Error::CommandRejected { status, response } => {
                assert_eq!(status, Some(5));
                assert_eq!(response.as_bytes(), &[5, 0, 9]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // A rejection is a completed exchange
        assert_eq!(correlator.state(), CorrelatorState::Subscribed);
    }

    #[tokio::test]
    async fn test_empty_payload_is_rejected() {
        let transport = MockTransport::new();
        transport.queue_reply(Vec::new()).await;
        let mut correlator = ResponseCorrelator::new(transport);

        let err = correlator.execute(&[0x57, 0x01], true).await.unwrap_err();
        assert!(matches!(err, Error::CommandRejected { status: None, .. }));
    }

    #[tokio::test]
    async fn test_subscribe_failure_maps_to_subscription_error() {
        let transport = MockTransport::new();
        transport.set_fail_subscribe(true);
        let mut correlator = ResponseCorrelator::new(transport.clone());

        let err = correlator.execute(&[0x57, 0x02], true).await.unwrap_err();

        assert!(matches!(err, Error::SubscriptionFailed { .. }));
        assert_eq!(correlator.state(), CorrelatorState::Idle);
        // Nothing was written
        assert!(transport.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_maps_to_write_error() {
        let transport = MockTransport::new();
        transport.set_fail_writes(true);
        let mut correlator = ResponseCorrelator::new(transport);

        let err = correlator.execute(&[0x57, 0x01], false).await.unwrap_err();
        match err {
            Error::WriteFailed { uuid, .. } => assert_eq!(uuid, COMMAND.to_string()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_contaminates_until_drained() {
        let transport = MockTransport::new();
        let mut correlator = ResponseCorrelator::new(transport.clone())
            .with_response_timeout(Some(Duration::from_secs(5)));

        let err = correlator.execute(&[0x57, 0x02], true).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(correlator.state(), CorrelatorState::Contaminated);

        // The late reply lands after the wait was abandoned
        transport.notify(vec![1, 79]).await;
        let err = correlator.execute(&[0x57, 0x02], true).await.unwrap_err();
        assert!(matches!(err, Error::SessionContaminated));

        assert_eq!(correlator.drain_stale().await, 1);
        assert_eq!(correlator.state(), CorrelatorState::Subscribed);

        transport.queue_reply(vec![1, 50]).await;
        let response = correlator.execute(&[0x57, 0x02], true).await.unwrap();
        assert_eq!(response.as_bytes(), &[1, 50]);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_session_usable() {
        let transport = MockTransport::new();
        let mut correlator = ResponseCorrelator::new(transport.clone());
        correlator.ensure_subscribed().await.unwrap();
        transport.fail_next_writes(1);

        let err = correlator.execute(&[0x57, 0x02], true).await.unwrap_err();
        assert!(matches!(err, Error::WriteFailed { .. }));
        assert_eq!(correlator.state(), CorrelatorState::Subscribed);

        transport.queue_reply(vec![1, 60]).await;
        let response = correlator.execute(&[0x57, 0x02], true).await.unwrap();
        assert_eq!(response.as_bytes(), &[1, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_slow_write_contaminates() {
        let transport = MockTransport::new();
        let mut correlator = ResponseCorrelator::new(transport.clone());
        correlator.ensure_subscribed().await.unwrap();
        transport.set_write_latency(Duration::from_secs(5));

        let abandoned = timeout(
            Duration::from_secs(1),
            correlator.execute(&[0x57, 0x08, 0x03], true),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(correlator.state(), CorrelatorState::AwaitingResponse);

        // The Bot answered the abandoned request anyway
        transport.notify(vec![1, 0, 0, 1, 7, 30, 0, 0, 0, 0, 0, 0]).await;
        transport.set_write_latency(Duration::ZERO);

        let err = correlator.execute(&[0x57, 0x02], true).await.unwrap_err();
        assert!(matches!(err, Error::SessionContaminated));
        assert_eq!(correlator.state(), CorrelatorState::Contaminated);

        assert_eq!(correlator.drain_stale().await, 1);
        transport.queue_reply(vec![1, 79]).await;
        let response = correlator.execute(&[0x57, 0x02], true).await.unwrap();
        assert_eq!(response.as_bytes(), &[1, 79]);
    }

    #[tokio::test]
    async fn test_stream_end_reports_closed() {
        let transport = MockTransport::new();
        let mut correlator = ResponseCorrelator::new(transport.clone());
        correlator.ensure_subscribed().await.unwrap();

        transport.close_notifications().await;

        let err = correlator.execute(&[0x57, 0x02], true).await.unwrap_err();
        assert!(matches!(err, Error::NotificationStreamClosed));
        assert_eq!(correlator.state(), CorrelatorState::Idle);
    }

    #[tokio::test]
    async fn test_disconnect_returns_to_idle() {
        let transport = MockTransport::new();
        let mut correlator = ResponseCorrelator::new(transport.clone());
        correlator.ensure_subscribed().await.unwrap();

        correlator.disconnect().await.unwrap();

        assert_eq!(correlator.state(), CorrelatorState::Idle);
        assert!(!transport.is_connected());
    }
}
