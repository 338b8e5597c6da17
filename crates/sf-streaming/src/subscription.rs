//! The subscription state machine.
//!
//! ```text
//! Disconnected -> Handshaking -> Connected -> Subscribed <-> (long poll)
//!                      ^                          |
//!                      +------ Reconnecting <-----+   advice: handshake
//!                                                 |
//!                                Terminated <-----+   advice: none, error,
//!                                                     deadline, disconnect()
//! ```
//!
//! Nothing happens on the network until the consumer asks for the next
//! value. Each [`Subscription::poll_once`] performs at most one long poll,
//! plus the handshake and subscribe when the subscription has no client id.

use std::collections::VecDeque;
use std::time::Duration;

use futures::Stream;
use sfq_client::{Error, ErrorKind, RequestBuilder, Result, SalesforceClient};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::StreamingConfig;
use crate::event::StreamEvent;
use crate::message::{
    Advice, Message, Reconnect, ReplayFrom, CONNECT_CHANNEL, HANDSHAKE_CHANNEL,
    SUBSCRIBE_CHANNEL,
};

/// Extra time given to the HTTP layer beyond `poll_wait`, so the poll cap
/// fires before the transport timeout does.
const TRANSPORT_SLACK: Duration = Duration::from_secs(10);

/// Where the subscription is in the Bayeux exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No exchange has happened yet.
    Disconnected,
    /// Handshake in flight.
    Handshaking,
    /// Client id assigned, not yet subscribed.
    Connected,
    /// Subscribed; long polls deliver events.
    Subscribed,
    /// The server asked for a new handshake.
    Reconnecting,
    /// Finished. No further network calls are made.
    Terminated,
}

impl ConnectionState {
    /// Check if the subscription has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Terminated)
    }
}

/// Result of one [`Subscription::poll_once`].
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Event(StreamEvent),
    /// The poll wait elapsed, or the server answered without events.
    Idle,
    /// The subscription is terminated.
    Ended,
}

/// A pull-driven subscription to one channel.
///
/// # Example
///
/// ```rust,ignore
/// use sfq_streaming::{StreamingConfig, Subscription};
///
/// let mut sub = Subscription::new(client, "/event/Order_Shipped__e", StreamingConfig::default())?;
/// while let Some(event) = sub.next().await {
///     let event = event?;
///     println!("{:?}: {}", event.replay_id, event.payload);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription {
    client: SalesforceClient,
    config: StreamingConfig,
    channel: String,
    state: ConnectionState,
    client_id: Option<String>,
    last_replay_id: Option<i64>,
    advice: Option<Advice>,
    pending_delay: Option<Duration>,
    buffer: VecDeque<StreamEvent>,
    deadline: Option<Instant>,
    message_id: u64,
}

impl Subscription {
    /// Create a subscription. No network call happens here.
    ///
    /// Resuming from `ReplayFrom::Marker(n)` never yields an event with a
    /// replay id of `n` or lower.
    pub fn new(
        client: SalesforceClient,
        channel: impl Into<String>,
        config: StreamingConfig,
    ) -> Result<Self> {
        let channel = channel.into();
        if !channel.starts_with('/') || channel.starts_with("/meta/") || channel.len() < 2 {
            return Err(Error::configuration(format!(
                "invalid streaming channel {:?}",
                channel
            )));
        }
        if !client.http().config().cookie_store {
            warn!("Cookie store is disabled; the streaming endpoint may reject long polls");
        }

        let last_replay_id = match config.replay {
            ReplayFrom::Marker(id) => Some(id),
            _ => None,
        };

        Ok(Self {
            client,
            config,
            channel,
            state: ConnectionState::Disconnected,
            client_id: None,
            last_replay_id,
            advice: None,
            pending_delay: None,
            buffer: VecDeque::new(),
            deadline: None,
            message_id: 0,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The server-assigned client id, while one is held.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Replay id of the last event handed out (or the resume marker).
    pub fn last_replay_id(&self) -> Option<i64> {
        self.last_replay_id
    }

    /// The most recent advice from the server.
    pub fn advice(&self) -> Option<Advice> {
        self.advice
    }

    /// Advance the subscription by at most one long poll.
    ///
    /// Any error terminates the subscription; the next call returns
    /// [`PollOutcome::Ended`].
    #[instrument(skip(self), fields(channel = %self.channel))]
    pub async fn poll_once(&mut self) -> Result<PollOutcome> {
        if let Some(event) = self.pop_event() {
            return Ok(PollOutcome::Event(event));
        }
        if self.state.is_terminal() {
            return Ok(PollOutcome::Ended);
        }

        if self.deadline.is_none() {
            self.deadline = self.config.deadline.map(|limit| Instant::now() + limit);
        }
        let deadline = self.deadline;
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Subscription deadline reached");
            self.terminate();
            return Ok(PollOutcome::Ended);
        }

        match self.long_poll(deadline).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(error = %e, "Subscription failed");
                self.terminate();
                Err(e)
            }
        }
    }

    /// The next event, skipping idle polls. `None` once the subscription
    /// has ended.
    pub async fn next(&mut self) -> Option<Result<StreamEvent>> {
        loop {
            match self.poll_once().await {
                Ok(PollOutcome::Event(event)) => return Some(Ok(event)),
                Ok(PollOutcome::Idle) => continue,
                Ok(PollOutcome::Ended) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Consume the subscription as a stream of events.
    pub fn into_stream(self) -> impl Stream<Item = Result<StreamEvent>> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|item| (item, sub))
        })
    }

    /// Leave the channel. Best effort: a failed disconnect is logged and the
    /// subscription terminates anyway.
    #[instrument(skip(self), fields(channel = %self.channel))]
    pub async fn disconnect(&mut self) {
        if let Some(client_id) = self.client_id.clone() {
            let message = Message::disconnect(self.next_message_id(), &client_id);
            let timeout = self.config.handshake_timeout;
            if let Err(e) = self.exchange(message, timeout).await {
                debug!(error = %e, "Disconnect failed");
            }
        }
        self.terminate();
    }

    async fn long_poll(&mut self, deadline: Option<Instant>) -> Result<PollOutcome> {
        if self.client_id.is_none() {
            let client_id = self.handshake().await?;
            self.subscribe(&client_id).await?;
            // Only a subscribed client id is kept, so a poll cancelled
            // between handshake and subscribe starts over.
            self.client_id = Some(client_id);
            self.state = ConnectionState::Subscribed;
        }

        if let Some(delay) = self.pending_delay.take() {
            debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnect");
            let wake = Instant::now() + delay;
            tokio::time::sleep_until(deadline.map_or(wake, |d| wake.min(d))).await;
        }

        let Some(client_id) = self.client_id.clone() else {
            return Ok(PollOutcome::Idle);
        };
        let message = Message::connect(self.next_message_id(), &client_id);
        let wait = match deadline {
            Some(d) => self
                .config
                .poll_wait
                .min(d.saturating_duration_since(Instant::now())),
            None => self.config.poll_wait,
        };

        let replies = match tokio::time::timeout(
            wait,
            self.exchange(message, self.config.poll_wait + TRANSPORT_SLACK),
        )
        .await
        {
            Ok(replies) => replies?,
            Err(_) => {
                debug!(wait_ms = wait.as_millis() as u64, "Poll wait elapsed");
                return Ok(PollOutcome::Idle);
            }
        };

        self.absorb(replies);

        match self.pop_event() {
            Some(event) => Ok(PollOutcome::Event(event)),
            None if self.state.is_terminal() => Ok(PollOutcome::Ended),
            None => Ok(PollOutcome::Idle),
        }
    }

    async fn handshake(&mut self) -> Result<String> {
        self.state = ConnectionState::Handshaking;
        let message = Message::handshake(self.next_message_id());
        let replies = self
            .exchange(message, self.config.handshake_timeout)
            .await
            .map_err(handshake_error)?;

        let reply = find_reply(replies, HANDSHAKE_CHANNEL)?;
        if !reply.is_successful() {
            let message = reply.error_message();
            return Err(match reply.error_status() {
                Some(401) | Some(403) => Error::authentication(message),
                status => Error::new(ErrorKind::Api {
                    status: status.unwrap_or(400),
                    error_code: "HANDSHAKE_FAILED".to_string(),
                    message,
                }),
            });
        }

        let client_id = reply.client_id.ok_or_else(|| {
            Error::new(ErrorKind::Api {
                status: 200,
                error_code: "MALFORMED_RESPONSE".to_string(),
                message: "handshake reply has no clientId".to_string(),
            })
        })?;
        if reply.advice.is_some() {
            self.advice = reply.advice;
        }

        info!("Handshake complete");
        self.state = ConnectionState::Connected;
        Ok(client_id)
    }

    async fn subscribe(&mut self, client_id: &str) -> Result<()> {
        let marker = self
            .last_replay_id
            .unwrap_or_else(|| self.config.replay.marker());
        let message = Message::subscribe(self.next_message_id(), client_id, &self.channel, marker);

        let replies = self.exchange(message, self.config.handshake_timeout).await?;
        let reply = find_reply(replies, SUBSCRIBE_CHANNEL)?;
        if !reply.is_successful() {
            return Err(Error::new(ErrorKind::Api {
                status: reply.error_status().unwrap_or(400),
                error_code: "SUBSCRIBE_FAILED".to_string(),
                message: reply.error_message(),
            }));
        }

        info!(replay = marker, "Subscribed");
        Ok(())
    }

    /// Buffer data messages and act on the connect reply's advice.
    fn absorb(&mut self, replies: Vec<Message>) {
        for reply in replies {
            if !reply.is_meta() {
                if reply.channel != self.channel {
                    debug!(channel = %reply.channel, "Ignoring message for another channel");
                    continue;
                }
                if let Some(data) = reply.data {
                    self.buffer
                        .push_back(StreamEvent::from_data(&reply.channel, data));
                }
                continue;
            }
            if reply.channel != CONNECT_CHANNEL {
                debug!(channel = %reply.channel, "Ignoring meta reply");
                continue;
            }

            let advice = reply.advice;
            if advice.is_some() {
                self.advice = advice;
            }
            let reconnect = match advice.and_then(|a| a.reconnect) {
                Some(reconnect) => reconnect,
                None if reply.is_successful() => Reconnect::Retry,
                None => Reconnect::Handshake,
            };
            if !reply.is_successful() {
                info!(error = %reply.error_message(), "Connect rejected");
            }

            match reconnect {
                Reconnect::Retry | Reconnect::Unknown => {
                    self.state = ConnectionState::Subscribed;
                    self.pending_delay = advice
                        .and_then(|a| a.interval)
                        .filter(|ms| *ms > 0)
                        .map(Duration::from_millis);
                }
                Reconnect::Handshake => {
                    info!("Server requested a new handshake");
                    self.client_id = None;
                    self.state = ConnectionState::Reconnecting;
                }
                Reconnect::None => {
                    info!("Server advised no reconnect");
                    self.terminate();
                }
            }
        }
    }

    /// Hand out the next buffered event newer than the last marker,
    /// recording its marker first.
    fn pop_event(&mut self) -> Option<StreamEvent> {
        while let Some(event) = self.buffer.pop_front() {
            match (event.replay_id, self.last_replay_id) {
                (Some(id), Some(last)) if id <= last => {
                    debug!(replay_id = id, last, "Dropping already seen event");
                }
                (Some(id), _) => {
                    self.last_replay_id = Some(id);
                    return Some(event);
                }
                (None, _) => return Some(event),
            }
        }
        None
    }

    fn terminate(&mut self) {
        self.state = ConnectionState::Terminated;
        self.client_id = None;
        self.pending_delay = None;
    }

    fn next_message_id(&mut self) -> String {
        self.message_id += 1;
        self.message_id.to_string()
    }

    async fn exchange(&self, message: Message, timeout: Duration) -> Result<Vec<Message>> {
        let path = format!("/cometd/{}", self.client.api_version());
        let request = RequestBuilder::post(path).json(&[message])?.timeout(timeout);
        self.client.send_json(request).await
    }
}

/// A rejected handshake at the HTTP level: 401/403 mean the credentials
/// were refused.
fn handshake_error(err: Error) -> Error {
    match err.status() {
        Some(401) | Some(403) if !err.is_auth_error() => {
            Error::authentication(format!("streaming handshake rejected: {}", err))
        }
        _ => err,
    }
}

fn find_reply(replies: Vec<Message>, channel: &str) -> Result<Message> {
    replies
        .into_iter()
        .find(|m| m.channel == channel)
        .ok_or_else(|| {
            Error::new(ErrorKind::Api {
                status: 200,
                error_code: "MALFORMED_RESPONSE".to_string(),
                message: format!("no {} reply", channel),
            })
        })
}
