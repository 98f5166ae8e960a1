//! # Publish / Subscribe
//!
//! Subscriptions run on a dedicated connection opened outside the pools.
//! A [`Subscription`] handle stops them from any task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use redis::AsyncCommands;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::redis_client::CacheClient;
use crate::codec::Serializer;
use crate::error::{CacheError, Result};

/// How long a background subscription may take to confirm.
pub const SUBSCRIBE_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubMessage {
    pub channel: String,
    /// Pattern that matched, for pattern subscriptions
    pub pattern: Option<String>,
    pub payload: Vec<u8>,
}

impl PubSubMessage {
    fn from_msg(msg: &redis::Msg) -> Self {
        Self {
            channel: msg.get_channel_name().to_string(),
            pattern: msg
                .from_pattern()
                .then(|| msg.get_pattern::<String>().ok())
                .flatten(),
            payload: msg.get_payload_bytes().to_vec(),
        }
    }

    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

struct SubscriptionState {
    id: Uuid,
    stop: watch::Sender<bool>,
    active: Arc<AtomicBool>,
}

/// Handle controlling a running subscription.
///
/// Clones control the same subscription. Dropping every clone also ends a
/// background subscription.
#[derive(Clone)]
pub struct Subscription {
    state: Arc<SubscriptionState>,
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            state: Arc::new(SubscriptionState {
                id: Uuid::new_v4(),
                stop,
                active: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.state.id
    }

    /// Ask the subscription loop to stop. Idempotent.
    pub fn unsubscribe(&self) {
        self.state.stop.send_replace(true);
    }

    /// Whether the store has confirmed the subscription and it is running.
    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::Acquire)
    }

    pub fn is_unsubscribed(&self) -> bool {
        *self.state.stop.borrow()
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            id: self.state.id,
            stop: self.state.stop.subscribe(),
            active: Arc::clone(&self.state.active),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

/// What the subscription loop holds: it observes the handle without
/// keeping it alive.
struct Ticket {
    id: Uuid,
    stop: watch::Receiver<bool>,
    active: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Channels,
    Patterns,
}

impl Mode {
    const fn op(self) -> &'static str {
        match self {
            Self::Channels => "subscribe",
            Self::Patterns => "psubscribe",
        }
    }
}

impl<S: Serializer> CacheClient<S> {
    /// Publish a raw message. Returns how many subscribers received it.
    pub async fn publish(&self, channel: &str, message: &str) -> i64 {
        self.guarded("publish", channel, async {
            let mut conn = self.lease().await?;
            let receivers: i64 = conn.publish(channel, message).await?;
            Ok(receivers)
        })
        .await
    }

    // =========================================================================
    // BLOCKING SUBSCRIPTIONS
    // =========================================================================

    /// Deliver messages on `channels` to `handler` until `subscription` is
    /// unsubscribed. Returns `true` on a clean stop, `false` if the
    /// subscription could not start or the connection dropped.
    pub async fn subscribe<F>(&self, subscription: &Subscription, channels: &[&str], handler: F) -> bool
    where
        F: FnMut(PubSubMessage) + Send,
    {
        self.subscribe_blocking(Mode::Channels, subscription, channels, handler)
            .await
    }

    /// Pattern variant of [`CacheClient::subscribe`].
    pub async fn psubscribe<F>(&self, subscription: &Subscription, patterns: &[&str], handler: F) -> bool
    where
        F: FnMut(PubSubMessage) + Send,
    {
        self.subscribe_blocking(Mode::Patterns, subscription, patterns, handler)
            .await
    }

    async fn subscribe_blocking<F>(
        &self,
        mode: Mode,
        subscription: &Subscription,
        targets: &[&str],
        handler: F,
    ) -> bool
    where
        F: FnMut(PubSubMessage) + Send,
    {
        let Some(first) = targets.first() else {
            return false;
        };
        let targets = targets.iter().map(ToString::to_string).collect::<Vec<_>>();
        self.guarded_within(mode.op(), first, Duration::MAX, async {
            self.run_subscription(subscription.ticket(), mode, &targets, handler, None)
                .await
                .map(|()| true)
        })
        .await
    }

    // =========================================================================
    // BACKGROUND SUBSCRIPTIONS
    // =========================================================================

    /// Subscribe on a spawned task. Waits up to
    /// [`SUBSCRIBE_CONFIRM_TIMEOUT`] for the store to confirm, then returns
    /// the handle whether or not confirmation arrived.
    pub async fn subscribe_background<F>(&self, channels: &[&str], handler: F) -> Subscription
    where
        F: FnMut(PubSubMessage) + Send + 'static,
    {
        self.spawn_subscription(Mode::Channels, channels, handler)
            .await
    }

    /// Pattern variant of [`CacheClient::subscribe_background`].
    pub async fn psubscribe_background<F>(&self, patterns: &[&str], handler: F) -> Subscription
    where
        F: FnMut(PubSubMessage) + Send + 'static,
    {
        self.spawn_subscription(Mode::Patterns, patterns, handler)
            .await
    }

    async fn spawn_subscription<F>(&self, mode: Mode, targets: &[&str], handler: F) -> Subscription
    where
        F: FnMut(PubSubMessage) + Send + 'static,
    {
        let subscription = Subscription::new();
        if targets.is_empty() {
            warn!(op = mode.op(), "Nothing to subscribe to");
            return subscription;
        }

        let targets = targets.iter().map(ToString::to_string).collect::<Vec<_>>();
        let ticket = subscription.ticket();
        let client = self.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        tokio::spawn(async move {
            if let Err(err) = client
                .run_subscription(ticket, mode, &targets, handler, Some(ready_tx))
                .await
            {
                warn!(
                    app_id = %client.app_id(),
                    op = mode.op(),
                    targets = ?targets,
                    error = %err,
                    "Background subscription ended with error"
                );
            }
        });

        match tokio::time::timeout(SUBSCRIBE_CONFIRM_TIMEOUT, ready_rx).await {
            Ok(Ok(())) => debug!(subscription = %subscription.id(), "Background subscription confirmed"),
            Ok(Err(_)) => warn!(
                subscription = %subscription.id(),
                "Background subscription stopped before confirming"
            ),
            Err(_) => warn!(
                subscription = %subscription.id(),
                timeout_ms = 5000,
                "Background subscription not confirmed in time"
            ),
        }
        subscription
    }

    // =========================================================================
    // SUBSCRIPTION LOOP
    // =========================================================================

    async fn run_subscription<F>(
        &self,
        mut ticket: Ticket,
        mode: Mode,
        targets: &[String],
        mut handler: F,
        ready: Option<oneshot::Sender<()>>,
    ) -> Result<()>
    where
        F: FnMut(PubSubMessage) + Send,
    {
        if *ticket.stop.borrow() {
            return Ok(());
        }

        let client = self.provider().subscriber().await?;
        let mut pubsub = client.get_async_pubsub().await?;
        for target in targets {
            match mode {
                Mode::Channels => pubsub.subscribe(target).await?,
                Mode::Patterns => pubsub.psubscribe(target).await?,
            }
        }

        ticket.active.store(true, Ordering::Release);
        if let Some(ready) = ready
            && ready.send(()).is_err()
        {
            debug!(subscription = %ticket.id, "Confirmation arrived after the caller stopped waiting");
        }
        info!(
            app_id = %self.app_id(),
            subscription = %ticket.id,
            op = mode.op(),
            targets = ?targets,
            "Subscribed"
        );

        let mut messages = Box::pin(pubsub.on_message());
        let outcome = loop {
            tokio::select! {
                changed = ticket.stop.changed() => {
                    if changed.is_err() || *ticket.stop.borrow() {
                        break Ok(());
                    }
                }
                message = messages.next() => match message {
                    Some(message) => handler(PubSubMessage::from_msg(&message)),
                    None => break Err(CacheError::Redis("subscription connection closed".to_string())),
                },
            }
        };

        ticket.active.store(false, Ordering::Release);
        info!(subscription = %ticket.id, op = mode.op(), "Unsubscribed");
        outcome
    }
}
