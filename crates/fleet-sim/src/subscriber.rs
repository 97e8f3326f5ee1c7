//! Subscriber trait and subscription handles.

use std::fmt;
use std::sync::Weak;

use thiserror::Error;

use crate::Snapshot;
use crate::engine::EngineShared;

/// Error returned by a subscriber.  The engine logs it and moves on to the
/// next subscriber; it never reaches other subscribers or the tick loop.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SubscriberError(Box<dyn std::error::Error + Send + Sync>);

impl SubscriberError {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SubscriberError(Box::new(error))
    }

    pub fn msg(message: impl Into<String>) -> Self {
        SubscriberError(message.into().into())
    }
}

pub type SubscriberResult = Result<(), SubscriberError>;

/// Receives every published population snapshot.
///
/// Callbacks run synchronously on the engine's tick thread, one subscriber
/// after another, so slow work belongs on the subscriber's own thread (e.g.
/// forward the snapshot over a channel).  Errors and panics are contained
/// per subscriber.
///
/// A subscriber may call `subscribe`, `get_by_id`, `snapshot`, or
/// `disconnect` on the engine from inside the callback.  A nested `tick`
/// is ignored.
pub trait FleetSubscriber: Send + Sync + 'static {
    fn on_snapshot(&self, snapshot: &Snapshot) -> SubscriberResult;
}

impl<F> FleetSubscriber for F
where
    F: Fn(&Snapshot) -> SubscriberResult + Send + Sync + 'static,
{
    fn on_snapshot(&self, snapshot: &Snapshot) -> SubscriberResult {
        self(snapshot)
    }
}

/// Identifier of one registration, unique per engine.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

/// Unsubscribes when dropped.
///
/// Call [`detach`](Self::detach) to keep the subscription for the lifetime
/// of the engine instead.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id:     SubscriptionId,
    engine: Weak<EngineShared>,
    armed:  bool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, engine: Weak<EngineShared>) -> Self {
        Self { id, engine, armed: true }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unsubscribe now.  Returns `false` if the engine is gone or the
    /// subscription was already removed.
    pub fn cancel(mut self) -> bool {
        self.armed = false;
        match self.engine.upgrade() {
            Some(shared) => shared.remove_subscriber(self.id),
            None => false,
        }
    }

    /// Keep the subscription alive without holding the handle.
    pub fn detach(mut self) -> SubscriptionId {
        self.armed = false;
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.armed {
            if let Some(shared) = self.engine.upgrade() {
                shared.remove_subscriber(self.id);
            }
        }
    }
}
