use crate::exception::RaisedException;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use uuid::Uuid;

type Payload = Arc<dyn Any + Send + Sync>;

/// Emitted once for every reportable exception, before it is rendered.
#[derive(Debug, Clone)]
pub struct ReportEvent {
    pub id: Uuid,
    pub exception: Arc<RaisedException>,
    pub occurred_at: DateTime<Utc>,
}

impl ReportEvent {
    pub fn new(exception: Arc<RaisedException>) -> Self {
        Self {
            id: Uuid::new_v4(),
            exception,
            occurred_at: Utc::now(),
        }
    }
}

/// A simple in-memory event bus
///
/// Publishing is fire-and-forget: with no subscribers the event is dropped.
#[derive(Clone)]
pub struct EventBus {
    // Map of Event Type -> Broadcast Sender
    channels: Arc<DashMap<TypeId, broadcast::Sender<Payload>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Bus whose channels buffer up to `capacity` events per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Publish an event
    pub fn publish<E: Send + Sync + 'static>(&self, event: E) {
        let type_id = TypeId::of::<E>();
        if let Some(sender) = self.channels.get(&type_id) {
            let _ = sender.send(Arc::new(event));
        }
    }

    /// Subscribe to an event
    pub fn subscribe<E: Send + Sync + 'static>(&self) -> Subscription<E> {
        let type_id = TypeId::of::<E>();
        let sender = self.channels.entry(type_id).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.capacity);
            tx
        });
        Subscription {
            receiver: sender.subscribe(),
            _event: PhantomData,
        }
    }

    /// Number of live subscriptions for `E`.
    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.channels
            .get(&TypeId::of::<E>())
            .map_or(0, |sender| sender.receiver_count())
    }
}

/// Typed receiving end of an [`EventBus`] channel.
pub struct Subscription<E> {
    receiver: broadcast::Receiver<Payload>,
    _event: PhantomData<fn() -> E>,
}

impl<E: Send + Sync + 'static> Subscription<E> {
    /// Wait for the next event. Returns `None` once the bus is gone.
    ///
    /// Events dropped because this subscriber lagged behind are skipped.
    pub async fn recv(&mut self) -> Option<Arc<E>> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => {
                    if let Ok(event) = payload.downcast::<E>() {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<E>> {
        loop {
            match self.receiver.try_recv() {
                Ok(payload) => {
                    if let Ok(event) = payload.downcast::<E>() {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
