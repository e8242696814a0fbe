//! Tokio broadcast event bus for import notifications.

use crate::models::ImportEvent;
use tokio::sync::broadcast;

/// Default number of buffered events per subscriber.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Central event bus for broadcasting import events.
///
/// Cloning is cheap; all clones publish to the same subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ImportEvent>,
}

/// Filtered receiver that yields events matching a predicate.
pub struct FilteredReceiver<F> {
    receiver: broadcast::Receiver<ImportEvent>,
    predicate: F,
}

impl EventBus {
    /// Creates a new event bus with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers (best effort).
    ///
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: ImportEvent) {
        metrics::counter!("event_bus_publish_total", "event_type" => event.event_type())
            .increment(1);
        if self.sender.send(event).is_err() {
            metrics::counter!("event_bus_publish_unobserved_total").increment(1);
        }
    }

    /// Subscribes to every event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        metrics::counter!("event_bus_subscriptions_total").increment(1);
        self.sender.subscribe()
    }

    /// Subscribes with a predicate to filter events by type or attributes.
    #[must_use]
    pub fn subscribe_filtered<F>(&self, predicate: F) -> FilteredReceiver<F>
    where
        F: Fn(&ImportEvent) -> bool,
    {
        metrics::counter!("event_bus_subscriptions_total").increment(1);
        FilteredReceiver {
            receiver: self.sender.subscribe(),
            predicate,
        }
    }

    /// Subscribes to events matching the provided event type.
    #[must_use]
    pub fn subscribe_event_type(
        &self,
        event_type: &'static str,
    ) -> FilteredReceiver<impl Fn(&ImportEvent) -> bool + use<>> {
        self.subscribe_filtered(move |event| event.event_type() == event_type)
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&ImportEvent) -> bool,
{
    /// Receives the next event that matches the predicate.
    ///
    /// # Errors
    ///
    /// Returns [`broadcast::error::RecvError::Lagged`] when events were
    /// dropped before this receiver saw them, and `Closed` once every sender
    /// is gone. A lagged receiver stays usable.
    pub async fn recv(&mut self) -> Result<ImportEvent, broadcast::error::RecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if (self.predicate)(&event) => return Ok(event),
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    metrics::counter!("event_bus_lagged_total").increment(skipped);
                    tracing::warn!(skipped, "Event subscriber lagged behind event bus");
                    return Err(broadcast::error::RecvError::Lagged(skipped));
                },
                Err(err) => return Err(err),
            }
        }
    }

    /// Returns the next already-buffered matching event without waiting.
    ///
    /// # Errors
    ///
    /// Returns `Empty` when nothing matching is buffered, and `Lagged` or
    /// `Closed` as [`recv`](Self::recv) does.
    pub fn try_recv(&mut self) -> Result<ImportEvent, broadcast::error::TryRecvError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if (self.predicate)(&event) => return Ok(event),
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    metrics::counter!("event_bus_lagged_total").increment(skipped);
                    tracing::warn!(skipped, "Event subscriber lagged behind event bus");
                    return Err(broadcast::error::TryRecvError::Lagged(skipped));
                },
                Err(err) => return Err(err),
            }
        }
    }
}
