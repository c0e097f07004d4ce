use tokio::sync::mpsc;
use tracing::*;

use crate::event::PodEvent;

pub type EventSender = mpsc::Sender<PodEvent>;
pub type EventReceiver = mpsc::Receiver<PodEvent>;

// Delivers every event to every subscriber, in order.  Sends block when a subscriber's buffer is
// full, so a slow consumer holds up the whole monitor instead of losing events.  Subscribers whose
// receiver has been dropped are pruned on the next publish.
//
// Closing is by drop: once the Fanout goes away every sender goes with it, which is the only way
// the subscriber channels ever close.
pub(crate) struct Fanout {
    capacity: usize,
    subscribers: Vec<EventSender>,
}

impl Fanout {
    pub(crate) fn new(capacity: usize) -> Fanout {
        Fanout { capacity, subscribers: vec![] }
    }

    pub(crate) fn subscribe(&mut self) -> EventReceiver {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) async fn publish(&mut self, evt: PodEvent) {
        let mut closed = false;
        for sub in &self.subscribers {
            if sub.send(evt.clone()).await.is_err() {
                closed = true;
            }
        }

        if closed {
            self.subscribers.retain(|sub| !sub.is_closed());
            debug!("pruned closed subscribers, {} remaining", self.subscribers.len());
        }
    }
}
