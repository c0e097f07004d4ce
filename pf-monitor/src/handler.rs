use async_trait::async_trait;
use tracing::*;

use crate::event::PodEvent;
use crate::fanout::EventReceiver;

/// Callback-style consumer for a monitor subscription; see [`dispatch`].
#[async_trait]
pub trait PodEventHandler: Send {
    // Names of the pods in the initial listing (`MonitorHandle::listed_pods`); call this before
    // dispatching any events
    async fn on_start(&mut self, _names: &[String]) {}

    async fn on_upsert(&mut self, name: &str, address: &str);
    async fn on_removed(&mut self, name: &str);
}

/// Drain `events` into `handler` until the monitor closes the channel, and return how many events
/// were handled.
pub async fn dispatch<H: PodEventHandler + ?Sized>(mut events: EventReceiver, handler: &mut H) -> usize {
    let mut count = 0;
    while let Some(evt) = events.recv().await {
        match &evt {
            PodEvent::Upsert { name, address } => handler.on_upsert(name, address).await,
            PodEvent::Removed { name } => handler.on_removed(name).await,
        }
        count += 1;
    }
    debug!("event channel closed after {count} events");
    count
}
