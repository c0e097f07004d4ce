use futures::StreamExt;
use pf_core::prelude::*;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::config::MonitorConfig;
use crate::event::{
    ChangeKind,
    Notification,
    PodEvent,
};
use crate::fanout::{
    EventReceiver,
    Fanout,
};
use crate::source::{
    NotificationStream,
    PodListing,
    PodSource,
};
use crate::translate::translate;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("could not list pods in namespace {0}")]
    ListFailed(String),

    #[error("could not subscribe to pod changes in namespace {0}")]
    SubscribeFailed(String),

    #[error("monitor cancelled before the pod watch was established")]
    StartupCancelled,

    #[error("monitor task exited before reporting readiness")]
    StartupAborted,
}

// On success the background task hands back the names of the pods in the initial listing
type ReadySender = oneshot::Sender<anyhow::Result<Vec<String>>>;

/// Watches the pods in one namespace that match a label selector, and turns the apiserver's list
/// and watch responses into a single ordered stream of [`PodEvent`]s.
///
/// Usage is: construct, call [`Monitor::events`] once per consumer, then [`Monitor::start`].  The
/// monitor first lists the matching pods and sends an upsert for each one that has an address, and
/// only then forwards changes from the live watch, so consumers always see a pod's initial state
/// before any modification to it.
///
/// Removals are passed through as the source reports them.  If the source reuses a pod name after
/// deleting it, consumers will see upserts for that name again; the monitor does no de-duplication
/// across a pod's lifetime.
pub struct Monitor {
    source: Box<dyn PodSource>,
    config: MonitorConfig,
    fanout: Fanout,
}

impl Monitor {
    pub fn new(source: Box<dyn PodSource>, config: MonitorConfig) -> anyhow::Result<Monitor> {
        config.validate()?;
        let fanout = Fanout::new(config.channel_capacity);
        Ok(Monitor { source, config, fanout })
    }

    // Each call registers a new subscriber that receives every event from here on.  The channel
    // closes once the monitor terminates; a closed channel is the end of the stream, not an error.
    pub fn events(&mut self) -> EventReceiver {
        self.fanout.subscribe()
    }

    /// Establish the pod watch and hand the event pump off to a background task.
    ///
    /// Returns once the initial listing has succeeded and the watch subscription is open.  If
    /// either step fails, the error is returned here, no background task is left running, and no
    /// events are ever sent (subscriber channels just close).  The monitor runs until `cancel`
    /// fires or the watch source gives up (it rides out reconnects and expired versions on its
    /// own), at which point all subscriber channels are closed.
    pub async fn start(self, cancel: CancellationToken) -> anyhow::Result<MonitorHandle> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(cancel, ready_tx));

        match ready_rx.await {
            Ok(Ok(listed)) => Ok(MonitorHandle { task, listed }),
            Ok(Err(err)) => {
                // The task exits as soon as it's reported the error; wait for it so that nothing
                // is left behind when we return.
                task.await?;
                Err(err)
            },
            Err(_) => {
                task.await?;
                Err(MonitorError::StartupAborted.into())
            },
        }
    }

    #[instrument(skip_all, fields(ns = %self.config.namespace, sel = %self.config.label_selector))]
    async fn run(self, cancel: CancellationToken, ready_tx: ReadySender) {
        let Monitor { source, config, mut fanout } = self;

        let (listing, stream) = match establish(source.as_ref(), &config, &cancel).await {
            Ok(res) => res,
            Err(err) => {
                let _ = ready_tx.send(Err(err));
                return;
            },
        };

        if ready_tx.send(Ok(listing.names())).is_err() {
            // The start() future was dropped, so the caller never got a handle and doesn't know
            // the monitor is running
            info!("start() caller went away, shutting down pod monitor");
            return;
        }
        info!("pod monitor running with {} subscribers", fanout.len());

        pump(listing, stream, &mut fanout, &cancel).await;

        // Dropping the fanout closes every subscriber channel; this is the only place it happens
        drop(fanout);
        info!("pod monitor terminated");
    }
}

/// Handle to a started [`Monitor`]'s background task.
#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
    listed: Vec<String>,
}

impl MonitorHandle {
    // Names of the pods in the initial listing, whether or not they had an address yet
    pub fn listed_pods(&self) -> &[String] {
        &self.listed
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    // Resolves after the monitor has terminated and closed its channels; cancel first, or this
    // waits for the watch source to end on its own.
    pub async fn wait(self) -> EmptyResult {
        self.task.await?;
        Ok(())
    }
}

async fn establish(
    source: &dyn PodSource,
    config: &MonitorConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<(PodListing, NotificationStream)> {
    let ns = &config.namespace;
    let selector = config.label_selector.render();

    let listing = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(MonitorError::StartupCancelled.into()),
        res = source.list(ns, &selector) => res.map_err(|err| err.context(MonitorError::ListFailed(ns.clone())))?,
    };
    debug!("initial listing returned {} pods", listing.items.len());

    let stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(MonitorError::StartupCancelled.into()),
        res = source.subscribe(ns, &selector, &listing) => {
            res.map_err(|err| err.context(MonitorError::SubscribeFailed(ns.clone())))?
        },
    };
    debug!(
        "subscribed to pod changes at version {}",
        listing.resource_version.as_deref().unwrap_or(DEFAULT_WATCH_VERSION)
    );

    Ok((listing, stream))
}

// Seed subscribers from the listing, then forward live notifications until cancelled.  Cancellation
// always wins over a pending notification or a blocked delivery.
async fn pump(listing: PodListing, mut stream: NotificationStream, fanout: &mut Fanout, cancel: &CancellationToken) {
    for pod in listing.items {
        let Some(evt) = translate(&Notification::new(ChangeKind::Added, pod)) else { continue };
        if !deliver(evt, fanout, cancel).await {
            return;
        }
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("pod monitor cancelled");
                return;
            },
            maybe_notification = stream.next() => {
                let Some(notification) = maybe_notification else {
                    warn!("pod watch stream ended, shutting down pod monitor");
                    return;
                };
                let Some(evt) = translate(&notification) else { continue };
                if !deliver(evt, fanout, cancel).await {
                    return;
                }
            },
        }
    }
}

// Returns false if the monitor was cancelled while waiting for subscribers to make room
async fn deliver(evt: PodEvent, fanout: &mut Fanout, cancel: &CancellationToken) -> bool {
    trace!("delivering {evt}");
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("pod monitor cancelled while delivering events");
            false
        },
        _ = fanout.publish(evt) => true,
    }
}

#[cfg(test)]
impl Monitor {
    pub(crate) fn subscriber_count(&self) -> usize {
        self.fanout.len()
    }
}
