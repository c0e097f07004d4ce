use std::collections::{
    BTreeMap,
    VecDeque,
};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{
    self,
    BoxStream,
};
use kube::api::{
    ListParams,
    WatchEvent,
    WatchParams,
};
use kube::runtime::watcher::DefaultBackoff;
use pf_core::errors::*;
use pf_core::prelude::*;
use tracing::*;

use crate::event::{
    ChangeKind,
    Notification,
    PodSnapshot,
};
use crate::source::{
    NotificationStream,
    PodListing,
    PodSource,
};

type PodWatchStream = BoxStream<'static, kube::Result<WatchEvent<corev1::Pod>>>;

// A rejected watch comes back as the body of the watch response, so by the time the watch call
// returns the rejection is already in flight; this is how long subscribe waits for it.
const WATCH_REJECT_WINDOW: Duration = Duration::from_millis(250);
const MAX_RESUME_DELAY: Duration = Duration::from_secs(30);
const HTTP_GONE: u16 = 410;

err_impl! {WatchError,
    #[error("pod watch rejected by the apiserver: {0}")]
    Rejected(String),
}

/// [`PodSource`] backed by the Kubernetes API.  The client is built by the caller, so credential
/// handling stays out of the monitor.
#[derive(Clone)]
pub struct KubePodSource {
    client: kube::Client,
}

impl KubePodSource {
    pub fn new(client: kube::Client) -> KubePodSource {
        KubePodSource { client }
    }

    fn api(&self, namespace: &str) -> kube::Api<corev1::Pod> {
        kube::Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl PodSource for KubePodSource {
    async fn list(&self, namespace: &str, selector: &str) -> anyhow::Result<PodListing> {
        let pods = self.api(namespace).list(&ListParams::default().labels(selector)).await?;
        let items = pods.items.iter().filter_map(PodSnapshot::from_pod).collect::<Vec<_>>();
        debug!("listed {} pods in {namespace} matching '{selector}'", items.len());

        Ok(PodListing { items, resource_version: pods.metadata.resource_version })
    }

    async fn subscribe(
        &self,
        namespace: &str,
        selector: &str,
        listing: &PodListing,
    ) -> anyhow::Result<NotificationStream> {
        let version = listing.resource_version.as_deref().unwrap_or(DEFAULT_WATCH_VERSION);
        let mut state = WatchState::new(self.api(namespace), selector, version, listing);

        // The first watch is opened here so that a rejection shows up as an error from subscribe
        // instead of as an error notification on the stream.
        let mut events = state.api.watch(&state.watch_params, version).await?.boxed();
        let first = tokio::time::timeout(WATCH_REJECT_WINDOW, events.next()).await;
        match first {
            Ok(Some(Ok(WatchEvent::Error(resp)))) if resp.code != HTTP_GONE => {
                return Err(WatchError::rejected(&format!("{} ({})", resp.message, resp.code)));
            },
            Ok(Some(Err(err))) if matches!(classify(&err), Failure::Fatal) => return Err(err.into()),
            Ok(Some(item)) => {
                state.events = Some(events);
                state.handle(item);
            },
            Ok(None) => debug!("pod watch closed before any events arrived"),
            Err(_) => state.events = Some(events),
        }

        Ok(stream::unfold(state, next_notification).boxed())
    }
}

enum Failure {
    // The version we're watching from has been compacted away
    Expired,
    Transient,
    Fatal,
}

fn classify(err: &kube::Error) -> Failure {
    match err {
        kube::Error::Api(resp) if resp.code == HTTP_GONE => Failure::Expired,
        kube::Error::Api(_) => Failure::Fatal,
        _ => Failure::Transient,
    }
}

// The apiserver closes every watch after a server-side timeout, and drops the version we're
// watching from once it's been compacted (410 Gone).  Neither is visible to subscribers: a closed
// watch is re-opened from the last version we saw, and an expired one is relisted and diffed
// against the pods we know about, so that anything that changed or vanished in the gap still gets
// a notification.  Every resume waits on the kube-runtime watcher backoff first.
//
// Anything else the apiserver rejects (403, 500, ...) is fatal: we emit a single Error
// notification and end the stream.
struct WatchState {
    api: kube::Api<corev1::Pod>,
    list_params: ListParams,
    watch_params: WatchParams,
    version: String,
    events: Option<PodWatchStream>,
    known: BTreeMap<String, String>,
    pending: VecDeque<Notification>,
    backoff: DefaultBackoff,
    relist: bool,
    done: bool,
}

impl WatchState {
    fn new(api: kube::Api<corev1::Pod>, selector: &str, version: &str, listing: &PodListing) -> WatchState {
        WatchState {
            api,
            list_params: ListParams::default().labels(selector),
            watch_params: WatchParams::default().labels(selector),
            version: version.into(),
            events: None,
            known: listing.items.iter().map(|pod| (pod.name.clone(), pod.address.clone())).collect(),
            pending: VecDeque::new(),
            backoff: DefaultBackoff::default(),
            relist: false,
            done: false,
        }
    }

    fn handle(&mut self, item: kube::Result<WatchEvent<corev1::Pod>>) {
        match item {
            Ok(evt) => self.observe(evt),
            Err(err) => self.fail(err),
        }
    }

    fn observe(&mut self, evt: WatchEvent<corev1::Pod>) {
        let (kind, pod) = match evt {
            WatchEvent::Added(pod) => (ChangeKind::Added, pod),
            WatchEvent::Modified(pod) => (ChangeKind::Modified, pod),
            WatchEvent::Deleted(pod) => (ChangeKind::Deleted, pod),
            WatchEvent::Bookmark(bm) => {
                self.version = bm.metadata.resource_version;
                self.pending.push_back(Notification::bookmark());
                return;
            },
            WatchEvent::Error(resp) if resp.code == HTTP_GONE => {
                info!("pod watch version {} expired, relisting", self.version);
                self.expire();
                return;
            },
            WatchEvent::Error(resp) => {
                warn!("pod watch returned an error at version {}: {resp:?}", self.version);
                self.stop();
                return;
            },
        };

        if let Some(rv) = pod.resource_version() {
            self.version = rv;
        }
        trace!("{kind:?} {} at version {}", pod.namespaced_name(), self.version);

        let Some(snapshot) = PodSnapshot::from_pod(&pod) else {
            warn!("dropping {kind:?} notification for pod with no name");
            return;
        };
        if kind == ChangeKind::Deleted {
            self.known.remove(&snapshot.name);
        } else {
            self.known.insert(snapshot.name.clone(), snapshot.address.clone());
        }
        self.pending.push_back(Notification::new(kind, snapshot));
    }

    fn fail(&mut self, err: kube::Error) {
        match classify(&err) {
            Failure::Expired => {
                info!("pod watch version {} expired, relisting: {err}", self.version);
                self.expire();
            },
            Failure::Transient => {
                warn!("pod watch interrupted at version {}, resuming: {err}", self.version);
                self.events = None;
            },
            Failure::Fatal => {
                warn!("pod watch failed at version {}: {err}", self.version);
                self.stop();
            },
        }
    }

    fn expire(&mut self) {
        self.events = None;
        self.relist = true;
    }

    fn stop(&mut self) {
        self.events = None;
        self.done = true;
        self.pending.push_back(Notification::error());
    }

    async fn resume(&mut self) {
        let delay = self.backoff.next().unwrap_or(MAX_RESUME_DELAY);
        debug!("resuming pod watch at version {} in {delay:?}", self.version);
        tokio::time::sleep(delay).await;

        if self.relist {
            if let Err(err) = self.relist().await {
                self.fail(err);
                return;
            }
        }

        match self.api.watch(&self.watch_params, &self.version).await {
            Ok(events) => self.events = Some(events.boxed()),
            Err(err) => self.fail(err),
        }
    }

    async fn relist(&mut self) -> kube::Result<()> {
        let pods = self.api.list(&self.list_params).await?;

        let mut current = BTreeMap::new();
        for snapshot in pods.items.iter().filter_map(PodSnapshot::from_pod) {
            current.insert(snapshot.name.clone(), snapshot.address.clone());
            if self.known.get(&snapshot.name) != Some(&snapshot.address) {
                self.pending.push_back(Notification::new(ChangeKind::Modified, snapshot));
            }
        }
        for name in self.known.keys().filter(|name| !current.contains_key(*name)) {
            self.pending.push_back(Notification::new(ChangeKind::Deleted, PodSnapshot::new(name, "")));
        }
        debug!("relisted {} pods, {} changed while the watch was down", current.len(), self.pending.len());

        self.known = current;
        self.version = pods.metadata.resource_version.unwrap_or_else(|| DEFAULT_WATCH_VERSION.into());
        self.relist = false;
        Ok(())
    }
}

async fn next_notification(mut state: WatchState) -> Option<(Notification, WatchState)> {
    loop {
        if let Some(notification) = state.pending.pop_front() {
            return Some((notification, state));
        }
        if state.done {
            return None;
        }

        let Some(events) = state.events.as_mut() else {
            state.resume().await;
            continue;
        };
        let next = events.next().await;
        match next {
            Some(item) => state.handle(item),
            None => {
                debug!("pod watch closed by the apiserver at version {}", state.version);
                state.events = None;
            },
        }
    }
}
