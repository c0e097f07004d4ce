use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;

use crate::event::{
    Notification,
    PodSnapshot,
};

pub type NotificationStream = Pin<Box<dyn Stream<Item = Notification> + Send>>;

/// Result of a one-shot listing.  `resource_version` is the point in the apiserver's history the
/// listing was taken at; subscribing from that version picks up exactly where the listing ended.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PodListing {
    pub items: Vec<PodSnapshot>,
    pub resource_version: Option<String>,
}

impl PodListing {
    pub fn new(items: Vec<PodSnapshot>, resource_version: &str) -> PodListing {
        PodListing { items, resource_version: Some(resource_version.into()) }
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|pod| pod.name.clone()).collect()
    }
}

// Everything the monitor needs from the orchestration API.  The kube-backed implementation lives
// in kube_source.rs; tests substitute a mock.
#[cfg_attr(any(test, feature = "mock"), automock)]
#[async_trait]
pub trait PodSource: Send + Sync {
    async fn list(&self, namespace: &str, selector: &str) -> anyhow::Result<PodListing>;

    // Subscribe to every change that happens after `listing` was taken.  An error here means the
    // subscription was never established; once the stream is handed back, failures show up as an
    // Error notification and the end of the stream.
    async fn subscribe(
        &self,
        namespace: &str,
        selector: &str,
        listing: &PodListing,
    ) -> anyhow::Result<NotificationStream>;
}
