mod handler_test;
mod kube_source_test;

use futures::stream;
use futures::StreamExt;
use pf_core::errors::*;
use pf_core::prelude::*;
use pf_testutils::*;
use rstest::*;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::fanout::Fanout;
use crate::source::MockPodSource;

fn modified(name: &str, address: &str) -> Notification {
    Notification::new(ChangeKind::Modified, PodSnapshot::new(name, address))
}

fn added(name: &str, address: &str) -> Notification {
    Notification::new(ChangeKind::Added, PodSnapshot::new(name, address))
}

fn deleted(name: &str, address: &str) -> Notification {
    Notification::new(ChangeKind::Deleted, PodSnapshot::new(name, address))
}

// Drain a subscriber until the monitor closes it
async fn collect(mut rx: EventReceiver) -> Vec<PodEvent> {
    let mut events = vec![];
    while let Some(evt) = rx.recv().await {
        events.push(evt);
    }
    events
}
