use std::fmt;

use pf_core::prelude::*;

// How the watch source classified a raw notification.  Bookmarks and errors carry no pod; they
// exist so the source can pass them through without the translator having to care.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

/// The bits of a pod the monitor cares about; `address` is empty until the pod has an IP.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PodSnapshot {
    pub name: String,
    pub address: String,
}

impl PodSnapshot {
    pub fn new(name: &str, address: &str) -> PodSnapshot {
        PodSnapshot { name: name.into(), address: address.into() }
    }

    // Returns None for pods with no name; those can't be identified downstream so they're dropped.
    pub fn from_pod(pod: &corev1::Pod) -> Option<PodSnapshot> {
        let name = pod.metadata.name.as_deref().filter(|n| !n.is_empty())?;
        Some(PodSnapshot::new(name, pod.address().unwrap_or_default()))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub kind: ChangeKind,
    pub pod: PodSnapshot,
}

impl Notification {
    pub fn new(kind: ChangeKind, pod: PodSnapshot) -> Notification {
        Notification { kind, pod }
    }

    pub fn bookmark() -> Notification {
        Notification::new(ChangeKind::Bookmark, PodSnapshot::default())
    }

    pub fn error() -> Notification {
        Notification::new(ChangeKind::Error, PodSnapshot::default())
    }
}

/// A normalized pod lifecycle event, as delivered to subscribers.
///
/// A pod produces an `Upsert` every time it's created or modified while it has an address, and at
/// most one `Removed` when it leaves the watched set.  `Removed` is sent even if the monitor never
/// saw an address for the pod, so consumers should tolerate removals for names they don't know.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum PodEvent {
    Upsert { name: String, address: String },
    Removed { name: String },
}

impl PodEvent {
    pub fn upsert(name: &str, address: &str) -> PodEvent {
        PodEvent::Upsert { name: name.into(), address: address.into() }
    }

    pub fn removed(name: &str) -> PodEvent {
        PodEvent::Removed { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            PodEvent::Upsert { name, .. } | PodEvent::Removed { name } => name,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, PodEvent::Removed { .. })
    }
}

impl fmt::Display for PodEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodEvent::Upsert { name, address } => write!(f, "upsert {name} ({address})"),
            PodEvent::Removed { name } => write!(f, "removed {name}"),
        }
    }
}
