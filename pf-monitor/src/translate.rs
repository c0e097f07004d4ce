use crate::event::{
    ChangeKind,
    Notification,
    PodEvent,
};

/// Map one raw notification onto at most one [`PodEvent`].
///
/// Adds and modifications only turn into an upsert once the pod has an address; deletions always
/// turn into a removal.  Everything else (bookmarks, watch errors) is dropped.
pub fn translate(notification: &Notification) -> Option<PodEvent> {
    let pod = &notification.pod;
    match notification.kind {
        ChangeKind::Added | ChangeKind::Modified if pod.address.is_empty() => None,
        ChangeKind::Added | ChangeKind::Modified => Some(PodEvent::upsert(&pod.name, &pod.address)),
        ChangeKind::Deleted => Some(PodEvent::removed(&pod.name)),
        ChangeKind::Bookmark | ChangeKind::Error => None,
    }
}
