#![cfg_attr(coverage, feature(coverage_attribute))]
mod config;
mod event;
mod fanout;
mod handler;
mod kube_source;
mod monitor;
mod selector;
mod source;
mod translate;

pub use crate::config::MonitorConfig;
pub use crate::event::{
    ChangeKind,
    Notification,
    PodEvent,
    PodSnapshot,
};
pub use crate::fanout::EventReceiver;
pub use crate::handler::{
    PodEventHandler,
    dispatch,
};
pub use crate::kube_source::KubePodSource;
pub use crate::monitor::{
    Monitor,
    MonitorError,
    MonitorHandle,
};
pub use crate::selector::Selector;
#[cfg(feature = "mock")]
pub use crate::source::MockPodSource;
pub use crate::source::{
    NotificationStream,
    PodListing,
    PodSource,
};
pub use crate::translate::translate;

#[cfg(test)]
mod tests;
