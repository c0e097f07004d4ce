// Buffer size for each subscriber's event channel; a full buffer blocks the monitor rather than
// dropping events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

// Resource version used to open a watch when the apiserver didn't hand one back from the listing
pub const DEFAULT_WATCH_VERSION: &str = "0";

// Env vars
pub const KUBECONFIG_ENV_VAR: &str = "KUBECONFIG";
