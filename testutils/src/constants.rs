pub const TEST_NAMESPACE: &str = "test-namespace";
pub const TEST_POD_NAME: &str = "the-pod";
pub const TEST_POD_IP: &str = "10.0.0.1";
pub const TEST_APP_LABEL: &str = "busybox";
pub const TEST_SELECTOR: &str = "app=busybox";
pub const TEST_LIST_VERSION: &str = "42";
