use super::*;
use crate::prelude::*;

impl<T: kube::Resource> KubeResourceExt for T {
    fn namespaced_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any(),
        }
    }
}

impl PodExt for corev1::Pod {
    // The apiserver reports an unassigned IP either by omitting the field or by leaving it blank
    fn address(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.pod_ip.as_deref())
            .filter(|ip| !ip.is_empty())
    }
}
