mod pod_ext;

pub trait KubeResourceExt {
    fn namespaced_name(&self) -> String;
}

pub trait PodExt {
    // The pod's assigned IP; None until the pod has been scheduled and networked
    fn address(&self) -> Option<&str>;
}

#[cfg(test)]
mod tests;
