// Build an Option<BTreeMap> of labels or annotations the way k8s-openapi object metadata wants them
#[macro_export]
macro_rules! klabel {
    ($($key:expr => $val:expr),+$(,)?) => {
        Some(::std::collections::BTreeMap::from([$(($key.to_string(), $val.to_string())),+]))
    };
}

pub use klabel;
