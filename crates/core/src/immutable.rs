//! Properties that cannot change in place; changing one replaces the resource.

use cfnmkr_proxy::Proxy;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immutable {
    /// Only the listed JSON pointers.
    Paths(&'static [&'static str]),
    /// Any property change.
    All,
}

/// Resource kinds (without `Custom::`) and their immutable properties.
pub const TABLE: &[(&str, Immutable)] = &[
    ("Monitor", Immutable::Paths(&["/Type"])),
    ("Role", Immutable::Paths(&["/Name", "/Service"])),
    ("Service", Immutable::Paths(&["/Name"])),
    ("User", Immutable::Paths(&["/Email"])),
    ("NotificationChannel", Immutable::All),
    ("AWSIntegrationExternalId", Immutable::All),
];

pub fn lookup(kind: &str) -> Option<Immutable> { TABLE.iter().find(|(k, _)| *k == kind).map(|(_, i)| *i) }

/// True when moving from `old` to `new` properties forces a new remote entity.
pub fn requires_replacement(kind: &str, new: &Value, old: &Value) -> bool {
    match lookup(kind) {
        None => false,
        Some(Immutable::All) => without_token(new) != without_token(old),
        Some(Immutable::Paths(paths)) => {
            let (n, o) = (Proxy::new(new), Proxy::new(old));
            paths.iter().any(|p| n.p(p).value().ok() != o.p(p).value().ok())
        }
    }
}

/// Property names that changed between `old` and `new`, sorted.
pub fn changed_properties(new: &Value, old: &Value) -> Vec<String> {
    let (n, o) = (without_token(new), without_token(old));
    let mut keys: Vec<String> = n.keys().chain(o.keys()).filter(|k| n.get(*k) != o.get(*k)).cloned().collect();
    keys.sort();
    keys.dedup();
    keys
}

// ServiceToken names the bridge itself, not the resource.
fn without_token(v: &Value) -> serde_json::Map<String, Value> {
    let mut m = v.as_object().cloned().unwrap_or_default();
    m.remove("ServiceToken");
    m
}
