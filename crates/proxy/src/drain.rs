use std::fmt;

use serde_json::{Map, Value};

use crate::value::{Proxy, ProxySet};

/// Collects every failure of one extraction pass.
///
/// Extract methods return the zero value when the proxy fails and remember the
/// error; [`Drain::combine_errors`] then reports all of them at once.
#[derive(Debug, Default)]
pub struct Drain {
    errors: Vec<anyhow::Error>,
}

/// All failures recorded by a [`Drain`], rendered as one `; `-separated message.
#[derive(Debug)]
pub struct DrainError {
    errors: Vec<anyhow::Error>,
}

impl DrainError {
    pub fn errors(&self) -> &[anyhow::Error] { &self.errors }
}

impl fmt::Display for DrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 { f.write_str("; ")?; }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for DrainError {}

impl Drain {
    pub fn new() -> Self { Self::default() }

    pub fn put<E: Into<anyhow::Error>>(&mut self, err: E) { self.errors.push(err.into()); }

    /// Record the error side of `r`, if any, and hand back the value.
    pub fn check<T, E: Into<anyhow::Error>>(&mut self, r: Result<T, E>) -> Option<T> {
        match r {
            Ok(v) => Some(v),
            Err(e) => {
                self.put(e);
                None
            }
        }
    }

    pub fn has(&self) -> bool { !self.errors.is_empty() }

    pub fn len(&self) -> usize { self.errors.len() }

    pub fn is_empty(&self) -> bool { self.errors.is_empty() }

    pub fn combine_errors(&mut self) -> Result<(), DrainError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(DrainError { errors: std::mem::take(&mut self.errors) })
    }

    fn take<T: Default, E: Into<anyhow::Error>>(&mut self, r: Result<T, E>) -> T { self.check(r).unwrap_or_default() }

    pub fn bool(&mut self, p: &Proxy<'_>) -> bool { self.take(p.bool()) }
    pub fn int64(&mut self, p: &Proxy<'_>) -> i64 { self.take(p.int64()) }
    pub fn uint64(&mut self, p: &Proxy<'_>) -> u64 { self.take(p.uint64()) }
    pub fn float64(&mut self, p: &Proxy<'_>) -> f64 { self.take(p.float64()) }
    pub fn string(&mut self, p: &Proxy<'_>) -> String { self.take(p.string()) }

    pub fn optional_bool(&mut self, p: &Proxy<'_>) -> Option<bool> { self.take(p.optional_bool()) }
    pub fn optional_int64(&mut self, p: &Proxy<'_>) -> Option<i64> { self.take(p.optional_int64()) }
    pub fn optional_uint64(&mut self, p: &Proxy<'_>) -> Option<u64> { self.take(p.optional_uint64()) }
    pub fn optional_float64(&mut self, p: &Proxy<'_>) -> Option<f64> { self.take(p.optional_float64()) }
    pub fn optional_string(&mut self, p: &Proxy<'_>) -> Option<String> { self.take(p.optional_string()) }

    pub fn array(&mut self, p: &Proxy<'_>) -> Vec<Value> { self.take(p.array().map(|a| a.to_vec())) }
    pub fn map(&mut self, p: &Proxy<'_>) -> Map<String, Value> { self.take(p.map().map(|m| m.clone())) }

    pub fn bool_array(&mut self, set: &ProxySet<'_>) -> Vec<bool> { self.take(set.bool_array()) }
    pub fn int64_array(&mut self, set: &ProxySet<'_>) -> Vec<i64> { self.take(set.int64_array()) }
    pub fn float64_array(&mut self, set: &ProxySet<'_>) -> Vec<f64> { self.take(set.float64_array()) }
    pub fn string_array(&mut self, set: &ProxySet<'_>) -> Vec<String> { self.take(set.string_array()) }

    pub fn proxy_array<'a>(&mut self, set: ProxySet<'a>) -> Vec<Proxy<'a>> { self.take(set.proxies()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::default;
    use serde_json::json;

    #[test]
    fn empty_drain_combines_to_ok() {
        let v = json!({"Name": "x", "Count": "3"});
        let p = Proxy::new(&v);
        let mut d = Drain::new();
        assert_eq!(d.string(&p.m("Name")), "x");
        assert_eq!(d.uint64(&p.m("Count")), 3);
        assert!(d.combine_errors().is_ok());
    }

    #[test]
    fn every_failure_is_reported() {
        let v = json!({"Name": 1, "Layout": {"X": -1}});
        let p = Proxy::new(&v);
        let mut d = Drain::new();
        assert_eq!(d.string(&p.m("Name")), "");
        assert_eq!(d.uint64(&p.m("Layout").m("X")), 0);
        assert_eq!(d.string(&p.m("Title")), "");
        d.put(anyhow::anyhow!("unknown widget type: pie"));
        assert_eq!(d.len(), 4);
        let err = d.combine_errors().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not matched types: expected=string actual=int64: .Name"), "msg={}", msg);
        assert!(msg.contains("convert error: overflow: .Layout.X"), "msg={}", msg);
        assert!(msg.contains("not found: .Title"), "msg={}", msg);
        assert!(msg.contains("unknown widget type: pie"), "msg={}", msg);
        assert_eq!(err.errors().len(), 4);
        assert!(!d.has());
    }

    #[test]
    fn optional_reads_do_not_record_missing() {
        let v = json!({});
        let p = Proxy::new(&v);
        let mut d = Drain::new();
        assert_eq!(d.optional_float64(&p.m("Warning")), None);
        assert_eq!(d.optional_string(&p.m("Service")), None);
        assert!(d.is_empty());
    }

    #[test]
    fn arrays_through_drain() {
        let v = json!({"Roles": ["a", "b"], "Bad": [1, "x"]});
        let p = Proxy::new(&v);
        let mut d = Drain::new();
        assert_eq!(d.string_array(&p.m("Roles").proxy_set()), vec!["a", "b"]);
        assert!(d.int64_array(&p.m("Bad").proxy_set()).is_empty());
        assert_eq!(d.proxy_array(default(p.m("Missing"), json!([])).proxy_set()).len(), 0);
        assert_eq!(d.proxy_array(p.m("Roles").proxy_set()).len(), 2);
        assert_eq!(d.len(), 1);
        assert_eq!(d.check(p.m("Roles").a(1).string()), Some("b".to_string()));
    }
}
