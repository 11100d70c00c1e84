use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::{ErrorCode, ProxyError, ValueType};

/// Handle over one node of a property tree, or over the failure that stopped navigation.
///
/// Navigating through an error proxy yields the same error, so a chain such as
/// `p.m("Graph").m("Host").string()` reports the first failing step with its breadcrumb.
#[derive(Debug, Clone, PartialEq)]
pub enum Proxy<'a> {
    Value { node: Cow<'a, Value>, address: String },
    Error(ProxyError),
}

impl<'a> Proxy<'a> {
    pub fn new(root: &'a Value) -> Self { Proxy::Value { node: Cow::Borrowed(root), address: String::new() } }

    pub fn owned(root: Value) -> Proxy<'static> { Proxy::Value { node: Cow::Owned(root), address: String::new() } }

    pub fn address(&self) -> &str {
        match self {
            Proxy::Value { address, .. } => address,
            Proxy::Error(e) => e.address(),
        }
    }

    pub fn error(&self) -> Option<&ProxyError> {
        match self {
            Proxy::Error(e) => Some(e),
            Proxy::Value { .. } => None,
        }
    }

    pub fn is_error(&self, code: ErrorCode) -> bool { self.error().map(|e| e.code() == code).unwrap_or(false) }

    pub fn is_nil(&self) -> bool { matches!(self, Proxy::Value { node, .. } if node.is_null()) }

    pub fn value(&self) -> Result<&Value, ProxyError> { self.node().map(|(v, _)| v) }

    fn node(&self) -> Result<(&Value, &str), ProxyError> {
        match self {
            Proxy::Value { node, address } => Ok((node.as_ref(), address.as_str())),
            Proxy::Error(e) => Err(e.clone()),
        }
    }

    fn descend<F>(&self, pick: F) -> Proxy<'a>
    where
        F: for<'n> FnOnce(&'n Value, &str) -> Result<(&'n Value, String), ProxyError>,
    {
        match self {
            Proxy::Error(_) => self.clone(),
            Proxy::Value { node: Cow::Borrowed(v), address } => match pick(*v, address) {
                Ok((child, address)) => Proxy::Value { node: Cow::Borrowed(child), address },
                Err(e) => Proxy::Error(e),
            },
            Proxy::Value { node: Cow::Owned(v), address } => match pick(v, address) {
                Ok((child, address)) => Proxy::Value { node: Cow::Owned(child.clone()), address },
                Err(e) => Proxy::Error(e),
            },
        }
    }

    /// Child stored under `key`.
    pub fn m(&self, key: &str) -> Proxy<'a> {
        self.descend(|v, address| match v {
            Value::Object(map) => {
                let label = format!("{}.{}", address, key);
                match map.get(key) {
                    Some(child) => Ok((child, label)),
                    None => Err(ProxyError::NotFound { address: label }),
                }
            }
            other => Err(ProxyError::mismatch(ValueType::Map, other, address)),
        })
    }

    /// Element at `index`.
    pub fn a(&self, index: usize) -> Proxy<'a> {
        self.descend(|v, address| match v {
            Value::Array(items) => {
                let label = format!("{}[{}]", address, index);
                match items.get(index) {
                    Some(child) => Ok((child, label)),
                    None => Err(ProxyError::NotFound { address: label }),
                }
            }
            other => Err(ProxyError::mismatch(ValueType::Array, other, address)),
        })
    }

    /// JSON-pointer style traversal (`/Widgets/0/Layout`).
    pub fn p(&self, pointer: &str) -> Proxy<'a> {
        if self.error().is_some() || pointer.is_empty() {
            return self.clone();
        }
        let Some(rest) = pointer.strip_prefix('/') else {
            return Proxy::Error(ProxyError::InvalidQuery {
                info: format!("{:?} does not start with '/'", pointer),
                address: self.address().to_string(),
            });
        };
        let mut cur = self.clone();
        for raw in rest.split('/') {
            let Some(token) = unescape_token(raw) else {
                return Proxy::Error(ProxyError::InvalidQuery {
                    info: format!("invalid escape in {:?}", raw),
                    address: cur.address().to_string(),
                });
            };
            cur = cur.token(&token);
            if cur.error().is_some() { break; }
        }
        cur
    }

    fn token(&self, token: &str) -> Proxy<'a> {
        let (v, address) = match self.node() {
            Ok(n) => n,
            Err(e) => return Proxy::Error(e),
        };
        match v {
            Value::Object(_) => self.m(token),
            Value::Array(_) => match token.parse::<usize>() {
                Ok(n) => self.a(n),
                Err(e) => Proxy::Error(ProxyError::InvalidIndex {
                    info: format!("parsing {:?}: {}", token, e),
                    address: address.to_string(),
                }),
            },
            other => Proxy::Error(ProxyError::NotMapOrArray { actual: ValueType::of(other), address: address.to_string() }),
        }
    }

    /// Every element of a sequence as its own proxy.
    pub fn proxy_set(&self) -> ProxySet<'a> {
        let (v, address) = match self.node() {
            Ok(n) => n,
            Err(e) => return ProxySet::failed(e),
        };
        match v {
            Value::Array(items) => {
                let proxies = (0..items.len()).map(|i| self.a(i)).collect();
                ProxySet { items: Ok(proxies), address: address.to_string() }
            }
            other => ProxySet::failed(ProxyError::mismatch(ValueType::Array, other, address)),
        }
    }

    /// Every value stored under `key` anywhere below this node, depth first.
    pub fn q(&self, key: &str) -> ProxySet<'a> {
        let base = format!("{}..{}", self.address(), key);
        let label = |i: usize| format!("{}[{}]", base, i);
        let items = match self {
            Proxy::Error(e) => return ProxySet::failed(e.clone()),
            Proxy::Value { node: Cow::Borrowed(v), .. } => {
                let mut found = Vec::new();
                find_all(*v, key, &mut found);
                found.into_iter().enumerate().map(|(i, n)| Proxy::Value { node: Cow::Borrowed(n), address: label(i) }).collect()
            }
            Proxy::Value { node: Cow::Owned(v), .. } => {
                let mut found = Vec::new();
                find_all(v, key, &mut found);
                found.into_iter().enumerate().map(|(i, n)| Proxy::Value { node: Cow::Owned(n.clone()), address: label(i) }).collect()
            }
        };
        ProxySet { items: Ok(items), address: base }
    }

    pub fn bool(&self) -> Result<bool, ProxyError> {
        let (v, address) = self.node()?;
        match v {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.as_i64().map(|i| i != 0).unwrap_or(true)),
            Value::String(s) => parse_bool(s).ok_or_else(|| ProxyError::convert(format!("parsing {:?}: invalid syntax", s), address)),
            other => Err(ProxyError::mismatch(ValueType::Bool, other, address)),
        }
    }

    pub fn int64(&self) -> Result<i64, ProxyError> {
        let (v, address) = self.node()?;
        match v {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i)
                } else if n.is_u64() {
                    Err(ProxyError::convert("overflow", address))
                } else {
                    Ok(n.as_f64().map(|f| f as i64).unwrap_or_default())
                }
            }
            Value::String(s) => s.parse::<i64>().map_err(|e| ProxyError::convert(format!("parsing {:?}: {}", s, e), address)),
            other => Err(ProxyError::mismatch(ValueType::Int64, other, address)),
        }
    }

    pub fn uint64(&self) -> Result<u64, ProxyError> {
        let (v, address) = self.node()?;
        match v {
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(u)
                } else if n.is_i64() {
                    Err(ProxyError::convert("overflow", address))
                } else {
                    let f = n.as_f64().unwrap_or(-1.0);
                    if (0.0..U64_LIMIT).contains(&f) {
                        Ok(f as u64)
                    } else {
                        Err(ProxyError::convert("overflow", address))
                    }
                }
            }
            Value::String(s) => s.parse::<u64>().map_err(|e| ProxyError::convert(format!("parsing {:?}: {}", s, e), address)),
            other => Err(ProxyError::mismatch(ValueType::Uint64, other, address)),
        }
    }

    pub fn float64(&self) -> Result<f64, ProxyError> {
        let (v, address) = self.node()?;
        match v {
            Value::Number(n) => Ok(n.as_f64().unwrap_or_default()),
            Value::String(s) => s.parse::<f64>().map_err(|e| ProxyError::convert(format!("parsing {:?}: {}", s, e), address)),
            other => Err(ProxyError::mismatch(ValueType::Float64, other, address)),
        }
    }

    pub fn string(&self) -> Result<String, ProxyError> {
        let (v, address) = self.node()?;
        match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(ProxyError::mismatch(ValueType::String, other, address)),
        }
    }

    pub fn optional_bool(&self) -> Result<Option<bool>, ProxyError> { optional(self.bool()) }
    pub fn optional_int64(&self) -> Result<Option<i64>, ProxyError> { optional(self.int64()) }
    pub fn optional_uint64(&self) -> Result<Option<u64>, ProxyError> { optional(self.uint64()) }
    pub fn optional_float64(&self) -> Result<Option<f64>, ProxyError> { optional(self.float64()) }
    pub fn optional_string(&self) -> Result<Option<String>, ProxyError> { optional(self.string()) }

    pub fn array(&self) -> Result<&[Value], ProxyError> {
        let (v, address) = self.node()?;
        match v {
            Value::Array(items) => Ok(items.as_slice()),
            other => Err(ProxyError::mismatch(ValueType::Array, other, address)),
        }
    }

    pub fn map(&self) -> Result<&Map<String, Value>, ProxyError> {
        let (v, address) = self.node()?;
        match v {
            Value::Object(map) => Ok(map),
            other => Err(ProxyError::mismatch(ValueType::Map, other, address)),
        }
    }

    pub fn bool_array(&self) -> Result<Vec<bool>, ProxyError> { self.proxy_set().bool_array() }
    pub fn int64_array(&self) -> Result<Vec<i64>, ProxyError> { self.proxy_set().int64_array() }
    pub fn float64_array(&self) -> Result<Vec<f64>, ProxyError> { self.proxy_set().float64_array() }
    pub fn string_array(&self) -> Result<Vec<String>, ProxyError> { self.proxy_set().string_array() }
}

/// Proxy over `fallback` when `p` failed with `NotFound`; any other outcome passes through.
pub fn default<'a>(p: Proxy<'a>, fallback: impl Into<Value>) -> Proxy<'a> {
    match p {
        Proxy::Error(ProxyError::NotFound { address }) => Proxy::Value { node: Cow::Owned(fallback.into()), address },
        other => other,
    }
}

/// The elements of a sequence, each addressable by its index.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxySet<'a> {
    items: Result<Vec<Proxy<'a>>, ProxyError>,
    address: String,
}

impl<'a> ProxySet<'a> {
    fn failed(e: ProxyError) -> Self {
        let address = e.address().to_string();
        Self { items: Err(e), address }
    }

    pub fn error(&self) -> Option<&ProxyError> { self.items.as_ref().err() }

    pub fn len(&self) -> usize { self.items.as_ref().map(|v| v.len()).unwrap_or(0) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn a(&self, index: usize) -> Proxy<'a> {
        match &self.items {
            Ok(items) => items.get(index).cloned().unwrap_or_else(|| {
                Proxy::Error(ProxyError::NotFound { address: format!("{}[{}]", self.address, index) })
            }),
            Err(e) => Proxy::Error(e.clone()),
        }
    }

    pub fn proxies(self) -> Result<Vec<Proxy<'a>>, ProxyError> { self.items }

    fn collect<T>(&self, f: impl Fn(&Proxy<'a>) -> Result<T, ProxyError>) -> Result<Vec<T>, ProxyError> {
        match &self.items {
            Ok(items) => items.iter().map(f).collect(),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn bool_array(&self) -> Result<Vec<bool>, ProxyError> { self.collect(|p| p.bool()) }
    pub fn int64_array(&self) -> Result<Vec<i64>, ProxyError> { self.collect(|p| p.int64()) }
    pub fn float64_array(&self) -> Result<Vec<f64>, ProxyError> { self.collect(|p| p.float64()) }
    pub fn string_array(&self) -> Result<Vec<String>, ProxyError> { self.collect(|p| p.string()) }
}

const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

fn optional<T>(r: Result<T, ProxyError>) -> Result<Option<T>, ProxyError> {
    match r {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn unescape_token(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return None,
        }
    }
    Some(out)
}

fn find_all<'n>(v: &'n Value, key: &str, out: &mut Vec<&'n Value>) {
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                if k == key { out.push(child); }
                find_all(child, key, out);
            }
        }
        Value::Array(items) => {
            for child in items { find_all(child, key, out); }
        }
        _ => {}
    }
}
