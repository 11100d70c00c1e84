//! Typed navigation over loosely-typed property trees.
//!
//! A [`Proxy`] wraps either a node of a `serde_json::Value` tree or the located
//! error that stopped navigation. Coercions widen numbers, parse strings and
//! keep the breadcrumb of the offending node. A [`Drain`] lets extraction code
//! read many fields in a row and report every failure in one error.

#![forbid(unsafe_code)]

mod drain;
mod error;
mod value;

pub use drain::{Drain, DrainError};
pub use error::{is_error_code, ErrorCode, ProxyError, ValueType};
pub use value::{default, Proxy, ProxySet};
