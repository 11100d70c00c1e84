//! Shared records for the Mackerel custom resource bridge.
//!
//! CloudFormation request/response documents, physical id codec, tag list
//! codec, the immutable-property table and the per-invocation context.

#![forbid(unsafe_code)]

pub mod context;
pub mod event;
pub mod id;
pub mod immutable;
pub mod tags;

pub use context::Invocation;
pub use event::{stack_name, Event, Outputs, RequestType, Response, StackMetadata, Status, ERROR_ID_PREFIX, RESOURCE_TYPE_PREFIX};
pub use id::{IdCodec, IdError, IdKind};
pub use tags::{Tag, TagError};
