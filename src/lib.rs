#![deny(missing_docs)]

//! # OAS Graph
//!
//! Reference resolution and schema validation for OpenAPI-style interface
//! description documents. A [`resolver::Resolver`] lowers a document
//! (YAML or JSON, single- or multi-file, cyclic or not) into an arena of
//! fully linked schema nodes; [`validate::validate`] then checks runtime
//! values against any node under a configurable [`policy::ValidationPolicy`].

/// Shared error types.
pub mod error;

/// Runtime value kinds and equality.
pub mod value;

/// `$ref` string and JSON Pointer utilities.
mod refs;

/// The arena-backed schema graph.
pub mod graph;

/// Resolved schema nodes and their constraint fields.
pub mod schema;

/// Document-to-graph reference resolution.
pub mod resolver;

/// Non-schema referenceable components.
pub mod components;

/// Validation configuration.
pub mod policy;

/// The schema validation engine.
pub mod validate;

pub use components::{Header, Parameter, RequestBody, Response};
pub use error::{AppError, AppResult, ReferenceError, ReferenceErrorKind};
pub use graph::{NodeId, SchemaGraph};
pub use policy::{FormatCheck, ValidationContext, ValidationPolicy, DEFAULT_MAX_DEPTH};
pub use resolver::{Resolver, RetrieveFn};
pub use schema::{
    AdditionalProperties, Discriminator, NodeOrigin, SchemaNode, SchemaType,
};
pub use validate::{validate, FailureKind, ValidationFailure};
pub use value::ValueKind;
