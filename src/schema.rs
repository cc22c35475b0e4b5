//! # Schema Nodes
//!
//! One [`SchemaNode`] per schema object in the resolved graph. Nodes never
//! own their children; every structural link is a [`NodeId`] into the
//! arena, so shared sub-schemas and cycles carry no ownership hazard.

use crate::graph::NodeId;
use crate::value::{is_integral, ValueKind};
use derive_more::Display;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

/// The closed set of declared schema types.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    /// Only `null` is accepted.
    #[display("null")]
    Null,
    /// `true` / `false`.
    #[display("boolean")]
    Boolean,
    /// Numeric values without a fractional part.
    #[display("integer")]
    Integer,
    /// Any numeric value.
    #[display("number")]
    Number,
    /// Text values.
    #[display("string")]
    String,
    /// Ordered sequences.
    #[display("array")]
    Array,
    /// String-keyed mappings.
    #[display("object")]
    Object,
}

impl SchemaType {
    /// Parses a declared type name.
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "null" => Some(SchemaType::Null),
            "boolean" => Some(SchemaType::Boolean),
            "integer" => Some(SchemaType::Integer),
            "number" => Some(SchemaType::Number),
            "string" => Some(SchemaType::String),
            "array" => Some(SchemaType::Array),
            "object" => Some(SchemaType::Object),
            _ => None,
        }
    }

    /// Returns true when a runtime value matches this declared type.
    pub(crate) fn matches(self, value: &Value) -> bool {
        match (self, ValueKind::of(value)) {
            (SchemaType::Null, ValueKind::Null) => true,
            (SchemaType::Boolean, ValueKind::Bool) => true,
            (SchemaType::Number, ValueKind::Number) => true,
            (SchemaType::Integer, ValueKind::Number) => match value {
                Value::Number(n) => is_integral(n),
                _ => false,
            },
            (SchemaType::String, ValueKind::String) => true,
            (SchemaType::Array, ValueKind::Array) => true,
            (SchemaType::Object, ValueKind::Object) => true,
            _ => false,
        }
    }
}

/// Policy for object keys not covered by `properties` / `patternProperties`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalProperties {
    /// No constraint (the unset default).
    #[default]
    Permit,
    /// `additionalProperties: false` -- extra keys are rejected.
    Forbid,
    /// Extra keys validate against a nested schema.
    Schema(NodeId),
}

/// Polymorphic dispatch table declared under `oneOf` / `anyOf`.
#[derive(Debug, Clone)]
pub struct Discriminator {
    /// The input property whose value selects a branch.
    pub property: String,
    /// Discriminator value -> target schema node.
    pub mapping: IndexMap<String, NodeId>,
}

/// Where a node came from, for error messages and dedup keys.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeOrigin {
    /// Source document URI; empty for the root document.
    pub document: String,
    /// JSON Pointer to the schema within its document.
    pub pointer: String,
}

impl std::fmt::Display for NodeOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.document, self.pointer)
    }
}

/// A single resolved schema object.
///
/// All child links are arena ids; the node carries only constraints that
/// the validation engine consults, plus round-tripped literals
/// (`enum`, `default`, `example`).
#[derive(Debug, Default)]
pub struct SchemaNode {
    /// Source location of this node.
    pub origin: NodeOrigin,

    /// Declared type, or `None` for "any kind".
    pub schema_type: Option<SchemaType>,
    /// Format hint; only checked when the policy registers a checker.
    pub format: Option<String>,

    /// `null` is accepted in addition to the declared type.
    pub nullable: bool,
    /// Property may only appear in responses.
    pub read_only: bool,
    /// Property may only appear in requests.
    pub write_only: bool,
    /// Informational only; never affects validation.
    pub deprecated: bool,

    /// Inclusive lower numeric bound.
    pub minimum: Option<f64>,
    /// Inclusive upper numeric bound.
    pub maximum: Option<f64>,
    /// Exclusive lower numeric bound (boolean-form exclusives are
    /// normalized into this at resolution time).
    pub exclusive_minimum: Option<f64>,
    /// Exclusive upper numeric bound.
    pub exclusive_maximum: Option<f64>,
    /// Value must be an integer multiple of this.
    pub multiple_of: Option<f64>,

    /// Minimum string length in characters.
    pub min_length: Option<u64>,
    /// Maximum string length in characters.
    pub max_length: Option<u64>,
    /// Compiled `pattern`; compilation failures surface at resolution time.
    pub pattern: Option<Regex>,

    /// Minimum array length.
    pub min_items: Option<u64>,
    /// Maximum array length.
    pub max_items: Option<u64>,
    /// Array elements must be pairwise unequal.
    pub unique_items: bool,
    /// Element schema for arrays.
    pub items: Option<NodeId>,

    /// Minimum number of object properties.
    pub min_properties: Option<u64>,
    /// Maximum number of object properties.
    pub max_properties: Option<u64>,
    /// Property names that must be present.
    pub required: Vec<String>,
    /// Declared properties, in declaration order.
    pub properties: IndexMap<String, NodeId>,
    /// Pattern-keyed properties; first declared match wins.
    pub pattern_properties: Vec<(Regex, NodeId)>,
    /// Policy for undeclared keys.
    pub additional_properties: AdditionalProperties,

    /// Every branch must accept.
    pub all_of: Vec<NodeId>,
    /// At least one branch must accept.
    pub any_of: Vec<NodeId>,
    /// Exactly one branch must accept.
    pub one_of: Vec<NodeId>,
    /// The nested schema must reject.
    pub not: Option<NodeId>,

    /// Allowed literal values; deep-equal with numeric coercion.
    pub enum_values: Vec<Value>,
    /// Round-tripped `default` literal; not validated.
    pub default_value: Option<Value>,
    /// Round-tripped `example` literal; not validated.
    pub example: Option<Value>,

    /// Branch dispatch for `oneOf` / `anyOf`.
    pub discriminator: Option<Discriminator>,
}

impl SchemaNode {
    /// Returns true when `null` satisfies this node.
    pub(crate) fn accepts_null(&self) -> bool {
        self.nullable || self.schema_type == Some(SchemaType::Null)
    }

    /// Returns true when the node declares any combinator.
    pub(crate) fn has_combinators(&self) -> bool {
        !self.all_of.is_empty()
            || !self.any_of.is_empty()
            || !self.one_of.is_empty()
            || self.not.is_some()
    }
}
