//! # Schema Validation Engine
//!
//! Recursive descent over (schema node, value) pairs. Each call is a pure
//! function of the node, the value and the policy; the graph is never
//! mutated, so one resolved graph can serve concurrent validations.
//!
//! Failures accumulate: the caller receives every violation found, in
//! traversal order, except for the depth guard which aborts the whole
//! call (it signals a structural problem, not a data problem).

use crate::graph::{NodeId, SchemaGraph};
use crate::policy::{ValidationContext, ValidationPolicy};
use crate::refs::escape_pointer_segment;
use crate::schema::{AdditionalProperties, SchemaNode};
use crate::value::{values_equal, ValueKind};
use derive_more::Display;
use serde_json::Value;

/// What went wrong at one location.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Value kind does not match the declared type (or null where
    /// nullability is not declared).
    TypeMismatch,
    /// A `readOnly` property appeared in a request.
    ReadOnlyViolation,
    /// A `writeOnly` property appeared in a response.
    WriteOnlyViolation,
    /// Value is not a member of the declared `enum`.
    EnumMismatch,
    /// A registered format checker rejected the value.
    FormatViolation,
    /// Numeric bound violated.
    RangeViolation,
    /// Value is not a multiple of `multipleOf`.
    MultipleOfViolation,
    /// String length bound violated.
    LengthViolation,
    /// String does not match `pattern`.
    PatternViolation,
    /// Array length bound violated.
    ItemCountViolation,
    /// `uniqueItems` violated.
    UniquenessViolation,
    /// Object property-count bound violated.
    PropertyCountViolation,
    /// A `required` property is absent.
    RequiredPropertyMissing,
    /// A key was rejected by `additionalProperties: false`.
    UnexpectedProperty,
    /// No `anyOf` branch accepted the value.
    AnyOfMismatch,
    /// `oneOf` matched zero branches, or more than one.
    OneOfMismatch,
    /// The `not` schema accepted the value.
    NotMismatch,
    /// The discriminator property's value has no mapping entry.
    DiscriminatorMappingMissing,
    /// Recursion exceeded the policy's depth bound.
    DepthExceeded,
}

/// One validation failure, locatable on both sides: where in the value,
/// and which schema node objected.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{kind} at value '{value_path}' (schema {schema_path}): {message}")]
pub struct ValidationFailure {
    /// JSON-Pointer-style path into the validated value.
    pub value_path: String,
    /// Origin of the schema node that produced the failure.
    pub schema_path: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

/// Validates a value against a resolved schema node.
///
/// Returns `Ok(())` on acceptance, otherwise the complete ordered list of
/// failures. Never panics on any input; pathological recursion is cut off
/// by `policy.max_depth` with a single [`FailureKind::DepthExceeded`].
pub fn validate(
    graph: &SchemaGraph,
    node: NodeId,
    value: &Value,
    policy: &ValidationPolicy,
) -> Result<(), Vec<ValidationFailure>> {
    let engine = Engine { graph, policy };
    match engine.validate_node(node, value, "", 0) {
        Ok(failures) if failures.is_empty() => Ok(()),
        Ok(failures) => Err(failures),
        Err(aborted) => Err(vec![aborted]),
    }
}

struct Engine<'a> {
    graph: &'a SchemaGraph,
    policy: &'a ValidationPolicy,
}

/// `Err` carries the abort-immediately depth failure; ordinary failures
/// ride in the `Ok` vector.
type StepResult = Result<Vec<ValidationFailure>, ValidationFailure>;

impl Engine<'_> {
    fn validate_node(&self, id: NodeId, value: &Value, path: &str, depth: usize) -> StepResult {
        let node = self.graph.node(id);
        if depth > self.policy.max_depth {
            return Err(fail(
                node,
                FailureKind::DepthExceeded,
                path,
                format!("recursion exceeded the depth bound of {}", self.policy.max_depth),
            ));
        }

        let mut failures = Vec::new();

        // 1. Context gating: presence is the violation, not the content,
        // so this fires before the null and type checks can bail out.
        if node.read_only
            && self.policy.enforce_read_only
            && self.policy.context == ValidationContext::Request
        {
            failures.push(fail(
                node,
                FailureKind::ReadOnlyViolation,
                path,
                "readOnly property must not appear in a request".to_string(),
            ));
        }
        if node.write_only
            && self.policy.enforce_write_only
            && self.policy.context == ValidationContext::Response
        {
            failures.push(fail(
                node,
                FailureKind::WriteOnlyViolation,
                path,
                "writeOnly property must not appear in a response".to_string(),
            ));
        }

        // 2. Nullability.
        if value.is_null() {
            if !node.accepts_null() {
                failures.push(fail(
                    node,
                    FailureKind::TypeMismatch,
                    path,
                    "null is not allowed here".to_string(),
                ));
            }
            return Ok(failures);
        }

        // 3. Declared type. A mismatch makes the remaining constraints
        // meaningless, so it short-circuits this node.
        if let Some(declared) = node.schema_type {
            if !declared.matches(value) {
                failures.push(fail(
                    node,
                    FailureKind::TypeMismatch,
                    path,
                    format!("expected {}, found {}", declared, ValueKind::of(value)),
                ));
                return Ok(failures);
            }
        }

        // 4. Enum membership.
        if !node.enum_values.is_empty()
            && !node.enum_values.iter().any(|member| values_equal(member, value))
        {
            failures.push(fail(
                node,
                FailureKind::EnumMismatch,
                path,
                "value is not one of the enumerated members".to_string(),
            ));
        }

        // 5. Format, when the caller registered a checker for it.
        if let (Some(format), Value::String(s)) = (&node.format, value) {
            if let Some(check) = self.policy.formats.get(format) {
                if !check(s) {
                    failures.push(fail(
                        node,
                        FailureKind::FormatViolation,
                        path,
                        format!("value does not satisfy format '{}'", format),
                    ));
                }
            }
        }

        // 6. Kind-specific constraints and structural recursion.
        match value {
            Value::Number(n) => self.check_number(node, n, path, &mut failures),
            Value::String(s) => self.check_string(node, s, path, &mut failures),
            Value::Array(items) => {
                self.check_array(node, items, path, depth, &mut failures)?
            }
            Value::Object(map) => {
                self.check_object(node, map, path, depth, &mut failures)?
            }
            Value::Bool(_) | Value::Null => {}
        }

        // 7/8. Combinators, with discriminator dispatch.
        if node.has_combinators() {
            self.check_combinators(node, value, path, depth, &mut failures)?;
        }

        Ok(failures)
    }

    fn check_number(
        &self,
        node: &SchemaNode,
        n: &serde_json::Number,
        path: &str,
        failures: &mut Vec<ValidationFailure>,
    ) {
        let Some(x) = n.as_f64() else {
            return;
        };

        if let Some(min) = node.minimum {
            if x < min {
                failures.push(fail(
                    node,
                    FailureKind::RangeViolation,
                    path,
                    format!("{} is below the minimum of {}", x, min),
                ));
            }
        }
        if let Some(max) = node.maximum {
            if x > max {
                failures.push(fail(
                    node,
                    FailureKind::RangeViolation,
                    path,
                    format!("{} is above the maximum of {}", x, max),
                ));
            }
        }
        if let Some(min) = node.exclusive_minimum {
            if x <= min {
                failures.push(fail(
                    node,
                    FailureKind::RangeViolation,
                    path,
                    format!("{} is not above the exclusive minimum of {}", x, min),
                ));
            }
        }
        if let Some(max) = node.exclusive_maximum {
            if x >= max {
                failures.push(fail(
                    node,
                    FailureKind::RangeViolation,
                    path,
                    format!("{} is not below the exclusive maximum of {}", x, max),
                ));
            }
        }
        if let Some(step) = node.multiple_of {
            let quotient = x / step;
            if (quotient - quotient.round()).abs() > 1e-9 {
                failures.push(fail(
                    node,
                    FailureKind::MultipleOfViolation,
                    path,
                    format!("{} is not a multiple of {}", x, step),
                ));
            }
        }
    }

    fn check_string(
        &self,
        node: &SchemaNode,
        s: &str,
        path: &str,
        failures: &mut Vec<ValidationFailure>,
    ) {
        // Length bounds count characters, not bytes.
        let length = s.chars().count() as u64;
        if let Some(min) = node.min_length {
            if length < min {
                failures.push(fail(
                    node,
                    FailureKind::LengthViolation,
                    path,
                    format!("length {} is below minLength {}", length, min),
                ));
            }
        }
        if let Some(max) = node.max_length {
            if length > max {
                failures.push(fail(
                    node,
                    FailureKind::LengthViolation,
                    path,
                    format!("length {} is above maxLength {}", length, max),
                ));
            }
        }
        if let Some(pattern) = &node.pattern {
            // Unanchored match, as JSON Schema specifies.
            if !pattern.is_match(s) {
                failures.push(fail(
                    node,
                    FailureKind::PatternViolation,
                    path,
                    format!("value does not match pattern '{}'", pattern.as_str()),
                ));
            }
        }
    }

    fn check_array(
        &self,
        node: &SchemaNode,
        items: &[Value],
        path: &str,
        depth: usize,
        failures: &mut Vec<ValidationFailure>,
    ) -> Result<(), ValidationFailure> {
        let count = items.len() as u64;
        if let Some(min) = node.min_items {
            if count < min {
                failures.push(fail(
                    node,
                    FailureKind::ItemCountViolation,
                    path,
                    format!("{} items is below minItems {}", count, min),
                ));
            }
        }
        if let Some(max) = node.max_items {
            if count > max {
                failures.push(fail(
                    node,
                    FailureKind::ItemCountViolation,
                    path,
                    format!("{} items is above maxItems {}", count, max),
                ));
            }
        }

        if node.unique_items {
            'outer: for (i, a) in items.iter().enumerate() {
                for b in &items[i + 1..] {
                    if values_equal(a, b) {
                        failures.push(fail(
                            node,
                            FailureKind::UniquenessViolation,
                            path,
                            format!("items are not unique (duplicate at index {})", i),
                        ));
                        break 'outer;
                    }
                }
            }
        }

        if let Some(element_schema) = node.items {
            for (index, element) in items.iter().enumerate() {
                let element_path = format!("{}/{}", path, index);
                failures.extend(self.validate_node(
                    element_schema,
                    element,
                    &element_path,
                    depth + 1,
                )?);
            }
        }
        Ok(())
    }

    fn check_object(
        &self,
        node: &SchemaNode,
        map: &serde_json::Map<String, Value>,
        path: &str,
        depth: usize,
        failures: &mut Vec<ValidationFailure>,
    ) -> Result<(), ValidationFailure> {
        let count = map.len() as u64;
        if let Some(min) = node.min_properties {
            if count < min {
                failures.push(fail(
                    node,
                    FailureKind::PropertyCountViolation,
                    path,
                    format!("{} properties is below minProperties {}", count, min),
                ));
            }
        }
        if let Some(max) = node.max_properties {
            if count > max {
                failures.push(fail(
                    node,
                    FailureKind::PropertyCountViolation,
                    path,
                    format!("{} properties is above maxProperties {}", count, max),
                ));
            }
        }

        for required in &node.required {
            if !map.contains_key(required) {
                let missing_path = format!("{}/{}", path, escape_pointer_segment(required));
                failures.push(fail(
                    node,
                    FailureKind::RequiredPropertyMissing,
                    &missing_path,
                    format!("required property '{}' is missing", required),
                ));
            }
        }

        for (key, child_value) in map {
            let child_path = format!("{}/{}", path, escape_pointer_segment(key));

            if let Some(child_schema) = node.properties.get(key) {
                failures.extend(self.validate_node(
                    *child_schema,
                    child_value,
                    &child_path,
                    depth + 1,
                )?);
                continue;
            }

            // First matching pattern wins, in declaration order.
            if let Some((_, child_schema)) = node
                .pattern_properties
                .iter()
                .find(|(pattern, _)| pattern.is_match(key))
            {
                failures.extend(self.validate_node(
                    *child_schema,
                    child_value,
                    &child_path,
                    depth + 1,
                )?);
                continue;
            }

            match node.additional_properties {
                AdditionalProperties::Permit => {}
                AdditionalProperties::Forbid => {
                    failures.push(fail(
                        node,
                        FailureKind::UnexpectedProperty,
                        &child_path,
                        format!("property '{}' is not allowed", key),
                    ));
                }
                AdditionalProperties::Schema(child_schema) => {
                    failures.extend(self.validate_node(
                        child_schema,
                        child_value,
                        &child_path,
                        depth + 1,
                    )?);
                }
            }
        }
        Ok(())
    }

    fn check_combinators(
        &self,
        node: &SchemaNode,
        value: &Value,
        path: &str,
        depth: usize,
        failures: &mut Vec<ValidationFailure>,
    ) -> Result<(), ValidationFailure> {
        for branch in &node.all_of {
            failures.extend(self.validate_node(*branch, value, path, depth + 1)?);
        }

        if !node.any_of.is_empty() {
            match self.dispatch_discriminator(node, value, path)? {
                Dispatch::Branch(target) => {
                    failures.extend(self.validate_node(target, value, path, depth + 1)?);
                }
                Dispatch::Failed(failure) => failures.push(failure),
                Dispatch::NoDiscriminator => {
                    let mut branch_failures = Vec::new();
                    let mut matched = false;
                    for branch in &node.any_of {
                        let result = self.validate_node(*branch, value, path, depth + 1)?;
                        if result.is_empty() {
                            matched = true;
                            break;
                        }
                        branch_failures.extend(result);
                    }
                    if !matched {
                        failures.push(fail(
                            node,
                            FailureKind::AnyOfMismatch,
                            path,
                            format!("no anyOf branch matched ({} tried)", node.any_of.len()),
                        ));
                        failures.extend(branch_failures);
                    }
                }
            }
        }

        if !node.one_of.is_empty() {
            match self.dispatch_discriminator(node, value, path)? {
                Dispatch::Branch(target) => {
                    failures.extend(self.validate_node(target, value, path, depth + 1)?);
                }
                Dispatch::Failed(failure) => failures.push(failure),
                Dispatch::NoDiscriminator => {
                    let mut branch_failures = Vec::new();
                    let mut matches = 0usize;
                    for branch in &node.one_of {
                        let result = self.validate_node(*branch, value, path, depth + 1)?;
                        if result.is_empty() {
                            matches += 1;
                        } else {
                            branch_failures.extend(result);
                        }
                    }
                    match matches {
                        1 => {}
                        0 => {
                            failures.push(fail(
                                node,
                                FailureKind::OneOfMismatch,
                                path,
                                format!(
                                    "none of the {} oneOf branches matched",
                                    node.one_of.len()
                                ),
                            ));
                            failures.extend(branch_failures);
                        }
                        n => failures.push(fail(
                            node,
                            FailureKind::OneOfMismatch,
                            path,
                            format!(
                                "value ambiguously matched {} of {} oneOf branches",
                                n,
                                node.one_of.len()
                            ),
                        )),
                    }
                }
            }
        }

        if let Some(negated) = node.not {
            if self.validate_node(negated, value, path, depth + 1)?.is_empty() {
                failures.push(fail(
                    node,
                    FailureKind::NotMismatch,
                    path,
                    "value matches the negated schema".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Discriminator dispatch: read the declared property from the input
    /// object and map it to a single branch instead of trying them all.
    fn dispatch_discriminator(
        &self,
        node: &SchemaNode,
        value: &Value,
        path: &str,
    ) -> Result<Dispatch, ValidationFailure> {
        let Some(discriminator) = &node.discriminator else {
            return Ok(Dispatch::NoDiscriminator);
        };
        let Some(map) = value.as_object() else {
            // Non-objects cannot carry the property; fall back to trying
            // every branch.
            return Ok(Dispatch::NoDiscriminator);
        };

        let tag_path = format!(
            "{}/{}",
            path,
            escape_pointer_segment(&discriminator.property)
        );
        let Some(tag) = map.get(&discriminator.property).and_then(Value::as_str) else {
            return Ok(Dispatch::Failed(fail(
                node,
                FailureKind::DiscriminatorMappingMissing,
                &tag_path,
                format!(
                    "discriminator property '{}' is missing or not a string",
                    discriminator.property
                ),
            )));
        };

        match discriminator.mapping.get(tag) {
            Some(target) => Ok(Dispatch::Branch(*target)),
            None => Ok(Dispatch::Failed(fail(
                node,
                FailureKind::DiscriminatorMappingMissing,
                &tag_path,
                format!("discriminator value '{}' has no mapping entry", tag),
            ))),
        }
    }
}

enum Dispatch {
    Branch(NodeId),
    Failed(ValidationFailure),
    NoDiscriminator,
}

fn fail(node: &SchemaNode, kind: FailureKind, path: &str, message: String) -> ValidationFailure {
    ValidationFailure {
        value_path: path.to_string(),
        schema_path: node.origin.to_string(),
        kind,
        message,
    }
}
