//! # Reference Resolver
//!
//! Turns a decoded interface-description document into a fully linked
//! [`SchemaGraph`]. Handles intra-document, cross-document and cyclic
//! `$ref`s; cross-document targets are fetched through a caller-supplied
//! retrieval function and cached per resolve call. No network or
//! filesystem access happens here.
//!
//! A resolve either succeeds completely or fails with the first
//! [`crate::error::ReferenceError`]; a partially linked graph is never
//! returned.

use crate::components;
use crate::error::{AppError, AppResult, ReferenceError};
use crate::graph::{NodeId, SchemaGraph};
use crate::refs::{
    escape_pointer_segment, fragment_is_pointer, parse_reference, resolve_doc_uri, walk_pointer,
};
use crate::schema::{
    AdditionalProperties, Discriminator, NodeOrigin, SchemaNode, SchemaType,
};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map as JsonMap, Value};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Caller-supplied retrieval function: reference URI -> document bytes.
///
/// Only invoked for documents beyond the root; the function owns its own
/// timeout / cancellation policy.
pub type RetrieveFn = dyn Fn(&str) -> AppResult<Vec<u8>>;

/// Resolver configuration. One resolver resolves one document; the
/// external-document cache is scoped to a single `resolve_*` call.
pub struct Resolver<'a> {
    retrieve: Option<&'a RetrieveFn>,
    allow_external: bool,
    document_uri: String,
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    /// Resolver without external-reference support.
    pub fn new() -> Self {
        Self {
            retrieve: None,
            allow_external: false,
            document_uri: String::new(),
        }
    }

    /// Resolver that can fetch external documents through `retrieve`.
    ///
    /// External references still require [`Resolver::allow_external`].
    pub fn with_retriever(retrieve: &'a RetrieveFn) -> Self {
        Self {
            retrieve: Some(retrieve),
            ..Self::new()
        }
    }

    /// Gates cross-document references (default off).
    pub fn allow_external(mut self, allow: bool) -> Self {
        self.allow_external = allow;
        self
    }

    /// Sets the root document's own URI, used as the base for joining
    /// relative cross-document references and for recognizing
    /// self-references spelled with an absolute URI.
    pub fn document_uri(mut self, uri: impl Into<String>) -> Self {
        self.document_uri = uri.into();
        self
    }

    /// Decodes YAML or JSON bytes and resolves the document.
    pub fn resolve_bytes(&self, bytes: &[u8]) -> AppResult<SchemaGraph> {
        self.resolve_value(decode_document(bytes, &self.document_uri)?)
    }

    /// Decodes YAML or JSON text and resolves the document.
    pub fn resolve_str(&self, text: &str) -> AppResult<SchemaGraph> {
        self.resolve_bytes(text.as_bytes())
    }

    /// Resolves an already decoded interface-description document.
    ///
    /// Lowers every named schema (`components/schemas` for OAS 3,
    /// `definitions` for OAS 2) and every non-schema referenceable
    /// component (parameters, responses, headers, request bodies).
    pub fn resolve_value(&self, root: Value) -> AppResult<SchemaGraph> {
        let mut resolution = Resolution::new(self, root);
        let mut graph = SchemaGraph::default();

        let root_uri = resolution.root_uri.clone();
        if let Some((prefix, names)) = resolution.schema_section(&root_uri)? {
            for name in names {
                let pointer = format!("{}/{}", prefix, escape_pointer_segment(&name));
                let id = resolution.lower_schema(&mut graph, &root_uri, &pointer)?;
                graph.insert_schema(name, id);
            }
        }

        components::lower_component_sections(&mut resolution, &mut graph)?;
        Ok(graph)
    }

    /// Decodes bytes holding a bare schema document and resolves it; the
    /// result's [`SchemaGraph::root`] is the document's own schema node.
    pub fn resolve_schema_bytes(&self, bytes: &[u8]) -> AppResult<SchemaGraph> {
        self.resolve_schema_value(decode_document(bytes, &self.document_uri)?)
    }

    /// Text variant of [`Resolver::resolve_schema_bytes`].
    pub fn resolve_schema_str(&self, text: &str) -> AppResult<SchemaGraph> {
        self.resolve_schema_bytes(text.as_bytes())
    }

    /// Resolves a document whose root is itself a schema.
    pub fn resolve_schema_value(&self, root: Value) -> AppResult<SchemaGraph> {
        self.resolve_pointer(root, "")
    }

    /// Resolves only the schema at `pointer` within a decoded document;
    /// the result's [`SchemaGraph::root`] is that schema's node. References
    /// out of the addressed subtree are followed as usual.
    pub fn resolve_pointer(&self, root: Value, pointer: &str) -> AppResult<SchemaGraph> {
        let mut resolution = Resolution::new(self, root);
        let mut graph = SchemaGraph::default();
        let root_uri = resolution.root_uri.clone();
        let id = resolution.lower_schema(&mut graph, &root_uri, pointer)?;
        graph.set_root(id);
        Ok(graph)
    }
}

fn decode_document(bytes: &[u8], uri: &str) -> AppResult<Value> {
    // serde_yaml accepts JSON as a YAML subset, so one decoder serves both.
    serde_yaml::from_slice(bytes).map_err(|e| {
        AppError::General(format!("Failed to decode document '{}': {}", uri, e))
    })
}

/// Per-call resolution state: the external-document cache plus the
/// in-progress / fully-resolved marker maps keyed by (document, pointer).
pub(crate) struct Resolution<'a> {
    retrieve: Option<&'a RetrieveFn>,
    allow_external: bool,
    pub(crate) root_uri: String,
    cache: HashMap<String, Value>,
    done: HashMap<(String, String), NodeId>,
    in_progress: HashMap<(String, String), NodeId>,
    visiting_refs: HashSet<(String, String)>,
}

impl<'a> Resolution<'a> {
    fn new(resolver: &Resolver<'a>, root: Value) -> Self {
        let root_uri = resolver.document_uri.clone();
        let mut cache = HashMap::new();
        cache.insert(root_uri.clone(), root);
        Self {
            retrieve: resolver.retrieve,
            allow_external: resolver.allow_external,
            root_uri,
            cache,
            done: HashMap::new(),
            in_progress: HashMap::new(),
            visiting_refs: HashSet::new(),
        }
    }

    /// Returns a cached document, fetching and decoding it first when the
    /// URI is new. Fetching is where the external-reference gate applies.
    pub(crate) fn document(&mut self, uri: &str, reference: &str) -> AppResult<&Value> {
        if !self.cache.contains_key(uri) {
            if !self.allow_external {
                return Err(ReferenceError::external_disabled(reference).into());
            }
            let retrieve = self.retrieve.ok_or_else(|| {
                AppError::from(ReferenceError::retrieval(
                    reference,
                    "no retrieval function was supplied",
                ))
            })?;
            let bytes = retrieve(uri).map_err(|e| {
                AppError::from(ReferenceError::retrieval(
                    reference,
                    format!("retrieving '{}': {}", uri, e),
                ))
            })?;
            let decoded: Value = serde_yaml::from_slice(&bytes).map_err(|e| {
                AppError::from(ReferenceError::retrieval(
                    reference,
                    format!("decoding '{}': {}", uri, e),
                ))
            })?;
            self.cache.insert(uri.to_string(), decoded);
        }
        Ok(&self.cache[uri])
    }

    /// Splits a `$ref` into its target (document URI, pointer), joining
    /// relative documents against the current document's URI and folding
    /// self-references back onto the current document.
    pub(crate) fn locate(
        &self,
        current_doc: &str,
        ref_str: &str,
    ) -> AppResult<(String, String)> {
        let parsed = parse_reference(ref_str);
        let fragment = parsed.fragment.unwrap_or("");
        if !fragment_is_pointer(fragment) {
            return Err(ReferenceError::malformed(
                ref_str,
                "fragment is not a JSON Pointer",
            )
            .into());
        }

        if parsed.document.is_empty() {
            return Ok((current_doc.to_string(), fragment.to_string()));
        }

        let base = Url::parse(current_doc).ok();
        let target = resolve_doc_uri(parsed.document, base.as_ref());
        if target == current_doc || target == self.root_uri {
            return Ok((current_doc.to_string(), fragment.to_string()));
        }
        Ok((target, fragment.to_string()))
    }

    /// Follows a `$ref` chain from (doc, pointer) to the first concrete
    /// (non-reference) value. Used for the non-schema referenceables,
    /// where a pure reference cycle has no meaning.
    pub(crate) fn chase(
        &mut self,
        doc: &str,
        pointer: &str,
    ) -> AppResult<(String, String, Value)> {
        let mut doc = doc.to_string();
        let mut pointer = pointer.to_string();
        let mut label = format!("{}#{}", doc, pointer);
        let mut seen = HashSet::new();

        loop {
            if !seen.insert((doc.clone(), pointer.clone())) {
                return Err(ReferenceError::malformed(label, "reference cycle").into());
            }
            let value = {
                let document = self.document(&doc, &label)?;
                walk_pointer(document, &pointer).cloned()
            }
            .ok_or_else(|| {
                AppError::from(ReferenceError::not_found(
                    label.clone(),
                    "pointer does not locate a node",
                ))
            })?;

            match value.get("$ref").and_then(Value::as_str) {
                Some(ref_str) => {
                    let ref_str = ref_str.to_string();
                    let (next_doc, next_ptr) = self.locate(&doc, &ref_str)?;
                    self.document(&next_doc, &ref_str)?;
                    doc = next_doc;
                    pointer = next_ptr;
                    label = ref_str;
                }
                None => return Ok((doc, pointer, value)),
            }
        }
    }

    /// Lowers the schema at (doc, pointer) into the arena, returning its
    /// stable id. Revisits are deduplicated through the `done` map; nodes
    /// currently being built hand out their reserved id, which is what
    /// makes cycles terminate.
    pub(crate) fn lower_schema(
        &mut self,
        graph: &mut SchemaGraph,
        doc: &str,
        pointer: &str,
    ) -> AppResult<NodeId> {
        let key = (doc.to_string(), pointer.to_string());
        if let Some(id) = self.done.get(&key) {
            return Ok(*id);
        }
        if let Some(id) = self.in_progress.get(&key) {
            return Ok(*id);
        }

        let label = format!("{}#{}", doc, pointer);
        let value = {
            let document = self.document(doc, &label)?;
            walk_pointer(document, pointer).cloned()
        }
        .ok_or_else(|| {
            AppError::from(ReferenceError::not_found(
                label.clone(),
                "pointer does not locate a node",
            ))
        })?;

        if let Some(ref_str) = value.get("$ref").and_then(Value::as_str) {
            // A chain of refs with no schema body anywhere is degenerate.
            if !self.visiting_refs.insert(key.clone()) {
                return Err(ReferenceError::malformed(
                    ref_str,
                    "reference cycle with no schema body",
                )
                .into());
            }
            let ref_str = ref_str.to_string();
            let (target_doc, target_ptr) = self.locate(doc, &ref_str)?;
            self.document(&target_doc, &ref_str)?;
            let id = self.lower_schema(graph, &target_doc, &target_ptr);
            self.visiting_refs.remove(&key);
            let id = id?;
            self.done.insert(key, id);
            return Ok(id);
        }

        let origin = NodeOrigin {
            document: doc.to_string(),
            pointer: pointer.to_string(),
        };
        let id = graph.reserve(origin);
        self.in_progress.insert(key.clone(), id);

        let node = match &value {
            Value::Object(map) => self.lower_object_schema(graph, doc, pointer, map),
            Value::Bool(accept) => Ok(self.lower_boolean_schema(graph, doc, pointer, *accept)),
            other => Err(AppError::General(format!(
                "Schema at '{}' must be an object or boolean, found {}",
                label,
                crate::value::ValueKind::of(other)
            ))),
        };
        self.in_progress.remove(&key);
        let node = node?;
        graph.fill(id, node);
        self.done.insert(key, id);
        Ok(id)
    }

    /// `true` accepts everything; `false` is lowered as `not: {}`.
    fn lower_boolean_schema(
        &mut self,
        graph: &mut SchemaGraph,
        doc: &str,
        pointer: &str,
        accept: bool,
    ) -> SchemaNode {
        let mut node = SchemaNode {
            origin: NodeOrigin {
                document: doc.to_string(),
                pointer: pointer.to_string(),
            },
            ..SchemaNode::default()
        };
        if !accept {
            let anything = graph.reserve(NodeOrigin {
                document: doc.to_string(),
                pointer: format!("{}/not", pointer),
            });
            node.not = Some(anything);
        }
        node
    }

    fn lower_object_schema(
        &mut self,
        graph: &mut SchemaGraph,
        doc: &str,
        pointer: &str,
        map: &JsonMap<String, Value>,
    ) -> AppResult<SchemaNode> {
        let origin = NodeOrigin {
            document: doc.to_string(),
            pointer: pointer.to_string(),
        };
        let at = origin.to_string();
        let mut node = SchemaNode {
            origin,
            ..SchemaNode::default()
        };

        self.lower_declared_type(&mut node, map, &at)?;
        node.format = get_string(map, "format", &at)?;
        node.nullable |= get_flag(map, "nullable", &at)?;
        node.read_only = get_flag(map, "readOnly", &at)?;
        node.write_only = get_flag(map, "writeOnly", &at)?;
        node.deprecated = get_flag(map, "deprecated", &at)?;

        self.lower_numeric_bounds(&mut node, map, &at)?;

        node.min_length = get_u64(map, "minLength", &at)?;
        node.max_length = get_u64(map, "maxLength", &at)?;
        node.pattern = compile_pattern(map.get("pattern"), &at)?;

        node.min_items = get_u64(map, "minItems", &at)?;
        node.max_items = get_u64(map, "maxItems", &at)?;
        node.unique_items = get_flag(map, "uniqueItems", &at)?;
        node.items = match map.get("items") {
            None => None,
            Some(Value::Array(_)) => {
                return Err(AppError::General(format!(
                    "Schema at '{}': tuple-form 'items' is not supported",
                    at
                )));
            }
            Some(_) => Some(self.lower_schema(graph, doc, &format!("{}/items", pointer))?),
        };

        node.min_properties = get_u64(map, "minProperties", &at)?;
        node.max_properties = get_u64(map, "maxProperties", &at)?;
        node.required = get_string_list(map, "required", &at)?;

        if let Some(props) = map.get("properties") {
            let props = props.as_object().ok_or_else(|| {
                AppError::General(format!("Schema at '{}': 'properties' must be an object", at))
            })?;
            for name in props.keys() {
                let child_ptr =
                    format!("{}/properties/{}", pointer, escape_pointer_segment(name));
                let child = self.lower_schema(graph, doc, &child_ptr)?;
                node.properties.insert(name.clone(), child);
            }
        }

        if let Some(patterns) = map.get("patternProperties") {
            let patterns = patterns.as_object().ok_or_else(|| {
                AppError::General(format!(
                    "Schema at '{}': 'patternProperties' must be an object",
                    at
                ))
            })?;
            for pattern in patterns.keys() {
                let regex = Regex::new(pattern).map_err(|e| {
                    AppError::General(format!(
                        "Schema at '{}': invalid patternProperties regex '{}': {}",
                        at, pattern, e
                    ))
                })?;
                let child_ptr = format!(
                    "{}/patternProperties/{}",
                    pointer,
                    escape_pointer_segment(pattern)
                );
                let child = self.lower_schema(graph, doc, &child_ptr)?;
                node.pattern_properties.push((regex, child));
            }
        }

        node.additional_properties = match map.get("additionalProperties") {
            None => AdditionalProperties::Permit,
            Some(Value::Bool(true)) => AdditionalProperties::Permit,
            Some(Value::Bool(false)) => AdditionalProperties::Forbid,
            Some(Value::Object(_)) => AdditionalProperties::Schema(self.lower_schema(
                graph,
                doc,
                &format!("{}/additionalProperties", pointer),
            )?),
            Some(_) => {
                return Err(AppError::General(format!(
                    "Schema at '{}': 'additionalProperties' must be a boolean or schema",
                    at
                )));
            }
        };

        node.all_of = self.lower_branch_list(graph, doc, pointer, map, "allOf", &at)?;
        node.any_of = self.lower_branch_list(graph, doc, pointer, map, "anyOf", &at)?;
        node.one_of = self.lower_branch_list(graph, doc, pointer, map, "oneOf", &at)?;
        node.not = match map.get("not") {
            None => None,
            Some(_) => Some(self.lower_schema(graph, doc, &format!("{}/not", pointer))?),
        };

        if let Some(members) = map.get("enum") {
            let members = members.as_array().ok_or_else(|| {
                AppError::General(format!("Schema at '{}': 'enum' must be an array", at))
            })?;
            node.enum_values = members.clone();
        }
        node.default_value = map.get("default").cloned();
        node.example = map.get("example").cloned();

        node.discriminator = self.lower_discriminator(graph, doc, map, &at)?;

        Ok(node)
    }

    fn lower_declared_type(
        &mut self,
        node: &mut SchemaNode,
        map: &JsonMap<String, Value>,
        at: &str,
    ) -> AppResult<()> {
        let parse = |name: &str| {
            SchemaType::parse(name).ok_or_else(|| {
                AppError::General(format!("Schema at '{}': unknown type '{}'", at, name))
            })
        };

        match map.get("type") {
            None => {}
            Some(Value::String(name)) => node.schema_type = Some(parse(name)?),
            // OAS 3.1 spells nullability as `type: [T, "null"]`.
            Some(Value::Array(entries)) => {
                for entry in entries {
                    let name = entry.as_str().ok_or_else(|| {
                        AppError::General(format!(
                            "Schema at '{}': 'type' array entries must be strings",
                            at
                        ))
                    })?;
                    if name == "null" {
                        node.nullable = true;
                        continue;
                    }
                    if node.schema_type.is_some() {
                        return Err(AppError::General(format!(
                            "Schema at '{}': multiple non-null types are not supported",
                            at
                        )));
                    }
                    node.schema_type = Some(parse(name)?);
                }
            }
            Some(_) => {
                return Err(AppError::General(format!(
                    "Schema at '{}': 'type' must be a string or array of strings",
                    at
                )));
            }
        }
        Ok(())
    }

    fn lower_numeric_bounds(
        &mut self,
        node: &mut SchemaNode,
        map: &JsonMap<String, Value>,
        at: &str,
    ) -> AppResult<()> {
        node.minimum = get_f64(map, "minimum", at)?;
        node.maximum = get_f64(map, "maximum", at)?;

        // Boolean-form exclusives (OAS 3.0) flip the inclusive bound into
        // the exclusive slot; numeric-form (OAS 3.1) carry their own value.
        node.exclusive_minimum = match map.get("exclusiveMinimum") {
            None | Some(Value::Bool(false)) => None,
            Some(Value::Bool(true)) => node.minimum.take(),
            Some(Value::Number(n)) => n.as_f64(),
            Some(_) => {
                return Err(AppError::General(format!(
                    "Schema at '{}': 'exclusiveMinimum' must be a boolean or number",
                    at
                )));
            }
        };
        node.exclusive_maximum = match map.get("exclusiveMaximum") {
            None | Some(Value::Bool(false)) => None,
            Some(Value::Bool(true)) => node.maximum.take(),
            Some(Value::Number(n)) => n.as_f64(),
            Some(_) => {
                return Err(AppError::General(format!(
                    "Schema at '{}': 'exclusiveMaximum' must be a boolean or number",
                    at
                )));
            }
        };

        node.multiple_of = get_f64(map, "multipleOf", at)?;
        if let Some(m) = node.multiple_of {
            if m <= 0.0 {
                return Err(AppError::General(format!(
                    "Schema at '{}': 'multipleOf' must be greater than zero",
                    at
                )));
            }
        }
        Ok(())
    }

    fn lower_branch_list(
        &mut self,
        graph: &mut SchemaGraph,
        doc: &str,
        pointer: &str,
        map: &JsonMap<String, Value>,
        keyword: &str,
        at: &str,
    ) -> AppResult<Vec<NodeId>> {
        let Some(value) = map.get(keyword) else {
            return Ok(Vec::new());
        };
        let branches = value.as_array().ok_or_else(|| {
            AppError::General(format!("Schema at '{}': '{}' must be an array", at, keyword))
        })?;

        let mut ids = Vec::with_capacity(branches.len());
        for index in 0..branches.len() {
            let child_ptr = format!("{}/{}/{}", pointer, keyword, index);
            ids.push(self.lower_schema(graph, doc, &child_ptr)?);
        }
        Ok(ids)
    }

    fn lower_discriminator(
        &mut self,
        graph: &mut SchemaGraph,
        doc: &str,
        map: &JsonMap<String, Value>,
        at: &str,
    ) -> AppResult<Option<Discriminator>> {
        let Some(disc) = map.get("discriminator") else {
            return Ok(None);
        };
        let disc = disc.as_object().ok_or_else(|| {
            AppError::General(format!(
                "Schema at '{}': 'discriminator' must be an object",
                at
            ))
        })?;
        let property = disc
            .get("propertyName")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::General(format!(
                    "Schema at '{}': discriminator requires 'propertyName'",
                    at
                ))
            })?
            .to_string();

        let mut mapping = IndexMap::new();
        match disc.get("mapping") {
            Some(raw_mapping) => {
                let raw_mapping = raw_mapping.as_object().ok_or_else(|| {
                    AppError::General(format!(
                        "Schema at '{}': discriminator 'mapping' must be an object",
                        at
                    ))
                })?;
                for (key, target) in raw_mapping {
                    let target = target.as_str().ok_or_else(|| {
                        AppError::General(format!(
                            "Schema at '{}': discriminator mapping values must be strings",
                            at
                        ))
                    })?;
                    let id = self.lower_mapping_target(graph, doc, target)?;
                    mapping.insert(key.clone(), id);
                }
            }
            // Without an explicit mapping every named schema in the
            // current document maps under its own name.
            None => {
                if let Some((prefix, names)) = self.schema_section(doc)? {
                    for name in names {
                        let pointer =
                            format!("{}/{}", prefix, escape_pointer_segment(&name));
                        let id = self.lower_schema(graph, doc, &pointer)?;
                        mapping.insert(name, id);
                    }
                }
            }
        }

        Ok(Some(Discriminator { property, mapping }))
    }

    /// A mapping value is either a full reference or a bare schema name.
    fn lower_mapping_target(
        &mut self,
        graph: &mut SchemaGraph,
        doc: &str,
        target: &str,
    ) -> AppResult<NodeId> {
        if target.starts_with('#') || target.contains('/') {
            let (target_doc, target_ptr) = self.locate(doc, target)?;
            self.document(&target_doc, target)?;
            return self.lower_schema(graph, &target_doc, &target_ptr);
        }

        let Some((prefix, names)) = self.schema_section(doc)? else {
            return Err(ReferenceError::not_found(
                target,
                "discriminator mapping names a schema but the document has none",
            )
            .into());
        };
        if !names.iter().any(|n| n == target) {
            return Err(ReferenceError::not_found(
                target,
                "discriminator mapping does not match a named schema",
            )
            .into());
        }
        let pointer = format!("{}/{}", prefix, escape_pointer_segment(target));
        self.lower_schema(graph, doc, &pointer)
    }

    /// Locates the document's named-schema section: `components/schemas`
    /// (OAS 3) or `definitions` (OAS 2 / bare JSON Schema documents).
    pub(crate) fn schema_section(
        &mut self,
        doc: &str,
    ) -> AppResult<Option<(&'static str, Vec<String>)>> {
        let document = self.document(doc, doc)?;
        if let Some(schemas) = document
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object)
        {
            return Ok(Some((
                "/components/schemas",
                schemas.keys().cloned().collect(),
            )));
        }
        if let Some(defs) = document.get("definitions").and_then(Value::as_object) {
            return Ok(Some(("/definitions", defs.keys().cloned().collect())));
        }
        Ok(None)
    }
}

fn get_f64(map: &JsonMap<String, Value>, key: &str, at: &str) -> AppResult<Option<f64>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(AppError::General(format!(
            "Schema at '{}': '{}' must be a number",
            at, key
        ))),
    }
}

fn get_u64(map: &JsonMap<String, Value>, key: &str, at: &str) -> AppResult<Option<u64>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Number(n)) if n.as_u64().is_some() => Ok(n.as_u64()),
        Some(_) => Err(AppError::General(format!(
            "Schema at '{}': '{}' must be a non-negative integer",
            at, key
        ))),
    }
}

fn get_flag(map: &JsonMap<String, Value>, key: &str, at: &str) -> AppResult<bool> {
    match map.get(key) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(AppError::General(format!(
            "Schema at '{}': '{}' must be a boolean",
            at, key
        ))),
    }
}

fn get_string(map: &JsonMap<String, Value>, key: &str, at: &str) -> AppResult<Option<String>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AppError::General(format!(
            "Schema at '{}': '{}' must be a string",
            at, key
        ))),
    }
}

fn get_string_list(map: &JsonMap<String, Value>, key: &str, at: &str) -> AppResult<Vec<String>> {
    match map.get(key) {
        None => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                entry.as_str().map(str::to_string).ok_or_else(|| {
                    AppError::General(format!(
                        "Schema at '{}': '{}' entries must be strings",
                        at, key
                    ))
                })
            })
            .collect(),
        Some(_) => Err(AppError::General(format!(
            "Schema at '{}': '{}' must be an array of strings",
            at, key
        ))),
    }
}

fn compile_pattern(pattern: Option<&Value>, at: &str) -> AppResult<Option<Regex>> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };
    let pattern = pattern.as_str().ok_or_else(|| {
        AppError::General(format!("Schema at '{}': 'pattern' must be a string", at))
    })?;
    // Patterns compile here so validation never meets a bad regex.
    Regex::new(pattern).map(Some).map_err(|e| {
        AppError::General(format!(
            "Schema at '{}': invalid pattern '{}': {}",
            at, pattern, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReferenceErrorKind;

    fn resolve(yaml: &str) -> SchemaGraph {
        Resolver::new().resolve_str(yaml).unwrap()
    }

    #[test]
    fn test_resolves_component_schemas() {
        let graph = resolve(
            r#"
openapi: 3.0.3
info: {title: Pets, version: "1.0"}
paths: {}
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name: {type: string, minLength: 1}
        tag: {type: string}
"#,
        );

        let pet = graph.schema("Pet").unwrap();
        let node = graph.node(pet);
        assert_eq!(node.schema_type, Some(SchemaType::Object));
        assert_eq!(node.required, vec!["name"]);
        let name = node.properties.get("name").copied().unwrap();
        assert_eq!(graph.node(name).min_length, Some(1));
    }

    #[test]
    fn test_shared_reference_deduplicates() {
        let graph = resolve(
            r#"
openapi: 3.0.3
info: {title: Shared, version: "1.0"}
paths: {}
components:
  schemas:
    Id: {type: integer}
    A:
      type: object
      properties:
        id: {$ref: '#/components/schemas/Id'}
    B:
      type: object
      properties:
        id: {$ref: '#/components/schemas/Id'}
"#,
        );

        let id = graph.schema("Id").unwrap();
        let a = graph.node(graph.schema("A").unwrap());
        let b = graph.node(graph.schema("B").unwrap());
        assert_eq!(a.properties.get("id"), Some(&id));
        assert_eq!(b.properties.get("id"), Some(&id));
    }

    #[test]
    fn test_self_referential_cycle_terminates() {
        let graph = resolve(
            r#"
swagger: "2.0"
info: {title: Tree, version: "1.0"}
paths: {}
definitions:
  Node:
    type: object
    properties:
      children:
        type: array
        items: {$ref: '#/definitions/Node'}
"#,
        );

        let node_id = graph.schema("Node").unwrap();
        let node = graph.node(node_id);
        let children = node.properties.get("children").copied().unwrap();
        // The items link points straight back at the named node.
        assert_eq!(graph.node(children).items, Some(node_id));
    }

    #[test]
    fn test_unresolvable_pointer_is_not_found() {
        let err = Resolver::new()
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Bad, version: "1.0"}
paths: {}
components:
  schemas:
    A: {$ref: '#/components/schemas/Missing'}
"#,
            )
            .unwrap_err();

        match err {
            AppError::Reference(e) => assert_eq!(e.kind, ReferenceErrorKind::NotFound),
            other => panic!("expected reference error, got {}", other),
        }
    }

    #[test]
    fn test_pure_reference_cycle_is_malformed() {
        let err = Resolver::new()
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Loop, version: "1.0"}
paths: {}
components:
  schemas:
    A: {$ref: '#/components/schemas/B'}
    B: {$ref: '#/components/schemas/A'}
"#,
            )
            .unwrap_err();

        match err {
            AppError::Reference(e) => assert_eq!(e.kind, ReferenceErrorKind::Malformed),
            other => panic!("expected reference error, got {}", other),
        }
    }

    #[test]
    fn test_external_refs_disabled_by_default() {
        let err = Resolver::new()
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Ext, version: "1.0"}
paths: {}
components:
  schemas:
    User: {$ref: 'shared.yaml#/components/schemas/User'}
"#,
            )
            .unwrap_err();

        match err {
            AppError::Reference(e) => {
                assert_eq!(e.kind, ReferenceErrorKind::ExternalDisabled);
                assert_eq!(e.reference, "shared.yaml#/components/schemas/User");
            }
            other => panic!("expected reference error, got {}", other),
        }
    }

    #[test]
    fn test_external_reference_resolves_through_retriever() {
        let retrieve = |uri: &str| -> AppResult<Vec<u8>> {
            assert_eq!(uri, "shared.yaml");
            Ok(br#"
components:
  schemas:
    User:
      type: object
      properties:
        email: {type: string}
"#
            .to_vec())
        };

        let graph = Resolver::with_retriever(&retrieve)
            .allow_external(true)
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Ext, version: "1.0"}
paths: {}
components:
  schemas:
    User: {$ref: 'shared.yaml#/components/schemas/User'}
"#,
            )
            .unwrap();

        let user = graph.node(graph.schema("User").unwrap());
        assert_eq!(user.origin.document, "shared.yaml");
        assert!(user.properties.contains_key("email"));
    }

    #[test]
    fn test_relative_external_reference_joins_against_document_uri() {
        let retrieve = |uri: &str| -> AppResult<Vec<u8>> {
            assert_eq!(uri, "https://example.com/specs/shared.yaml");
            Ok(b"definitions:\n  Id: {type: integer}\n".to_vec())
        };

        let graph = Resolver::with_retriever(&retrieve)
            .allow_external(true)
            .document_uri("https://example.com/specs/root.yaml")
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Ext, version: "1.0"}
paths: {}
components:
  schemas:
    Id: {$ref: 'shared.yaml#/definitions/Id'}
"#,
            )
            .unwrap();

        let id = graph.node(graph.schema("Id").unwrap());
        assert_eq!(id.schema_type, Some(SchemaType::Integer));
    }

    #[test]
    fn test_retrieval_failure_propagates() {
        let retrieve =
            |_: &str| -> AppResult<Vec<u8>> { Err(AppError::General("boom".into())) };

        let err = Resolver::with_retriever(&retrieve)
            .allow_external(true)
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Ext, version: "1.0"}
paths: {}
components:
  schemas:
    A: {$ref: 'gone.yaml#/definitions/A'}
"#,
            )
            .unwrap_err();

        match err {
            AppError::Reference(e) => {
                assert_eq!(e.kind, ReferenceErrorKind::Retrieval);
                assert!(e.detail.contains("boom"));
            }
            other => panic!("expected reference error, got {}", other),
        }
    }

    #[test]
    fn test_invalid_pattern_fails_at_resolution_time() {
        let err = Resolver::new()
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Rx, version: "1.0"}
paths: {}
components:
  schemas:
    A: {type: string, pattern: "("}
"#,
            )
            .unwrap_err();
        assert!(format!("{}", err).contains("invalid pattern"));
    }

    #[test]
    fn test_boolean_form_exclusive_bounds_are_normalized() {
        let graph = resolve(
            r#"
openapi: 3.0.3
info: {title: Num, version: "1.0"}
paths: {}
components:
  schemas:
    Positive: {type: number, minimum: 0, exclusiveMinimum: true}
"#,
        );
        let node = graph.node(graph.schema("Positive").unwrap());
        assert_eq!(node.minimum, None);
        assert_eq!(node.exclusive_minimum, Some(0.0));
    }

    #[test]
    fn test_type_array_with_null_sets_nullable() {
        let graph = resolve(
            r#"
openapi: 3.1.0
info: {title: Nullable, version: "1.0"}
paths: {}
components:
  schemas:
    MaybeName:
      type: [string, "null"]
"#,
        );
        let node = graph.node(graph.schema("MaybeName").unwrap());
        assert_eq!(node.schema_type, Some(SchemaType::String));
        assert!(node.nullable);
    }

    #[test]
    fn test_discriminator_explicit_mapping() {
        let graph = resolve(
            r#"
openapi: 3.0.3
info: {title: Poly, version: "1.0"}
paths: {}
components:
  schemas:
    Cat: {type: object, properties: {kind: {type: string}}}
    Dog: {type: object, properties: {kind: {type: string}}}
    Animal:
      oneOf:
        - {$ref: '#/components/schemas/Cat'}
        - {$ref: '#/components/schemas/Dog'}
      discriminator:
        propertyName: kind
        mapping:
          cat: '#/components/schemas/Cat'
          dog: Dog
"#,
        );

        let animal = graph.node(graph.schema("Animal").unwrap());
        let disc = animal.discriminator.as_ref().unwrap();
        assert_eq!(disc.property, "kind");
        assert_eq!(disc.mapping.get("cat"), graph.schema("Cat").as_ref());
        assert_eq!(disc.mapping.get("dog"), graph.schema("Dog").as_ref());
    }

    #[test]
    fn test_resolve_pointer_addresses_one_schema() {
        let doc: Value = serde_yaml::from_str(
            r#"
openapi: 3.0.3
info: {title: Part, version: "1.0"}
paths: {}
components:
  schemas:
    Wanted:
      type: object
      properties:
        id: {$ref: '#/components/schemas/Id'}
    Id: {type: integer}
"#,
        )
        .unwrap();

        let graph = Resolver::new()
            .resolve_pointer(doc, "/components/schemas/Wanted")
            .unwrap();
        let root = graph.node(graph.root().unwrap());
        assert_eq!(root.schema_type, Some(SchemaType::Object));
        let id = root.properties.get("id").copied().unwrap();
        assert_eq!(graph.node(id).schema_type, Some(SchemaType::Integer));
    }

    #[test]
    fn test_bare_schema_document_root() {
        let graph = Resolver::new()
            .resolve_schema_str(
                r#"
type: object
properties:
  next: {$ref: '#'}
"#,
            )
            .unwrap();

        let root = graph.root().unwrap();
        // `#` points the property back at the document root.
        assert_eq!(graph.node(root).properties.get("next"), Some(&root));
    }
}
