//! # Non-Schema Referenceables
//!
//! Parameters, responses, headers and request bodies are plain data
//! holders: the interesting work is following their `$ref` chains and
//! lowering the schemas they embed into the same arena as everything
//! else. The richer textual document model (paths, operations) lives
//! with the embedding application.

use crate::error::{AppError, AppResult};
use crate::graph::{NodeId, SchemaGraph};
use crate::refs::escape_pointer_segment;
use crate::resolver::Resolution;
use indexmap::IndexMap;
use serde_json::Value;

/// A resolved parameter component.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name as sent on the wire.
    pub name: String,
    /// Location: `query`, `header`, `path` or `cookie`.
    pub location: String,
    /// Whether the parameter must be present.
    pub required: bool,
    /// Schema for the parameter value, when one is declared.
    pub schema: Option<NodeId>,
    /// The raw component object, for fields we do not model.
    pub raw: Value,
}

/// A resolved response header component.
#[derive(Debug, Clone)]
pub struct Header {
    /// Whether the header must be present.
    pub required: bool,
    /// Schema for the header value.
    pub schema: Option<NodeId>,
    /// The raw component object.
    pub raw: Value,
}

/// A resolved response component.
#[derive(Debug, Clone)]
pub struct Response {
    /// Human-readable description.
    pub description: String,
    /// Media type -> body schema (an entry may declare no schema).
    pub content: IndexMap<String, Option<NodeId>>,
    /// Declared response headers.
    pub headers: IndexMap<String, Header>,
    /// The raw component object.
    pub raw: Value,
}

/// A resolved request body component.
#[derive(Debug, Clone)]
pub struct RequestBody {
    /// Whether a body must be supplied.
    pub required: bool,
    /// Media type -> body schema.
    pub content: IndexMap<String, Option<NodeId>>,
    /// The raw component object.
    pub raw: Value,
}

/// Lowers every non-schema component section of the root document.
pub(crate) fn lower_component_sections(
    resolution: &mut Resolution<'_>,
    graph: &mut SchemaGraph,
) -> AppResult<()> {
    let root_uri = resolution.root_uri.clone();

    for name in section_names(resolution, &root_uri, "parameters")? {
        let pointer = component_pointer(resolution, &root_uri, "parameters", &name)?;
        let (doc, ptr, value) = resolution.chase(&root_uri, &pointer)?;
        let parameter = lower_parameter(resolution, graph, &doc, &ptr, &value, &name)?;
        graph.insert_parameter(name, parameter);
    }

    for name in section_names(resolution, &root_uri, "responses")? {
        let pointer = component_pointer(resolution, &root_uri, "responses", &name)?;
        let (doc, ptr, value) = resolution.chase(&root_uri, &pointer)?;
        let response = lower_response(resolution, graph, &doc, &ptr, &value, &name)?;
        graph.insert_response(name, response);
    }

    for name in section_names(resolution, &root_uri, "headers")? {
        let pointer = component_pointer(resolution, &root_uri, "headers", &name)?;
        let (doc, ptr, value) = resolution.chase(&root_uri, &pointer)?;
        let header = lower_header(resolution, graph, &doc, &ptr, &value, &name)?;
        graph.insert_header(name, header);
    }

    for name in section_names(resolution, &root_uri, "requestBodies")? {
        let pointer = component_pointer(resolution, &root_uri, "requestBodies", &name)?;
        let (doc, ptr, value) = resolution.chase(&root_uri, &pointer)?;
        let body = lower_request_body(resolution, graph, &doc, &ptr, &value, &name)?;
        graph.insert_request_body(name, body);
    }

    Ok(())
}

/// Names in a component section: `components/{section}` for OAS 3, the
/// top-level section of the same name for OAS 2 (`parameters`,
/// `responses`).
fn section_names(
    resolution: &mut Resolution<'_>,
    doc: &str,
    section: &str,
) -> AppResult<Vec<String>> {
    let document = resolution.document(doc, doc)?;
    let oas3 = document
        .get("components")
        .and_then(|c| c.get(section))
        .and_then(Value::as_object);
    if let Some(map) = oas3 {
        return Ok(map.keys().cloned().collect());
    }
    if section == "headers" || section == "requestBodies" {
        // OAS 2 has no top-level equivalents for these.
        return Ok(Vec::new());
    }
    if document.get("swagger").is_some() {
        if let Some(map) = document.get(section).and_then(Value::as_object) {
            return Ok(map.keys().cloned().collect());
        }
    }
    Ok(Vec::new())
}

fn component_pointer(
    resolution: &mut Resolution<'_>,
    doc: &str,
    section: &str,
    name: &str,
) -> AppResult<String> {
    let document = resolution.document(doc, doc)?;
    let escaped = escape_pointer_segment(name);
    if document
        .get("components")
        .and_then(|c| c.get(section))
        .is_some()
    {
        Ok(format!("/components/{}/{}", section, escaped))
    } else {
        Ok(format!("/{}/{}", section, escaped))
    }
}

fn lower_parameter(
    resolution: &mut Resolution<'_>,
    graph: &mut SchemaGraph,
    doc: &str,
    pointer: &str,
    value: &Value,
    component_name: &str,
) -> AppResult<Parameter> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::General(format!(
            "Parameter component '{}' must be an object",
            component_name
        ))
    })?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::General(format!(
                "Parameter component '{}' is missing 'name'",
                component_name
            ))
        })?
        .to_string();
    let location = obj
        .get("in")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::General(format!(
                "Parameter component '{}' is missing 'in'",
                component_name
            ))
        })?
        .to_string();

    let required = obj
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if location == "path" && !required {
        return Err(AppError::General(format!(
            "Path parameter '{}' must set required: true",
            name
        )));
    }

    let schema = lower_embedded_schema(resolution, graph, doc, pointer, obj)?;

    Ok(Parameter {
        name,
        location,
        required,
        schema,
        raw: value.clone(),
    })
}

fn lower_header(
    resolution: &mut Resolution<'_>,
    graph: &mut SchemaGraph,
    doc: &str,
    pointer: &str,
    value: &Value,
    component_name: &str,
) -> AppResult<Header> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::General(format!(
            "Header component '{}' must be an object",
            component_name
        ))
    })?;

    let required = obj
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let schema = lower_embedded_schema(resolution, graph, doc, pointer, obj)?;

    Ok(Header {
        required,
        schema,
        raw: value.clone(),
    })
}

fn lower_response(
    resolution: &mut Resolution<'_>,
    graph: &mut SchemaGraph,
    doc: &str,
    pointer: &str,
    value: &Value,
    component_name: &str,
) -> AppResult<Response> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::General(format!(
            "Response component '{}' must be an object",
            component_name
        ))
    })?;

    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let content = lower_content(resolution, graph, doc, pointer, obj)?;

    let mut headers = IndexMap::new();
    if let Some(declared) = obj.get("headers").and_then(Value::as_object) {
        for name in declared.keys() {
            let header_ptr = format!("{}/headers/{}", pointer, escape_pointer_segment(name));
            let (hdoc, hptr, hvalue) = resolution.chase(doc, &header_ptr)?;
            let header = lower_header(resolution, graph, &hdoc, &hptr, &hvalue, name)?;
            headers.insert(name.clone(), header);
        }
    }

    Ok(Response {
        description,
        content,
        headers,
        raw: value.clone(),
    })
}

fn lower_request_body(
    resolution: &mut Resolution<'_>,
    graph: &mut SchemaGraph,
    doc: &str,
    pointer: &str,
    value: &Value,
    component_name: &str,
) -> AppResult<RequestBody> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::General(format!(
            "Request body component '{}' must be an object",
            component_name
        ))
    })?;

    let required = obj
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let content = lower_content(resolution, graph, doc, pointer, obj)?;

    Ok(RequestBody {
        required,
        content,
        raw: value.clone(),
    })
}

/// Lowers a `schema` field sitting directly on the component.
fn lower_embedded_schema(
    resolution: &mut Resolution<'_>,
    graph: &mut SchemaGraph,
    doc: &str,
    pointer: &str,
    obj: &serde_json::Map<String, Value>,
) -> AppResult<Option<NodeId>> {
    if obj.get("schema").is_none() {
        return Ok(None);
    }
    let schema_ptr = format!("{}/schema", pointer);
    Ok(Some(resolution.lower_schema(graph, doc, &schema_ptr)?))
}

/// Lowers each media type's schema under a `content` map.
fn lower_content(
    resolution: &mut Resolution<'_>,
    graph: &mut SchemaGraph,
    doc: &str,
    pointer: &str,
    obj: &serde_json::Map<String, Value>,
) -> AppResult<IndexMap<String, Option<NodeId>>> {
    let mut content = IndexMap::new();
    let Some(media_types) = obj.get("content").and_then(Value::as_object) else {
        return Ok(content);
    };

    for (media_type, media_obj) in media_types {
        let has_schema = media_obj.get("schema").is_some();
        let schema = if has_schema {
            let schema_ptr = format!(
                "{}/content/{}/schema",
                pointer,
                escape_pointer_segment(media_type)
            );
            Some(resolution.lower_schema(graph, doc, &schema_ptr)?)
        } else {
            None
        };
        content.insert(media_type.clone(), schema);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;

    #[test]
    fn test_parameter_with_ref_chain() {
        let graph = Resolver::new()
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Params, version: "1.0"}
paths: {}
components:
  parameters:
    Limit:
      name: limit
      in: query
      schema: {type: integer, minimum: 1}
    PageLimit:
      $ref: '#/components/parameters/Limit'
"#,
            )
            .unwrap();

        let limit = graph.parameter("Limit").unwrap();
        assert_eq!(limit.name, "limit");
        assert_eq!(limit.location, "query");
        assert!(!limit.required);

        // The alias chases down to the same concrete parameter.
        let alias = graph.parameter("PageLimit").unwrap();
        assert_eq!(alias.name, "limit");
        assert_eq!(alias.schema, limit.schema);
    }

    #[test]
    fn test_path_parameter_must_be_required() {
        let err = Resolver::new()
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Params, version: "1.0"}
paths: {}
components:
  parameters:
    PetId:
      name: petId
      in: path
      schema: {type: string}
"#,
            )
            .unwrap_err();
        assert!(format!("{}", err).contains("required: true"));
    }

    #[test]
    fn test_response_content_and_headers() {
        let graph = Resolver::new()
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Resp, version: "1.0"}
paths: {}
components:
  responses:
    PetList:
      description: A page of pets
      headers:
        X-Next:
          schema: {type: string}
      content:
        application/json:
          schema:
            type: array
            items: {type: object}
"#,
            )
            .unwrap();

        let resp = graph.response("PetList").unwrap();
        assert_eq!(resp.description, "A page of pets");
        let body = resp.content.get("application/json").unwrap().unwrap();
        assert_eq!(
            graph.node(body).schema_type,
            Some(crate::schema::SchemaType::Array)
        );
        assert!(resp.headers.contains_key("X-Next"));
    }

    #[test]
    fn test_request_body_component() {
        let graph = Resolver::new()
            .resolve_str(
                r#"
openapi: 3.0.3
info: {title: Body, version: "1.0"}
paths: {}
components:
  requestBodies:
    NewPet:
      required: true
      content:
        application/json:
          schema: {$ref: '#/components/schemas/Pet'}
  schemas:
    Pet: {type: object}
"#,
            )
            .unwrap();

        let body = graph.request_body("NewPet").unwrap();
        assert!(body.required);
        let schema = body.content.get("application/json").unwrap().unwrap();
        assert_eq!(Some(schema), graph.schema("Pet"));
    }

    #[test]
    fn test_swagger2_top_level_parameters() {
        let graph = Resolver::new()
            .resolve_str(
                r#"
swagger: "2.0"
info: {title: Old, version: "1.0"}
paths: {}
parameters:
  Offset:
    name: offset
    in: query
    required: true
"#,
            )
            .unwrap();

        let offset = graph.parameter("Offset").unwrap();
        assert_eq!(offset.name, "offset");
        assert!(offset.required);
        assert!(offset.schema.is_none());
    }
}
