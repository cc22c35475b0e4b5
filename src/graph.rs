//! # Schema Graph
//!
//! The flat arena that owns every resolved [`SchemaNode`]. Parent/child
//! relations are plain [`NodeId`] values, so the graph represents diamond
//! sharing and reference cycles without ownership cycles. A fully resolved
//! graph is read-only and safe to validate against from multiple threads.

use crate::components::{Header, Parameter, RequestBody, Response};
use crate::schema::{NodeOrigin, SchemaNode};
use indexmap::IndexMap;

/// Stable address of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Index into the arena's node store.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A resolved, fully linked document graph.
///
/// Produced by [`crate::resolver::Resolver`]; after a successful resolve no
/// unresolved reference is reachable from any entry point.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    schemas: IndexMap<String, NodeId>,
    root: Option<NodeId>,
    parameters: IndexMap<String, Parameter>,
    responses: IndexMap<String, Response>,
    headers: IndexMap<String, Header>,
    request_bodies: IndexMap<String, RequestBody>,
}

impl SchemaGraph {
    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by id.
    ///
    /// Ids are only minted by this graph's resolver, so the lookup is
    /// total for any id the caller legitimately holds.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    /// Named component schema (`components/schemas` or `definitions`).
    pub fn schema(&self, name: &str) -> Option<NodeId> {
        self.schemas.get(name).copied()
    }

    /// Names of all component schemas, in declaration order.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Root schema node, when the document itself was a schema.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Named component parameter.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Named component response.
    pub fn response(&self, name: &str) -> Option<&Response> {
        self.responses.get(name)
    }

    /// Named component header.
    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers.get(name)
    }

    /// Named component request body.
    pub fn request_body(&self, name: &str) -> Option<&RequestBody> {
        self.request_bodies.get(name)
    }

    /// Reserves an arena slot so in-flight resolution can hand out the id
    /// before the node body is complete (cycle support).
    pub(crate) fn reserve(&mut self, origin: NodeOrigin) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SchemaNode {
            origin,
            ..SchemaNode::default()
        });
        id
    }

    /// Writes the finished node into a reserved slot.
    pub(crate) fn fill(&mut self, id: NodeId, node: SchemaNode) {
        self.nodes[id.index()] = node;
    }

    pub(crate) fn insert_schema(&mut self, name: String, id: NodeId) {
        self.schemas.insert(name, id);
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub(crate) fn insert_parameter(&mut self, name: String, parameter: Parameter) {
        self.parameters.insert(name, parameter);
    }

    pub(crate) fn insert_response(&mut self, name: String, response: Response) {
        self.responses.insert(name, response);
    }

    pub(crate) fn insert_header(&mut self, name: String, header: Header) {
        self.headers.insert(name, header);
    }

    pub(crate) fn insert_request_body(&mut self, name: String, body: RequestBody) {
        self.request_bodies.insert(name, body);
    }
}
