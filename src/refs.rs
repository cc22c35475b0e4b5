//! # Reference Utilities
//!
//! Shared helpers for splitting `$ref` strings into a document part and a
//! JSON Pointer fragment, decoding pointer segments, walking a pointer
//! through a decoded document, and joining relative document URIs.
//!
//! These utilities are intentionally lightweight: they never fetch external
//! documents themselves.

use percent_encoding::percent_decode_str;
use serde_json::Value;
use url::Url;

/// Where a reference points, relative to the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceKind {
    /// Fragment-only reference into the current document.
    Local,
    /// Relative-path reference to a sibling document.
    Relative,
    /// Absolute-URI reference to a remote document.
    Remote,
}

/// A `$ref` split into its document and fragment parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParsedReference<'a> {
    /// Document identifier; empty for the current document.
    pub document: &'a str,
    /// Fragment after `#`, if any (without the leading `#`).
    pub fragment: Option<&'a str>,
    /// Reference kind derived from the document part.
    pub kind: ReferenceKind,
}

/// Splits a reference string at the first `#`.
pub(crate) fn parse_reference(ref_str: &str) -> ParsedReference<'_> {
    let (document, fragment) = match ref_str.split_once('#') {
        Some((doc, frag)) => (doc, Some(frag)),
        None => (ref_str, None),
    };

    let kind = if document.is_empty() {
        ReferenceKind::Local
    } else if Url::parse(document).is_ok() {
        ReferenceKind::Remote
    } else {
        ReferenceKind::Relative
    };

    ParsedReference {
        document,
        fragment,
        kind,
    }
}

/// Decodes a JSON Pointer segment (handles `~1` and `~0`).
pub(crate) fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Escapes a name for embedding in a JSON Pointer (`~` -> `~0`, `/` -> `~1`).
pub(crate) fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Walks a JSON Pointer from a document root.
///
/// An empty pointer addresses the root itself; `"/"` is one empty
/// segment addressing the key `""` (RFC 6901). Returns `None` when any
/// step misses; the caller decides whether that is `NotFound` or
/// `Malformed`.
pub(crate) fn walk_pointer<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for segment in pointer.trim_start_matches('/').split('/') {
        let name = decode_pointer_segment(segment);
        current = match current {
            Value::Object(map) => map.get(&name)?,
            Value::Array(items) => {
                let index: usize = name.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Returns true when a fragment is a syntactically valid JSON Pointer.
pub(crate) fn fragment_is_pointer(fragment: &str) -> bool {
    fragment.is_empty() || fragment.starts_with('/')
}

/// Resolves a possibly relative document identifier to an absolute URI
/// string, joining against `base` when one is known.
///
/// Without a usable base the identifier is returned verbatim so that
/// plain relative paths still key the retrieval cache consistently.
pub(crate) fn resolve_doc_uri(document: &str, base: Option<&Url>) -> String {
    if let Ok(url) = Url::parse(document) {
        return url.to_string();
    }
    if let Some(base) = base {
        if let Ok(joined) = base.join(document) {
            return joined.to_string();
        }
    }
    document.to_string()
}
