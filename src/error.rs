//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the crate.
//!
//! Reference-resolution failures carry a structured [`ReferenceError`]
//! payload so callers can report which `$ref` failed and why without
//! re-traversing the document.

use derive_more::{Display, From};

/// Why a reference failed to resolve.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceErrorKind {
    /// The pointer path did not locate a node in the target document.
    #[display("not found")]
    NotFound,

    /// The reference string or its fragment is not a valid JSON Pointer.
    #[display("malformed")]
    Malformed,

    /// A cross-document reference was encountered while external
    /// references are disabled.
    #[display("external refs disabled")]
    ExternalDisabled,

    /// The caller-supplied retrieval function failed, or the retrieved
    /// bytes could not be decoded.
    #[display("retrieval failed")]
    Retrieval,
}

/// A resolution-time failure for a single `$ref`.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("reference '{reference}' could not be resolved ({kind}): {detail}")]
pub struct ReferenceError {
    /// The raw reference string as written in the document.
    pub reference: String,
    /// Failure category.
    pub kind: ReferenceErrorKind,
    /// Human-readable detail (target document, pointer, cause).
    pub detail: String,
}

impl ReferenceError {
    /// Creates a `NotFound` reference error.
    pub fn not_found(reference: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(reference, ReferenceErrorKind::NotFound, detail)
    }

    /// Creates a `Malformed` reference error.
    pub fn malformed(reference: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(reference, ReferenceErrorKind::Malformed, detail)
    }

    /// Creates an `ExternalDisabled` reference error.
    pub fn external_disabled(reference: impl Into<String>) -> Self {
        Self::new(
            reference,
            ReferenceErrorKind::ExternalDisabled,
            "cross-document references are disabled for this resolver",
        )
    }

    /// Creates a `Retrieval` reference error.
    pub fn retrieval(reference: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(reference, ReferenceErrorKind::Retrieval, detail)
    }

    fn new(
        reference: impl Into<String>,
        kind: ReferenceErrorKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Reference-resolution failures.
    #[display("Reference Error: {_0}")]
    Reference(ReferenceError),

    /// Generic errors (document decoding, schema shape violations).
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_conversion() {
        let io_err = Error::new(ErrorKind::Other, "test");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_string_conversion() {
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_reference_error_display() {
        let err = ReferenceError::external_disabled("other.yaml#/components/schemas/User");
        let app_err: AppError = err.into();
        let rendered = format!("{}", app_err);
        assert!(rendered.contains("external refs disabled"));
        assert!(rendered.contains("other.yaml#/components/schemas/User"));
    }

    #[test]
    fn test_reference_error_kinds() {
        assert_eq!(
            ReferenceError::not_found("#/a", "x").kind,
            ReferenceErrorKind::NotFound
        );
        assert_eq!(
            ReferenceError::malformed("#a b", "x").kind,
            ReferenceErrorKind::Malformed
        );
        assert_eq!(
            ReferenceError::retrieval("u", "boom").kind,
            ReferenceErrorKind::Retrieval
        );
    }
}
