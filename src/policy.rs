//! # Validation Policy
//!
//! An immutable configuration snapshot threaded through every validation
//! call. Constructed per call site; never mutated during traversal.

use std::collections::HashMap;

/// Default bound on combinator / structural recursion depth.
pub const DEFAULT_MAX_DEPTH: usize = 3000;

/// Which side of the exchange is being validated.
///
/// Drives `readOnly` / `writeOnly` presence gating.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ValidationContext {
    /// Inbound request payload: `readOnly` properties must be absent.
    Request,
    /// Outbound response payload: `writeOnly` properties must be absent.
    Response,
    /// No context-sensitive gating.
    #[default]
    Neither,
}

/// A caller-registered checker for a named `format`.
///
/// Checkers only see string values; formats on other kinds are ignored.
pub type FormatCheck = fn(&str) -> bool;

/// Configuration for a single top-level validation call.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Request / response context.
    pub context: ValidationContext,
    /// Enforce `readOnly` presence gating (default on).
    pub enforce_read_only: bool,
    /// Enforce `writeOnly` presence gating (default on).
    pub enforce_write_only: bool,
    /// Custom format checkers by format name. Empty by default; an
    /// unregistered format is never an error.
    pub formats: HashMap<String, FormatCheck>,
    /// Maximum recursion depth before validation aborts.
    pub max_depth: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            context: ValidationContext::default(),
            enforce_read_only: true,
            enforce_write_only: true,
            formats: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ValidationPolicy {
    /// Policy with default toggles for the given context.
    pub fn for_context(context: ValidationContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    /// Disables `readOnly` presence gating.
    pub fn without_read_only_enforcement(mut self) -> Self {
        self.enforce_read_only = false;
        self
    }

    /// Disables `writeOnly` presence gating.
    pub fn without_write_only_enforcement(mut self) -> Self {
        self.enforce_write_only = false;
        self
    }

    /// Registers a checker for a named format.
    pub fn with_format(mut self, name: impl Into<String>, check: FormatCheck) -> Self {
        self.formats.insert(name.into(), check);
        self
    }

    /// Overrides the recursion-depth bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = ValidationPolicy::default();
        assert_eq!(policy.context, ValidationContext::Neither);
        assert!(policy.enforce_read_only);
        assert!(policy.enforce_write_only);
        assert!(policy.formats.is_empty());
        assert_eq!(policy.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_chained_setters() {
        fn all_caps(s: &str) -> bool {
            s.chars().all(|c| c.is_ascii_uppercase())
        }

        let policy = ValidationPolicy::for_context(ValidationContext::Request)
            .without_read_only_enforcement()
            .with_format("caps", all_caps)
            .with_max_depth(16);

        assert_eq!(policy.context, ValidationContext::Request);
        assert!(!policy.enforce_read_only);
        assert!(policy.enforce_write_only);
        assert!(policy.formats.contains_key("caps"));
        assert_eq!(policy.max_depth, 16);
    }
}
