//! # Validation Module
//!
//! Presence checks for request bodies and the structured errors they produce.
//!
//! A field is present when it holds a truthy JSON value: `null`, `false`,
//! `0` and `""` count as missing. Present scalars are read as text, so
//! `1984` and `true` become `"1984"` and `"true"`.

use serde_json::Value;
use std::borrow::Cow;
use std::num::FpCategory;

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    /// Required field is missing or falsy
    Required,
}

/// A single validation error for a specific field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name (e.g., "plataformaId")
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a "required field" error
    pub fn required(field: impl Into<String>) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} is required"),
            field: field_str,
            code: ValidationCode::Required,
        }
    }
}

/// Collection of validation errors
///
/// Allows aggregating multiple field errors for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    /// List of field-level errors
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field error
    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Add a required field error
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(FieldError::required(field));
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Names of the offending fields, in check order
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = std::result::Result<T, ValidationErrors>;

/// Text of a truthy value; `None` for falsy ones
fn truthy_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) if n.as_f64().is_some_and(|f| f.classify() == FpCategory::Zero) => None,
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(true) => Some(Cow::Borrowed("true")),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Reads fields out of an optional JSON body, recording every required
/// field that is missing.
#[derive(Debug)]
pub struct FieldReader<'a> {
    body: Option<&'a Value>,
    errors: ValidationErrors,
}

impl<'a> FieldReader<'a> {
    /// Start reading from a request body (`None` when the request had none)
    #[must_use]
    pub fn new(body: Option<&'a Value>) -> Self {
        Self {
            body,
            errors: ValidationErrors::new(),
        }
    }

    fn lookup(&self, field: &str) -> Option<Cow<'a, str>> {
        self.body.and_then(|b| b.get(field)).and_then(truthy_text)
    }

    /// A field that must be present
    pub fn required(&mut self, field: &str) -> Option<Cow<'a, str>> {
        let value = self.lookup(field);
        if value.is_none() {
            self.errors.add_required(field);
        }
        value
    }

    /// A field that may be absent
    pub fn optional(&self, field: &str) -> Option<Cow<'a, str>> {
        self.lookup(field)
    }

    /// Finish reading; errors if any required field was missing
    ///
    /// # Errors
    ///
    /// Returns the accumulated `ValidationErrors` when not empty.
    pub fn finish(self) -> ValidationResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
